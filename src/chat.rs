/// Chat request flow: thread handling, retrieval, composition and persistence.
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::answer::composer::{AnswerOrigin, Composer};
use crate::answer::file::{EMBEDDED_FILE_MARKER, FileContext, parse_embedded_file};
use crate::answer::memory;
use crate::config::Config;
use crate::db::Db;
use crate::db::models::{Message, NewMessage, Role};
use crate::indexer::language::{count_tokens, detect_language};
use crate::retrieval::{ScoredChunk, rank};
use crate::text::extract_keywords;

pub const MODEL_NAME: &str = "local-rag-v1";

const PREVIEW_CHARS: usize = 100;
const MAX_SOURCES: usize = 3;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("a question or an attached file is required")]
    EmptyRequest,

    #[error("unknown thread: {0}")]
    UnknownThread(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub question: String,
    pub thread_id: Option<String>,
    pub file: Option<FileContext>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_file(mut self, file: FileContext) -> Self {
        self.file = Some(file);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub chunk_id: i64,
    pub content_preview: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub latency_ms: u64,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub sources_found: usize,
    pub model: &'static str,
    pub has_file: bool,
    pub has_memory: bool,
    pub file_info: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub thread_id: String,
    pub message_id: String,
    pub answer: String,
    pub origin: AnswerOrigin,
    pub sources: Vec<Source>,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadHistory {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub memory: Option<String>,
}

fn sources(ranked: &[ScoredChunk]) -> (Vec<Source>, usize) {
    let used: Vec<&ScoredChunk> = ranked.iter().filter(|c| c.score > 0.0).collect();
    let list = used
        .iter()
        .take(MAX_SOURCES)
        .map(|c| Source {
            chunk_id: c.chunk.id,
            content_preview: c.chunk.content.chars().take(PREVIEW_CHARS).collect(),
            score: c.score,
        })
        .collect();
    (list, used.len())
}

#[derive(Clone)]
pub struct ChatService {
    db: Arc<TokioMutex<Db>>,
    config: Arc<Config>,
}

impl ChatService {
    pub fn new(db: Arc<TokioMutex<Db>>, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    pub async fn ask(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let start = Instant::now();
        let mut question = request.question.trim().to_string();
        let mut file = request.file;

        if file.is_none() && question.contains(EMBEDDED_FILE_MARKER) {
            let (clean, embedded) = parse_embedded_file(&question);
            question = clean;
            file = embedded;
        }

        if question.is_empty() && file.is_none() {
            return Err(ChatError::EmptyRequest);
        }

        let retrieval = &self.config.retrieval;
        let keywords = extract_keywords(&question);
        debug!("keywords: {keywords:?}");

        let (thread_id, memory_context, candidates) = {
            let db = self.db.lock().await;

            let (thread_id, is_new) = match request.thread_id.filter(|id| !id.trim().is_empty()) {
                Some(id) if db.thread_exists(&id)? => (id, false),
                Some(id) => {
                    db.create_thread(&id, &question)?;
                    (id, true)
                }
                None => {
                    let id = Uuid::new_v4().to_string();
                    db.create_thread(&id, &question)?;
                    (id, true)
                }
            };

            let memory_context = if is_new {
                None
            } else {
                memory::format_context(&db.load_key_facts(&thread_id)?, self.config.memory.turns)
            };

            let candidates = db.search_chunks(&keywords, retrieval.candidate_limit)?;
            (thread_id, memory_context, candidates)
        };

        debug!("{} candidates for thread {thread_id}", candidates.len());
        let mut ranked = rank(&question, candidates);
        ranked.truncate(retrieval.top_k);

        let answer = Composer::new(retrieval.min_chunk_score).compose(
            &question,
            &ranked,
            file.as_ref(),
            memory_context.as_deref(),
        );
        let latency_ms = start.elapsed().as_millis() as u64;
        let message_id = Uuid::new_v4().to_string();

        self.persist(&thread_id, &message_id, &question, file.as_ref(), &answer.text, latency_ms)
            .await;

        let (sources, sources_found) = sources(&ranked);
        info!(
            "answered in {latency_ms}ms ({:?}, {sources_found} sources)",
            answer.origin
        );

        Ok(ChatResponse {
            thread_id,
            message_id,
            metadata: ResponseMetadata {
                latency_ms,
                input_tokens: count_tokens(&question),
                output_tokens: count_tokens(&answer.text),
                sources_found,
                model: MODEL_NAME,
                has_file: file.is_some(),
                has_memory: memory_context.is_some(),
                file_info: file.map(|f| f.filename),
            },
            answer: answer.text,
            origin: answer.origin,
            sources,
        })
    }

    /// Stores both messages and the updated memory. Failures are logged and
    /// never reach the caller.
    async fn persist(
        &self,
        thread_id: &str,
        message_id: &str,
        question: &str,
        file: Option<&FileContext>,
        answer: &str,
        latency_ms: u64,
    ) {
        let db = self.db.lock().await;

        let user_content = match file {
            Some(f) => format!("{question}\n[مرفق: {}]", f.filename),
            None => question.to_string(),
        };
        let user_id = Uuid::new_v4().to_string();
        let user_msg = NewMessage {
            id: &user_id,
            thread_id,
            role: Role::User,
            content: &user_content,
            language: detect_language(question),
            tokens: count_tokens(question),
            latency_ms: None,
            model: None,
        };
        let assistant_msg = NewMessage {
            id: message_id,
            thread_id,
            role: Role::Assistant,
            content: answer,
            language: detect_language(answer),
            tokens: count_tokens(answer),
            latency_ms: Some(latency_ms),
            model: Some(MODEL_NAME),
        };
        for msg in [&user_msg, &assistant_msg] {
            if let Err(e) = db.insert_message(msg) {
                warn!("Failed to save {} message: {e}", msg.role.as_str());
            }
        }

        let mut facts = match db.load_key_facts(thread_id) {
            Ok(facts) => facts,
            Err(e) => {
                warn!("Failed to load memory for {thread_id}: {e}");
                Vec::new()
            }
        };
        memory::remember(&mut facts, question, answer, self.config.memory.capacity);
        if let Err(e) = db.save_key_facts(thread_id, &memory::summary(question), &facts) {
            warn!("Failed to save memory for {thread_id}: {e}");
        }
    }

    pub async fn history(&self, thread_id: &str) -> Result<ThreadHistory, ChatError> {
        let db = self.db.lock().await;
        if !db.thread_exists(thread_id)? {
            return Err(ChatError::UnknownThread(thread_id.to_string()));
        }
        Ok(ThreadHistory {
            thread_id: thread_id.to_string(),
            messages: db.thread_messages(thread_id)?,
            memory: memory::format_context(&db.load_key_facts(thread_id)?, self.config.memory.turns),
        })
    }
}
