/// Answer synthesis from ranked chunks, an attached file and thread memory.
///
/// Sources are tried in a fixed order: a verbatim stored answer, then the
/// file and the best chunks together, then memory, then a file
/// acknowledgement, and finally a fixed apology.
use serde::Serialize;

use super::file::FileContext;
use crate::indexer::segmenter::char_windows;
use crate::retrieval::{ScoredChunk, direct, qa, score};

const SHORT_FILE_CHARS: usize = 500;
const FILE_WINDOW_CHARS: usize = 500;
const FILE_WINDOW_STEP: usize = 400;
const FILE_PREVIEW_CHARS: usize = 300;
const MEMORY_PREVIEW_CHARS: usize = 600;

const FILE_WINDOW_MIN_SCORE: f64 = 0.1;
const MEMORY_MIN_SCORE: f64 = 0.1;
const MAX_CHUNK_PARTS: usize = 3;

const FILE_LABEL: &str = "من الملف المرفق:\n";
const FILE_SUMMARY_LABEL: &str = "ملخص الملف المرفق:\n";
const MEMORY_LABEL: &str = "بناءً على محادثتنا السابقة:\n\n";
const COMBINED_LABEL: &str = "بناءً على المعلومات المتاحة:\n\n";
const OCR_HINT: &str = "💡 لقراءة النصوص داخل الصور بدقة، يحتاج النظام إلى تثبيت أداة OCR.";

pub const FALLBACK_ANSWER: &str =
    "عذراً، لم أجد معلومات كافية في قاعدة المعرفة للإجابة على سؤالك. يمكنك إعادة صياغة السؤال.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    Direct,
    Composed,
    Memory,
    FileAcknowledgement,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub origin: AnswerOrigin,
    /// Chunks the text was taken from.
    pub chunk_ids: Vec<i64>,
    pub score: Option<f64>,
}

impl Answer {
    fn new(text: String, origin: AnswerOrigin) -> Self {
        Self {
            text,
            origin,
            chunk_ids: Vec::new(),
            score: None,
        }
    }
}

fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct Composer {
    /// Chunks at or below this score are not quoted.
    pub min_chunk_score: f64,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            min_chunk_score: 0.05,
        }
    }
}

impl Composer {
    pub fn new(min_chunk_score: f64) -> Self {
        Self { min_chunk_score }
    }

    pub fn compose(
        &self,
        query: &str,
        chunks: &[ScoredChunk],
        file: Option<&FileContext>,
        memory: Option<&str>,
    ) -> Answer {
        self.direct_answer(query, chunks, file, memory)
            .or_else(|| self.composed_answer(query, chunks, file))
            .or_else(|| memory_answer(query, memory))
            .or_else(|| file.map(acknowledge_file))
            .unwrap_or_else(|| Answer::new(FALLBACK_ANSWER.to_string(), AnswerOrigin::Fallback))
    }

    /// Chunks and file text are searched before memory, so memory never
    /// shadows a stored answer.
    fn direct_answer(
        &self,
        query: &str,
        chunks: &[ScoredChunk],
        file: Option<&FileContext>,
        memory: Option<&str>,
    ) -> Option<Answer> {
        let mut blobs: Vec<&str> = chunks.iter().map(|c| c.chunk.content.as_str()).collect();
        if let Some(file) = file.filter(|f| !f.text.is_empty()) {
            blobs.push(&file.text);
        }

        let found = direct::resolve(query, &blobs)
            .or_else(|| memory.and_then(|m| direct::resolve(query, &[m])).map(|mut d| {
                d.blob_index = usize::MAX;
                d
            }))?;

        let mut answer = Answer::new(found.answer, AnswerOrigin::Direct);
        answer.score = Some(found.score);
        if let Some(chunk) = chunks.get(found.blob_index) {
            answer.chunk_ids.push(chunk.chunk.id);
        }
        Some(answer)
    }

    fn composed_answer(
        &self,
        query: &str,
        chunks: &[ScoredChunk],
        file: Option<&FileContext>,
    ) -> Option<Answer> {
        let mut parts = Vec::new();
        let mut best: Option<f64> = None;
        let mut chunk_ids = Vec::new();

        if let Some(file) = file.filter(|f| !f.text.is_empty()) {
            let (part, file_score) = file_part(query, &file.text);
            parts.push(part);
            best = file_score;
        }

        for scored in chunks
            .iter()
            .filter(|c| c.score > self.min_chunk_score)
            .take(MAX_CHUNK_PARTS)
        {
            let content = scored.chunk.content.trim();
            let part = qa::extract_answer_span(content)
                .filter(|span| !span.is_empty())
                .unwrap_or_else(|| content.to_string());
            parts.push(part);
            chunk_ids.push(scored.chunk.id);
            best = Some(best.map_or(scored.score, |b| b.max(scored.score)));
        }

        let text = match parts.len() {
            0 => return None,
            1 => parts.remove(0),
            _ => format!("{COMBINED_LABEL}{}", parts.join("\n\n")),
        };

        Some(Answer {
            text,
            origin: AnswerOrigin::Composed,
            chunk_ids,
            score: best,
        })
    }
}

/// The file's contribution and, for long files, the best window's score.
fn file_part(query: &str, text: &str) -> (String, Option<f64>) {
    if text.chars().count() < SHORT_FILE_CHARS {
        return (format!("{FILE_LABEL}{text}"), None);
    }

    let mut best: Option<(String, f64)> = None;
    for window in char_windows(text, FILE_WINDOW_CHARS, FILE_WINDOW_STEP) {
        let s = score(query, &window);
        if best.as_ref().is_none_or(|(_, b)| s > *b) {
            best = Some((window, s));
        }
    }

    match best {
        Some((window, s)) if s > FILE_WINDOW_MIN_SCORE => {
            (format!("{FILE_LABEL}...{window}..."), Some(s))
        }
        _ => (
            format!("{FILE_SUMMARY_LABEL}{}...", take_chars(text, FILE_PREVIEW_CHARS)),
            None,
        ),
    }
}

fn memory_answer(query: &str, memory: Option<&str>) -> Option<Answer> {
    let memory = memory.filter(|m| !m.is_empty())?;
    let s = score(query, memory);
    if s <= MEMORY_MIN_SCORE {
        return None;
    }
    let mut answer = Answer::new(
        format!("{MEMORY_LABEL}{}", take_chars(memory, MEMORY_PREVIEW_CHARS)),
        AnswerOrigin::Memory,
    );
    answer.score = Some(s);
    Some(answer)
}

fn acknowledge_file(file: &FileContext) -> Answer {
    let text = if file.looks_like_image() {
        format!(
            "📎 استلمت الملف المرفق: {}\n\n{}\n\n{OCR_HINT}",
            file.filename, file.text
        )
    } else {
        format!("📎 استلمت الملف المرفق.\n\nمعلومات الملف:\n{}", file.text)
    };
    Answer::new(text, AnswerOrigin::FileAcknowledgement)
}

/// [`Composer::compose`] with default thresholds.
pub fn compose(
    query: &str,
    chunks: &[ScoredChunk],
    file: Option<&FileContext>,
    memory: Option<&str>,
) -> Answer {
    Composer::default().compose(query, chunks, file, memory)
}
