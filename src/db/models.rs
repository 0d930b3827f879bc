use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A segment about to be written for a document.
#[derive(Debug, Clone)]
pub struct NewChunk<'a> {
    pub position: usize,
    pub content: &'a str,
    pub language: &'a str,
    pub token_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub chunk_count: usize,
    pub modified_at: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub id: &'a str,
    pub thread_id: &'a str,
    pub role: Role,
    pub content: &'a str,
    pub language: &'a str,
    pub tokens: usize,
    pub latency_ms: Option<u64>,
    pub model: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub language: String,
    pub tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One remembered turn, stored in `thread_memory.key_facts` as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFact {
    pub q: String,
    pub a: String,
}
