//! Lexical retrieval: QA-pair scanning, chunk scoring, ranking and direct answers.
use std::collections::HashSet;

use rayon::prelude::*;
use serde::Serialize;

use crate::indexer::language;

pub mod direct;
pub mod qa;
pub mod scorer;

pub use scorer::{ScoreBreakdown, score, score_breakdown};

/// A stored chunk as handed over by the storage layer. Never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentChunk {
    pub id: i64,
    pub content: String,
    pub language: String,
    pub token_count: usize,
}

impl ContentChunk {
    pub fn new(id: i64, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id,
            language: language::detect_language(&content).to_string(),
            token_count: language::count_tokens(&content),
            content,
        }
    }
}

/// A chunk with its relevance to the current query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: ContentChunk,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

impl ScoredChunk {
    /// Scores `chunk` against `query`.
    pub fn new(query: &str, chunk: ContentChunk) -> Self {
        let breakdown = score_breakdown(query, &chunk.content);
        Self {
            score: breakdown.map_or(0.0, |b| b.total),
            chunk,
            breakdown,
        }
    }
}

/// Deduplicates `candidates` by id (first occurrence wins), scores each one
/// and returns them sorted by descending score. Equal scores keep candidate
/// order.
pub fn rank(query: &str, candidates: Vec<ContentChunk>) -> Vec<ScoredChunk> {
    let mut seen = HashSet::new();
    let unique: Vec<ContentChunk> = candidates
        .into_iter()
        .filter(|c| seen.insert(c.id))
        .collect();

    let mut scored: Vec<ScoredChunk> = unique
        .into_par_iter()
        .map(|chunk| ScoredChunk::new(query, chunk))
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_dedups_and_sorts() {
        let candidates = vec![
            ContentChunk::new(1, "weather report for tomorrow"),
            ContentChunk::new(2, "rust ownership and borrowing explained"),
            ContentChunk::new(2, "duplicate id is ignored"),
            ContentChunk::new(3, "borrowing rules in rust"),
        ];
        let ranked = rank("rust borrowing", candidates);

        assert_eq!(ranked.len(), 3);
        assert_ne!(ranked[0].chunk.id, 1);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        let two = ranked.iter().find(|s| s.chunk.id == 2).unwrap();
        assert!(two.chunk.content.starts_with("rust ownership"));
    }

    #[test]
    fn test_rank_keeps_content_untouched() {
        let chunk = ContentChunk::new(7, "سؤال: متى؟ جواب: غداً");
        let ranked = rank("متى", vec![chunk.clone()]);
        assert_eq!(ranked[0].chunk, chunk);
        assert!(ranked[0].breakdown.is_some());
    }

    #[test]
    fn test_rank_empty_query() {
        let ranked = rank("", vec![ContentChunk::new(1, "anything")]);
        assert_eq!(ranked[0].score, 0.0);
        assert!(ranked[0].breakdown.is_none());
    }

    #[test]
    fn test_content_chunk_metadata() {
        let chunk = ContentChunk::new(1, "hello world again");
        assert_eq!(chunk.token_count, 3);
        assert_eq!(chunk.language, "en");
    }
}
