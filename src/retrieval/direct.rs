/// Direct answer lookup: finds a stored answer whose question matches the query.
use super::qa;
use crate::text::fuzzy::similarity;
use crate::text::keywords::query_tokens;

const TOKEN_THRESHOLD: f64 = 0.5;
const MIN_SCORE: f64 = 0.25;

/// A verbatim stored answer and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectAnswer {
    pub answer: String,
    pub question: String,
    pub score: f64,
    /// Index of the blob the pair was found in.
    pub blob_index: usize,
}

/// Searches every QA pair of every blob for the best match to `query`.
///
/// A pair scores `matches / max(|query tokens|, |stored tokens|)`, where a
/// match is a query token with similarity above 0.5 to any stored-question
/// token. The best pair wins if it scores above 0.25; ties keep the earlier
/// pair. Pairs with an empty answer never win.
pub fn resolve<S: AsRef<str>>(query: &str, blobs: &[S]) -> Option<DirectAnswer> {
    let q_words = query_tokens(query);
    if q_words.is_empty() {
        return None;
    }

    let mut best: Option<DirectAnswer> = None;

    for (blob_index, blob) in blobs.iter().enumerate() {
        for pair in qa::extract_pairs(blob.as_ref()) {
            let stored = query_tokens(&pair.question);
            if stored.is_empty() || pair.answer.is_empty() {
                continue;
            }

            let matches = q_words
                .iter()
                .filter(|qw| stored.iter().any(|sw| similarity(qw, sw) > TOKEN_THRESHOLD))
                .count();
            let score = matches as f64 / q_words.len().max(stored.len()) as f64;

            let best_score = best.as_ref().map_or(0.0, |b| b.score);
            if score > best_score && score > MIN_SCORE {
                best = Some(DirectAnswer {
                    answer: pair.answer,
                    question: pair.question,
                    score,
                    blob_index,
                });
            }
        }
    }

    best
}
