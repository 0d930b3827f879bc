/// Multi-factor lexical relevance between a query and a content blob.
///
/// The final score mixes five signals:
///
/// | signal  | weight | meaning                                             |
/// |---------|--------|-----------------------------------------------------|
/// | keyword | 0.25   | exact + fuzzy (> 0.6, x0.7) query token coverage    |
/// | phrase  | 0.15   | whole query (1.0) or a query trigram (0.6) present |
/// | qa      | 0.30   | best stored-question match x1.5 (may exceed 1.0)    |
/// | tf      | 0.15   | query token frequency over content length           |
/// | topic   | 0.15   | 0.1 when both sides share a question-synonym group  |
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use serde::Serialize;

use super::qa;
use crate::text::fuzzy::similarity;
use crate::text::keywords::{clean, prepare, query_tokens, tokenize};
use crate::text::normalize::fold;

const KEYWORD_WEIGHT: f64 = 0.25;
const PHRASE_WEIGHT: f64 = 0.15;
const QA_WEIGHT: f64 = 0.30;
const TF_WEIGHT: f64 = 0.15;
const TOPIC_WEIGHT: f64 = 0.15;

const FUZZY_KEYWORD_THRESHOLD: f64 = 0.6;
const FUZZY_KEYWORD_FACTOR: f64 = 0.7;
const FUZZY_QA_THRESHOLD: f64 = 0.55;
const QA_BOOST: f64 = 1.5;
const TRIGRAM_PHRASE_SCORE: f64 = 0.6;
const TOPIC_BONUS: f64 = 0.1;

/// Question-intent synonym groups (Arabic, dialect and English).
const QUESTION_SYNONYMS: &[(&str, &[&str])] = &[
    ("explain", &["اشرح", "وضح", "فسر", "بين", "حدثني", "explain"]),
    (
        "what",
        &["ما", "ماهو", "ماهي", "ايش", "شو", "وش", "ماذا", "عرف", "عرفني", "what"],
    ),
    ("how", &["كيف", "كيفية", "طريقة", "ازاي", "شلون", "how"]),
    ("why", &["لماذا", "ليش", "ليه", "لمَ", "why"]),
    (
        "difference",
        &["فرق", "اختلاف", "مقارنة", "فارق", "difference", "compare", "vs"],
    ),
    ("tell", &["اخبرني", "خبرني", "قلي", "قولي", "احكيلي", "tell"]),
    ("know", &["اعرف", "عايز", "ابغى", "ابي", "اريد", "know"]),
];

// Synonyms are matched against normalized text, so they are folded once.
static FOLDED_SYNONYMS: LazyLock<Vec<Vec<String>>> = LazyLock::new(|| {
    QUESTION_SYNONYMS
        .iter()
        .map(|(_, words)| words.iter().map(|w| fold(w)).collect())
        .collect()
});

/// Individual signals behind a score, before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub keyword: f64,
    pub phrase: f64,
    pub qa: f64,
    pub tf: f64,
    pub topic: f64,
    /// Weighted sum, rounded to 4 decimals and clamped to `[0, 1]`.
    pub total: f64,
}

fn keyword_score(q_words: &[String], c_words: &[String]) -> f64 {
    let c_set: HashSet<&str> = c_words.iter().map(String::as_str).collect();
    let mut exact = 0usize;
    let mut fuzzy = 0.0;

    for qw in q_words {
        if c_set.contains(qw.as_str()) {
            exact += 1;
            continue;
        }
        let best = c_set
            .iter()
            .map(|cw| similarity(qw, cw))
            .fold(0.0, f64::max);
        if best > FUZZY_KEYWORD_THRESHOLD {
            fuzzy += best;
        }
    }

    (exact as f64 + fuzzy * FUZZY_KEYWORD_FACTOR) / q_words.len() as f64
}

fn phrase_score(query_norm: &str, content_norm: &str, q_words: &[String]) -> f64 {
    if content_norm.contains(query_norm) {
        return 1.0;
    }
    let content_clean = clean(content_norm);
    let has_trigram = q_words
        .windows(3)
        .any(|w| content_clean.contains(w.join(" ").as_str()));
    if has_trigram { TRIGRAM_PHRASE_SCORE } else { 0.0 }
}

fn qa_score(q_words: &[String], content: &str) -> f64 {
    let mut best: f64 = 0.0;

    for pair in qa::extract_pairs(content) {
        let stored = query_tokens(&pair.question);
        if stored.is_empty() {
            continue;
        }
        let matches = q_words
            .iter()
            .filter(|qw| stored.iter().any(|sw| similarity(qw, sw) > FUZZY_QA_THRESHOLD))
            .count();
        let ratio = matches as f64 / q_words.len() as f64;
        best = best.max(ratio * QA_BOOST);
    }

    best
}

fn tf_score(q_words: &[String], c_words: &[String]) -> f64 {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for w in c_words {
        *counts.entry(w.as_str()).or_default() += 1;
    }
    let hits: usize = q_words
        .iter()
        .map(|q| counts.get(q.as_str()).copied().unwrap_or(0))
        .sum();
    hits as f64 / c_words.len().max(1) as f64
}

fn topic_bonus(query_norm: &str, content_norm: &str) -> f64 {
    let shared = FOLDED_SYNONYMS.iter().any(|group| {
        group.iter().any(|s| query_norm.contains(s.as_str()))
            && group.iter().any(|s| content_norm.contains(s.as_str()))
    });
    if shared { TOPIC_BONUS } else { 0.0 }
}

/// Full breakdown, or `None` when the query or the content has nothing to score.
pub fn score_breakdown(query: &str, content: &str) -> Option<ScoreBreakdown> {
    if query.is_empty() || content.is_empty() {
        return None;
    }

    let query_norm = prepare(query);
    let content_norm = prepare(content);
    let q_words = tokenize(&query_norm, true);
    if q_words.is_empty() {
        return None;
    }
    let c_words = tokenize(&content_norm, false);

    let keyword = keyword_score(&q_words, &c_words);
    let phrase = phrase_score(&query_norm, &content_norm, &q_words);
    let qa = qa_score(&q_words, content);
    let tf = tf_score(&q_words, &c_words);
    let topic = topic_bonus(&query_norm, &content_norm);

    let weighted = keyword * KEYWORD_WEIGHT
        + phrase * PHRASE_WEIGHT
        + qa * QA_WEIGHT
        + tf * TF_WEIGHT
        + topic * TOPIC_WEIGHT;
    let total = ((weighted * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0);

    Some(ScoreBreakdown {
        keyword,
        phrase,
        qa,
        tf,
        topic,
        total,
    })
}

/// Relevance of `content` to `query` in `[0, 1]`.
pub fn score(query: &str, content: &str) -> f64 {
    score_breakdown(query, content).map_or(0.0, |b| b.total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const QA_CONTENT: &str = "سؤال: ما هو الذكاء الاصطناعي؟ جواب: هو فرع من علوم الحاسوب.";

    #[test]
    fn test_empty_inputs() {
        assert_eq!(score("", "content"), 0.0);
        assert_eq!(score("query", ""), 0.0);
        assert!(score_breakdown("", "").is_none());
    }

    #[test]
    fn test_stopword_only_query() {
        // Every query token is a stopword, so nothing is left to match.
        assert_eq!(score("ما هو", "ما هو هذا"), 0.0);
    }

    #[test]
    fn test_qa_content_scores_high() {
        let b = score_breakdown("ما هو الذكاء الاصطناعي", QA_CONTENT).unwrap();
        assert_eq!(b.keyword, 1.0);
        // The stored question ends in "؟", so only a trigram matches.
        assert_eq!(b.phrase, 0.6);
        assert!((b.qa - 1.5).abs() < 1e-9, "qa boost kept above 1.0");
        assert_eq!(b.topic, 0.1);
        assert!(b.total > 0.8);
        assert!(b.total <= 1.0);
    }

    #[test]
    fn test_unrelated_content_scores_zero() {
        let s = score("what is ai", "الطقس اليوم مشمس في الرياض");
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_relevant_beats_irrelevant() {
        let query = "طريقة تثبيت البرنامج";
        let relevant = "لتثبيت البرنامج اتبع الخطوات: حمّل البرنامج ثم شغّل ملف التثبيت.";
        let irrelevant = "تاريخ الدولة العثمانية طويل ومليء بالأحداث.";
        assert!(score(query, relevant) > score(query, irrelevant));
    }

    #[test]
    fn test_trigram_phrase() {
        let b = score_breakdown("rust memory safety guarantees", "rust memory safety is great").unwrap();
        assert_eq!(b.phrase, 0.6);
    }

    #[test]
    fn test_fuzzy_keyword_partial_credit() {
        // "program" is a substring of "programming": similarity 7/11.
        let b = score_breakdown("program", "programming").unwrap();
        assert!((b.keyword - 7.0 / 11.0 * 0.7).abs() < 1e-9, "{}", b.keyword);

        // Char-set overlap plus the shared "program" prefix.
        let b = score_breakdown("programs", "programming").unwrap();
        let sim = 6.0 / 9.0 + 7.0 / 11.0 * 0.3;
        assert!((b.keyword - sim * 0.7).abs() < 1e-9, "{}", b.keyword);

        // 4/11 is under the fuzzy threshold.
        let b = score_breakdown("prog", "programming").unwrap();
        assert_eq!(b.keyword, 0.0);
    }

    #[test]
    fn test_topic_bonus_needs_shared_group() {
        let b = score_breakdown("why rust", "how rust works").unwrap();
        assert_eq!(b.topic, 0.0);
        let b = score_breakdown("how rust", "how rust works").unwrap();
        assert_eq!(b.topic, 0.1);
    }

    #[test]
    fn test_tf_counts_repeats() {
        let b = score_breakdown("cache", "cache cache miss").unwrap();
        assert!((b.tf - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rounded_to_four_decimals() {
        let s = score("rust tokio runtime", "the tokio runtime powers async rust code");
        assert_eq!(s, (s * 10_000.0).round() / 10_000.0);
    }

    proptest! {
        #[test]
        fn prop_score_bounded(q in "\\PC{0,30}", c in "\\PC{0,80}") {
            let s = score(&q, &c);
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_empty_content_zero(q in "\\PC{0,30}") {
            prop_assert_eq!(score(&q, ""), 0.0);
            prop_assert_eq!(score("", &q), 0.0);
        }
    }
}
