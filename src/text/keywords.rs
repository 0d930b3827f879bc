/// Tokenization, stopword filtering and keyword extraction.
use std::collections::HashSet;
use std::sync::LazyLock;

use super::normalize::{fold, normalize};

/// Arabic (MSA + common dialect fillers) and English stopwords, as written.
const STOP_WORDS: &[&str] = &[
    "في", "من", "على", "إلى", "الى", "عن", "مع", "هذا", "هذه", "ذلك", "تلك",
    "التي", "الذي", "اللذان", "اللتان", "الذين", "اللاتي", "اللواتي",
    "هو", "هي", "هم", "هن", "أنا", "نحن", "أنت", "أنتم", "أنتن",
    "كان", "كانت", "يكون", "تكون", "كانوا", "ليس", "ليست",
    "ما", "لا", "لم", "لن", "قد", "سوف", "سأ", "سيكون",
    "و", "أو", "ثم", "ف", "لكن", "بل", "إن", "أن", "ان",
    "كل", "بعض", "أي", "كيف", "أين", "متى", "لماذا", "ماذا",
    "هل", "إذا", "عند", "عندما", "حتى", "منذ", "بين",
    "هنا", "هناك", "الآن", "أيضاً", "أيضا", "جداً", "جدا", "فقط",
    "ال", "لل", "بال", "غير", "بدون", "حول", "خلال",
    "يا", "لي", "لك", "له", "لها", "لنا", "لهم", "لهن",
    "الي", "علي", "فيه", "فيها", "منه", "منها",
    "أنه", "أنها", "إنه", "إنها", "لأن", "لان",
    "كما", "مثل", "مثلا", "حيث", "بعد", "قبل", "فوق", "تحت",
    "هذي", "هاذا", "هاذي", "ذا", "دا", "دي", "اللي",
    "شو", "ايش", "وش", "كيفا", "ليش", "ليه",
    "يعني", "طيب", "خلاص", "بس", "كمان", "برضه", "برضو",
    "ممكن", "يمكن", "لازم", "عشان", "علشان",
    "is", "the", "a", "an", "and", "or", "what", "how", "why",
    "can", "do", "does", "are", "am", "was", "were", "be", "to", "of",
    "in", "on", "at", "for", "with", "about", "it", "this", "that",
];

/// Prefixes removed during stem expansion.
const PREFIXES: &[&str] = &["ال", "وال", "بال", "لل", "فال", "كال", "ولل"];

/// Suffixes removed during stem expansion.
const SUFFIXES: &[&str] = &["ات", "ين", "ون", "ان", "ها", "هم", "ية", "يه", "كم", "نا"];

/// Number of raw words used when stemming yields nothing.
const FALLBACK_WORDS: usize = 5;

static STOP_SET: LazyLock<HashSet<String>> = LazyLock::new(|| {
    let mut set = HashSet::with_capacity(STOP_WORDS.len() * 2);
    for word in STOP_WORDS {
        set.insert((*word).to_string());
        set.insert(fold(word));
    }
    set
});

pub fn is_stopword(token: &str) -> bool {
    STOP_SET.contains(token)
}

/// Replaces every char that is not alphanumeric, `_` or whitespace with a space.
pub fn clean(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Lower-cases and normalizes `text`.
pub fn prepare(text: &str) -> String {
    normalize(&text.to_lowercase())
}

/// Tokens of already [`prepare`]d text: cleaned, longer than one char and,
/// when `drop_stopwords` is set, not stopwords.
pub fn tokenize(prepared: &str, drop_stopwords: bool) -> Vec<String> {
    clean(prepared)
        .split_whitespace()
        .filter(|w| w.chars().count() > 1 && !(drop_stopwords && is_stopword(w)))
        .map(str::to_string)
        .collect()
}

/// Filtered query tokens: normalized, cleaned, longer than one char, not stopwords.
///
/// Order and duplicates are preserved (trigram checks depend on them).
pub fn query_tokens(text: &str) -> Vec<String> {
    tokenize(&prepare(text), true)
}

/// Content tokens: like [`query_tokens`] but without the stopword filter.
pub fn content_tokens(text: &str) -> Vec<String> {
    tokenize(&prepare(text), false)
}

fn push_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, word: &str) {
    if seen.insert(word.to_string()) {
        out.push(word.to_string());
    }
}

/// Extracts the expanded keyword set used for the coarse storage filter.
///
/// Each keyword is kept as is and also with any of the fixed prefixes or
/// suffixes removed, provided the remainder is long enough. The result is
/// duplicate-free and keeps first-seen order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let cleaned = clean(&prepare(text));
    let words: Vec<&str> = cleaned.split_whitespace().collect();

    let mut stems = Vec::new();
    let mut seen = HashSet::new();

    for kw in words
        .iter()
        .filter(|w| w.chars().count() > 1 && !is_stopword(w))
    {
        push_unique(&mut stems, &mut seen, kw);
        let len = kw.chars().count();

        for prefix in PREFIXES {
            if let Some(rest) = kw.strip_prefix(prefix) {
                if len > prefix.chars().count() + 2 {
                    push_unique(&mut stems, &mut seen, rest);
                }
            }
        }
        for suffix in SUFFIXES {
            if let Some(rest) = kw.strip_suffix(suffix) {
                if len > suffix.chars().count() + 2 {
                    push_unique(&mut stems, &mut seen, rest);
                }
            }
        }
    }

    if stems.is_empty() {
        return words
            .iter()
            .take(FALLBACK_WORDS)
            .map(|w| w.to_string())
            .collect();
    }

    stems
}
