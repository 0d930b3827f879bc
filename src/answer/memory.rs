/// Conversation memory kept per thread as a bounded list of turns.
use crate::db::models::KeyFact;

const QUESTION_CHARS: usize = 200;
const ANSWER_CHARS: usize = 300;
const CONTEXT_ANSWER_CHARS: usize = 150;
const SUMMARY_CHARS: usize = 100;

const CONTEXT_HEADER: &str = "سياق المحادثة:\n";

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Formats the last `turns` facts; `None` when there is nothing to remember.
pub fn format_context(facts: &[KeyFact], turns: usize) -> Option<String> {
    if facts.is_empty() || turns == 0 {
        return None;
    }
    let recent = &facts[facts.len().saturating_sub(turns)..];
    let lines: Vec<String> = recent
        .iter()
        .map(|f| format!("س: {}\nج: {}", f.q, truncate(&f.a, CONTEXT_ANSWER_CHARS)))
        .collect();
    Some(format!("{CONTEXT_HEADER}{}", lines.join("\n")))
}

/// Appends a turn and keeps only the newest `capacity` ones.
pub fn remember(facts: &mut Vec<KeyFact>, question: &str, answer: &str, capacity: usize) {
    facts.push(KeyFact {
        q: truncate(question, QUESTION_CHARS),
        a: truncate(answer, ANSWER_CHARS),
    });
    let excess = facts.len().saturating_sub(capacity);
    facts.drain(..excess);
}

pub fn summary(question: &str) -> String {
    format!("آخر سؤال: {}", truncate(question, SUMMARY_CHARS))
}
