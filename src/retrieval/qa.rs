/// Scanner for explicit question/answer pairs embedded in text.
///
/// Two marker grammars are recognized:
///
/// - long form: `سؤال: … جواب: …` (the answer marker also accepts
///   `اجابه`, `الاجابه`, `الجواب`; the question separator also accepts `؟`/`?`);
///   an answer runs up to the next `سؤال` or the end of the text;
/// - short form: `س: … ج: …`; an answer runs up to the next `س:` or the end.
///
/// Markers are compared on folded, lower-cased characters, so diacritics,
/// tatweel and hamza variants inside a marker still match. Captured text is
/// always sliced from the original input.
use std::ops::Range;

use crate::text::normalize::fold_char;

/// One extracted pair. Text is trimmed; `span` covers the whole match in the
/// source, from the question marker to the end of the answer.
#[derive(Debug, Clone, PartialEq)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Stop {
    /// The question keyword alone ends an answer.
    Keyword,
    /// The full question marker (keyword, whitespace, separator) ends an answer.
    Marker,
}

struct Grammar {
    question: &'static [&'static str],
    question_seps: &'static [char],
    answer: &'static [&'static str],
    answer_seps: &'static [char],
    stop: Stop,
}

const COLONS: &[char] = &[':', '：'];

// Marker words are stored folded (سؤال → سوال).
const LONG_FORM: Grammar = Grammar {
    question: &["سوال"],
    question_seps: &[':', '：', '؟', '?'],
    answer: &["جواب", "اجابه", "الاجابه", "الجواب"],
    answer_seps: COLONS,
    stop: Stop::Keyword,
};

const SHORT_FORM: Grammar = Grammar {
    question: &["س"],
    question_seps: COLONS,
    answer: &["ج", "جواب"],
    answer_seps: COLONS,
    stop: Stop::Marker,
};

/// Folded view of the input: one entry per surviving char with its byte offset.
struct View<'a> {
    text: &'a str,
    chars: Vec<char>,
    offsets: Vec<usize>,
}

impl<'a> View<'a> {
    fn new(text: &'a str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len());
        for (offset, ch) in text.char_indices() {
            if let Some(folded) = fold_char(ch) {
                chars.push(folded.to_lowercase().next().unwrap_or(folded));
                offsets.push(offset);
            }
        }
        Self {
            text,
            chars,
            offsets,
        }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    /// Byte offset of view index `idx` (the text length past the end).
    fn byte(&self, idx: usize) -> usize {
        self.offsets.get(idx).copied().unwrap_or(self.text.len())
    }

    fn slice(&self, from: usize, to: usize) -> &'a str {
        &self.text[self.byte(from)..self.byte(to)]
    }

    fn word_at(&self, idx: usize, word: &str) -> Option<usize> {
        let mut i = idx;
        for wc in word.chars() {
            if self.chars.get(i) != Some(&wc) {
                return None;
            }
            i += 1;
        }
        Some(i)
    }

    fn skip_ws(&self, mut idx: usize) -> usize {
        while idx < self.len() && self.chars[idx].is_whitespace() {
            idx += 1;
        }
        idx
    }

    /// Matches `word whitespace* separator` at `idx`, trying `words` in order.
    /// Returns the index just past the separator.
    fn marker_at(&self, idx: usize, words: &[&str], seps: &[char]) -> Option<usize> {
        words.iter().find_map(|word| {
            let after_word = self.word_at(idx, word)?;
            let sep = self.skip_ws(after_word);
            match self.chars.get(sep) {
                Some(c) if seps.contains(c) => Some(sep + 1),
                _ => None,
            }
        })
    }

    /// First `(start, end)` at or after `from` where the marker matches.
    fn find_marker(&self, from: usize, words: &[&str], seps: &[char]) -> Option<(usize, usize)> {
        (from..self.len()).find_map(|i| self.marker_at(i, words, seps).map(|end| (i, end)))
    }

    fn stops_at(&self, idx: usize, grammar: &Grammar) -> bool {
        match grammar.stop {
            Stop::Keyword => grammar
                .question
                .iter()
                .any(|word| self.word_at(idx, word).is_some()),
            Stop::Marker => self
                .marker_at(idx, grammar.question, grammar.question_seps)
                .is_some(),
        }
    }

    /// Index of the first stop at or after `from`, or the end of the view.
    fn answer_end(&self, from: usize, grammar: &Grammar) -> usize {
        (from..self.len())
            .find(|&i| self.stops_at(i, grammar))
            .unwrap_or(self.len())
    }
}

fn scan(view: &View<'_>, grammar: &Grammar, out: &mut Vec<QaPair>) {
    let mut pos = 0;

    while let Some((q_start, q_marker_end)) =
        view.find_marker(pos, grammar.question, grammar.question_seps)
    {
        let question_from = view.skip_ws(q_marker_end);
        // No answer marker anywhere after this question means none after any
        // later question either.
        let Some((a_marker, a_marker_end)) =
            view.find_marker(question_from, grammar.answer, grammar.answer_seps)
        else {
            break;
        };
        let answer_from = view.skip_ws(a_marker_end);
        let answer_to = view.answer_end(answer_from, grammar);

        out.push(QaPair {
            question: view.slice(question_from, a_marker).trim().to_string(),
            answer: view.slice(answer_from, answer_to).trim().to_string(),
            span: view.byte(q_start)..view.byte(answer_to),
        });

        pos = answer_to;
    }
}

/// Extracts all pairs: long-form pairs first, then short-form pairs.
pub fn extract_pairs(text: &str) -> Vec<QaPair> {
    if text.is_empty() {
        return Vec::new();
    }
    let view = View::new(text);
    let mut pairs = Vec::new();
    scan(&view, &LONG_FORM, &mut pairs);
    scan(&view, &SHORT_FORM, &mut pairs);
    pairs
}

/// The first `جواب:` span of `text`, up to the next `سؤال` or the end.
pub fn extract_answer_span(text: &str) -> Option<String> {
    let view = View::new(text);
    let (_, marker_end) = view.find_marker(0, &["جواب"], COLONS)?;
    let from = view.skip_ws(marker_end);
    let to = view.answer_end(from, &LONG_FORM);
    Some(view.slice(from, to).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_form_single() {
        let text = "سؤال: ما هو الذكاء الاصطناعي؟ جواب: هو فرع من علوم الحاسوب.";
        let pairs = extract_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "ما هو الذكاء الاصطناعي؟");
        assert_eq!(pairs[0].answer, "هو فرع من علوم الحاسوب.");
        assert_eq!(pairs[0].span, 0..text.len());
    }

    #[test]
    fn test_long_form_multiple_stop_at_next_question() {
        let text = "مقدمة\nسؤال: ما اللغة؟\nجواب: العربية.\nسؤال: كم عمرك؟ الجواب: عشرون سنة";
        let pairs = extract_pairs(text);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question, "ما اللغة؟");
        assert_eq!(pairs[0].answer, "العربية.");
        assert_eq!(pairs[1].question, "كم عمرك؟");
        assert_eq!(pairs[1].answer, "عشرون سنة");
        assert!(text[pairs[0].span.clone()].starts_with("سؤال"));
    }

    #[test]
    fn test_marker_variants_fold() {
        // Diacritics and hamza on the markers, alternative answer spelling.
        let text = "سُؤَال ؟ متى تأسست الشركة إجابة : عام ٢٠١٠";
        let pairs = extract_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "متى تأسست الشركة");
        assert_eq!(pairs[0].answer, "عام ٢٠١٠");
    }

    #[test]
    fn test_short_form() {
        let text = "س: ما عاصمة مصر؟\nج: القاهرة\nس: وما عاصمة الأردن؟\nج: عمّان";
        let pairs = extract_pairs(text);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question, "ما عاصمة مصر؟");
        assert_eq!(pairs[0].answer, "القاهرة");
        assert_eq!(pairs[1].answer, "عمّان");
    }

    #[test]
    fn test_short_form_ignores_letters_without_colon() {
        let text = "س: ما هو الحج؟ ج: ركن من أركان الإسلام";
        let pairs = extract_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "ما هو الحج؟");
    }

    #[test]
    fn test_question_without_answer() {
        assert!(extract_pairs("سؤال: بلا جواب هنا").is_empty());
        assert!(extract_pairs("نص عادي بدون أسئلة").is_empty());
        assert!(extract_pairs("").is_empty());
    }

    #[test]
    fn test_question_span_lazy_over_second_question() {
        let text = "سؤال: أ سؤال: ب جواب: ج";
        let pairs = extract_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "أ سؤال: ب");
        assert_eq!(pairs[0].answer, "ج");
    }

    #[test]
    fn test_extract_answer_span() {
        let text = "مقدمة جواب: النص المطلوب سؤال: التالي";
        assert_eq!(extract_answer_span(text).as_deref(), Some("النص المطلوب"));
        assert_eq!(extract_answer_span("لا شيء"), None);
    }
}
