use std::cmp::Reverse;
use std::fs;
use std::path::Path;

use crate::retrieval::qa;

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub content: String,
    pub position: usize,
}

/// Reads a text file (lossy UTF-8) and segments it.
pub fn parse_file<P: AsRef<Path>>(
    filepath: P,
    size: usize,
    overlap: usize,
) -> std::io::Result<Vec<Segment>> {
    let bytes = fs::read(filepath)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(segment(&content, size, overlap)
        .into_iter()
        .enumerate()
        .map(|(position, content)| Segment { content, position })
        .collect())
}

/// Splits text into segments of at most `size` words.
///
/// QA pairs win over everything else: each pair becomes one segment and is
/// never split. A pair found inside another pair's span is dropped, and prose
/// before the first pair is segmented as plain text. Otherwise blank-line
/// paragraphs are returned as they are when they all fit, and windowed with
/// `overlap` words of carry-over when they don't.
pub fn segment(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let overlap = overlap.min(size - 1);

    let mut pairs = qa::extract_pairs(text);
    if pairs.is_empty() {
        return segment_plain(text, size, overlap);
    }

    // Outer spans first when two pairs start together.
    pairs.sort_by_key(|p| (p.span.start, Reverse(p.span.end)));

    let mut out = segment_plain(&text[..pairs[0].span.start], size, overlap);
    let mut covered = 0;
    for pair in &pairs {
        if pair.span.end <= covered {
            continue;
        }
        covered = pair.span.end;
        let content = text[pair.span.clone()].trim();
        if !content.is_empty() {
            out.push(content.to_string());
        }
    }
    out
}

fn segment_plain(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let paragraphs = split_paragraphs(text);
    if paragraphs.iter().all(|p| word_count(p) <= size) {
        return paragraphs;
    }

    window_paragraphs(&paragraphs, size, overlap)
}

/// Paragraphs separated by blank lines, trimmed, never empty.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Last `n` words of `s`: the carry-over a following segment starts with.
fn tail_words(s: &str, n: usize) -> Vec<String> {
    let words: Vec<&str> = s.split_whitespace().collect();
    words[words.len().saturating_sub(n)..]
        .iter()
        .map(|w| w.to_string())
        .collect()
}

/// Segment under construction. `fresh` is false while it holds only the
/// carry-over seed, which has already been emitted as part of the previous
/// segment.
#[derive(Default)]
struct Pending {
    text: String,
    words: usize,
    fresh: bool,
}

impl Pending {
    fn seeded<S: AsRef<str>>(seed: &[S]) -> Self {
        let words: Vec<&str> = seed.iter().map(<S as AsRef<str>>::as_ref).collect();
        Self {
            text: words.join(" "),
            words: words.len(),
            fresh: false,
        }
    }

    fn push(&mut self, para: &str, para_words: usize) {
        if !self.text.is_empty() {
            self.text.push_str("\n\n");
        }
        self.text.push_str(para);
        self.words += para_words;
        self.fresh = true;
    }

    fn flush_into(&mut self, out: &mut Vec<String>) {
        if self.fresh && !self.text.trim().is_empty() {
            out.push(std::mem::take(&mut self.text));
        }
        *self = Self::default();
    }
}

fn window_paragraphs(paragraphs: &[String], size: usize, overlap: usize) -> Vec<String> {
    let step = (size - overlap).max(1);
    let mut out = Vec::new();
    let mut pending = Pending::default();

    for para in paragraphs {
        let para_words = word_count(para);

        if para_words > size {
            // The first window repeats the tail of whatever came before.
            let seed = tail_words(&pending.text, overlap);
            pending.flush_into(&mut out);

            let words: Vec<&str> = seed
                .iter()
                .map(String::as_str)
                .chain(para.split_whitespace())
                .collect();
            let mut start = 0;
            loop {
                let end = (start + size).min(words.len());
                out.push(words[start..end].join(" "));
                if end == words.len() {
                    let seed_from = end - overlap.min(end - start);
                    pending = Pending::seeded(&words[seed_from..end]);
                    break;
                }
                start += step;
            }
            continue;
        }

        if pending.words + para_words > size {
            let seed = tail_words(&pending.text, overlap);
            let keep = seed.len().min(size - para_words);

            let mut next = Pending::seeded(&seed[seed.len() - keep..]);
            pending.flush_into(&mut out);
            next.push(para, para_words);
            pending = next;
        } else {
            pending.push(para, para_words);
        }
    }

    pending.flush_into(&mut out);
    out
}

/// Character windows of up to `size` chars starting every `step` chars.
/// Windows near the end are shorter.
pub fn char_windows(text: &str, size: usize, step: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let size = size.max(1);
    let step = step.max(1);

    (0..chars.len())
        .step_by(step)
        .map(|start| chars[start..(start + size).min(chars.len())].iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    fn words(prefix: &str, n: usize) -> String {
        (0..n)
            .map(|i| format!("{prefix}{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_paragraphs_returned_as_is() {
        let content = "Paragraph 1\n\nParagraph 2\n  \nParagraph 3";
        let segments = segment(content, 500, 50);
        assert_eq!(segments, vec!["Paragraph 1", "Paragraph 2", "Paragraph 3"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(segment("", 500, 50).is_empty());
        assert!(segment("   \n\n   \n\n   ", 500, 50).is_empty());
    }

    #[test]
    fn test_qa_pairs_kept_whole() {
        let content = "سؤال: ما هو الحج؟\nجواب: ركن من أركان الإسلام.\n\nسؤال: ما هي الزكاة؟\nجواب: حق المال.";
        let segments = segment(content, 3, 1);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].starts_with("سؤال: ما هو الحج؟"));
        assert!(segments[0].ends_with("ركن من أركان الإسلام."));
        assert_eq!(segments[1], "سؤال: ما هي الزكاة؟\nجواب: حق المال.");
    }

    #[test]
    fn test_nested_short_pair_not_duplicated() {
        let content = "سؤال: ما هو الحج؟ جواب: ركن.\nس: ما الزكاة؟ ج: حق المال.";
        let segments = segment(content, 500, 50);
        assert_eq!(segments, vec![content]);
    }

    #[test]
    fn test_prose_before_first_pair_kept() {
        let content = "مقدمة مهمة عن سياسة المتجر.\n\nسؤال: ما رسوم الشحن؟ جواب: مجاني.";
        let segments = segment(content, 500, 50);
        assert_eq!(
            segments,
            vec!["مقدمة مهمة عن سياسة المتجر.", "سؤال: ما رسوم الشحن؟ جواب: مجاني."]
        );
    }

    #[test]
    fn test_long_text_windows_with_overlap() {
        // 1200 words in one paragraph.
        let content = words("w", 1200);
        let segments = segment(&content, 500, 50);

        assert!(segments.len() >= 3);
        for seg in &segments {
            assert!(word_count(seg) <= 500);
        }
        for pair in segments.windows(2) {
            let prev: Vec<&str> = pair[0].split_whitespace().collect();
            let next: Vec<&str> = pair[1].split_whitespace().collect();
            assert_eq!(prev[prev.len() - 50..], next[..50]);
            assert_ne!(prev[prev.len() - 51], next[0]);
        }
        assert!(segments.last().unwrap().ends_with("w1199"));
    }

    #[test]
    fn test_accumulated_paragraphs_carry_overlap() {
        let content = [words("a", 300), words("b", 300), words("c", 600)].join("\n\n");
        let segments = segment(&content, 500, 50);

        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], words("a", 300));
        // The second segment is seeded with the first one's last 50 words.
        assert!(segments[1].starts_with("a250 "));
        assert!(segments[1].ends_with("b299"));
        assert_eq!(word_count(&segments[1]), 350);
        assert!(segments[2].starts_with("b250 "));
        assert!(segments[3].ends_with("c599"));
        for pair in segments.windows(2) {
            assert_shared_words(&pair[0], &pair[1], 50);
        }
    }

    fn assert_shared_words(prev: &str, next: &str, n: usize) {
        let prev: Vec<&str> = prev.split_whitespace().collect();
        let next: Vec<&str> = next.split_whitespace().collect();
        assert_eq!(prev[prev.len() - n..], next[..n]);
    }

    #[test]
    fn test_long_paragraph_after_short_one_keeps_overlap() {
        let content = [words("a", 300), words("c", 600)].join("\n\n");
        let segments = segment(&content, 500, 50);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], words("a", 300));
        assert!(segments[1].starts_with("a250 "));
        assert!(segments[1].ends_with(" c449"));
        assert_eq!(segments[2], (400..600).map(|i| format!("c{i}")).collect::<Vec<_>>().join(" "));
        for seg in &segments {
            assert!(word_count(seg) <= 500);
        }
        for pair in segments.windows(2) {
            assert_shared_words(&pair[0], &pair[1], 50);
        }
    }

    #[test]
    fn test_consecutive_long_paragraphs_keep_overlap() {
        let content = [words("a", 600), words("c", 600)].join("\n\n");
        let segments = segment(&content, 500, 50);
        for pair in segments.windows(2) {
            assert_shared_words(&pair[0], &pair[1], 50);
        }
        assert!(segments.last().unwrap().ends_with("c599"));
    }

    #[test]
    fn test_seed_trimmed_to_fit() {
        let content = [words("a", 10), words("b", 9), words("c", 20)].join("\n\n");
        let segments = segment(&content, 12, 5);
        for seg in &segments {
            assert!(word_count(seg) <= 12, "{seg}");
        }
        assert!(segments.iter().any(|s| s.contains("b8")));
        assert!(segments.last().unwrap().ends_with("c19"));
    }

    #[test]
    fn test_degenerate_sizes() {
        let segments = segment("one two three\n\nfour", 0, 10);
        assert!(segments.iter().all(|s| word_count(s) == 1));
        assert!(segments.last().unwrap().ends_with("four"));
    }

    #[test]
    fn test_char_windows() {
        let text: String = "ابجد".repeat(250);
        let windows = char_windows(&text, 500, 400);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].chars().count(), 500);
        assert_eq!(windows[2].chars().count(), 200);

        // A window starts every step, even after one reached the end.
        let windows = char_windows(&"ب".repeat(900), 500, 400);
        let lens: Vec<usize> = windows.iter().map(|w| w.chars().count()).collect();
        assert_eq!(lens, vec![500, 500, 100]);
        assert!(char_windows("", 500, 400).is_empty());
        assert_eq!(char_windows("abc", 500, 400), vec!["abc"]);
    }

    #[test]
    fn test_parse_file() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        write!(temp_file, "# Title\n\nA short file.").unwrap();

        let segments = parse_file(temp_file.path(), 500, 50).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].position, 1);
        assert_eq!(segments[1].content, "A short file.");
    }

    proptest! {
        #[test]
        fn prop_segments_never_empty(text in "[a-z \\n]{0,400}", size in 1usize..40, overlap in 0usize..40) {
            let segments = segment(&text, size, overlap);
            prop_assert!(segments.iter().all(|s| !s.trim().is_empty()));
            if !text.trim().is_empty() {
                prop_assert!(!segments.is_empty());
            }
        }

        #[test]
        fn prop_last_word_kept(text in "[a-z]{1,6}( [a-z]{1,6}){0,80}", size in 1usize..20, overlap in 0usize..20) {
            let segments = segment(&text, size, overlap);
            let last = text.split_whitespace().last().unwrap();
            prop_assert!(segments.last().unwrap().ends_with(last));
        }
    }
}
