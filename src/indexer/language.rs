/// Returns `true` for chars in the Arabic blocks (base, supplement, presentation forms).
pub fn is_arabic_char(c: char) -> bool {
    matches!(
        c as u32,
        0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF
    )
}

/// Classifies text as `ar`, `en`, `mixed` or `unknown` by its letters.
pub fn detect_language(s: &str) -> &'static str {
    let mut ar_count = 0;
    let mut en_count = 0;
    let mut total_count = 0;

    for c in s.chars() {
        if c.is_alphabetic() {
            total_count += 1;
            if is_arabic_char(c) {
                ar_count += 1;
            } else if c.is_ascii_alphabetic() {
                en_count += 1;
            }
        }
    }

    if total_count == 0 {
        return "unknown";
    }

    let ar_ratio = ar_count as f64 / total_count as f64;
    let en_ratio = en_count as f64 / total_count as f64;

    if ar_ratio > 0.7 {
        "ar"
    } else if en_ratio > 0.8 {
        "en"
    } else {
        "mixed"
    }
}

/// Whitespace-separated word count, stored as a chunk's `token_count`.
pub fn count_tokens(s: &str) -> usize {
    s.split_whitespace().count()
}
