/// Arabic text normalization.
///
/// Folds the spelling variants that informal Arabic text mixes freely
/// (diacritics, hamza carriers, teh marbuta, alef maksura, tatweel, elongated
/// letters) and widens recall by emitting definite-article-stripped forms
/// next to the original words.

/// The definite article that triggers the stripped/original duplication.
const DEFINITE_ARTICLE: &str = "ال";

/// Tokens need more than this many chars before the article is stripped.
const ARTICLE_MIN_CHARS: usize = 3;

const TATWEEL: char = '\u{0640}';

/// Returns `true` for the Arabic combining marks removed during normalization.
pub fn is_diacritic(ch: char) -> bool {
    matches!(ch,
        '\u{0610}'..='\u{061A}' |
        '\u{064B}'..='\u{065F}' |
        '\u{0670}' |
        '\u{06D6}'..='\u{06DC}' |
        '\u{06DF}'..='\u{06E8}' |
        '\u{06EA}'..='\u{06ED}'
    )
}

/// Character-level folding shared by the normalizer and the QA marker scanner.
///
/// Returns `None` for characters that are dropped (diacritics, tatweel).
pub fn fold_char(ch: char) -> Option<char> {
    if is_diacritic(ch) || ch == TATWEEL {
        return None;
    }
    let folded = match ch {
        // Alef with madda, hamza above, hamza below, wasla
        '\u{0622}' | '\u{0623}' | '\u{0625}' | '\u{0671}' => '\u{0627}',
        // Waw with hamza
        '\u{0624}' => '\u{0648}',
        // Yeh with hamza
        '\u{0626}' => '\u{064A}',
        // Teh marbuta -> heh
        '\u{0629}' => '\u{0647}',
        // Alef maksura -> yeh
        '\u{0649}' => '\u{064A}',
        other => other,
    };
    Some(folded)
}

/// Applies [`fold_char`] to every character of `text`.
pub fn fold(text: &str) -> String {
    text.chars().filter_map(fold_char).collect()
}

/// Collapses every run of three or more identical characters into one.
fn collapse_runs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == ch {
            run += 1;
        }
        if run >= 3 {
            out.push(ch);
        } else {
            for _ in 0..run {
                out.push(ch);
            }
        }
        i += run;
    }

    out
}

fn strips_article(word: &str) -> bool {
    word.starts_with(DEFINITE_ARTICLE) && word.chars().count() > ARTICLE_MIN_CHARS
}

/// The forms emitted for one word, deepest strip first, original last.
fn article_chain(word: &str) -> Vec<&str> {
    let mut chain = vec![word];
    let mut current = word;
    while strips_article(current) {
        current = &current[DEFINITE_ARTICLE.len()..];
        chain.push(current);
    }
    chain.reverse();
    chain
}

/// Emits `chain` into `out`, skipping the leading members that are already
/// the trailing tokens of `out`.
fn push_chain<'a>(out: &mut Vec<&'a str>, chain: &[&'a str]) {
    let max_overlap = chain.len().saturating_sub(1).min(out.len());
    let overlap = (1..=max_overlap)
        .rev()
        .find(|&k| out[out.len() - k..] == chain[..k])
        .unwrap_or(0);
    out.extend_from_slice(&chain[overlap..]);
}

/// Canonicalizes Arabic (and mixed-language) text.
///
/// Does not lower-case; callers that need case-insensitivity lower-case
/// first. The result is a fixed point: `normalize(&normalize(x)) ==
/// normalize(x)`.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let folded = collapse_runs(&fold(text));

    let mut words: Vec<&str> = Vec::new();
    for word in folded.split_whitespace() {
        if strips_article(word) {
            push_chain(&mut words, &article_chain(word));
        } else {
            words.push(word);
        }
    }

    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_diacritics() {
        assert_eq!(normalize("مَدْرَسَةٌ"), "مدرسه");
    }

    #[test]
    fn test_unifies_hamza_and_letters() {
        assert_eq!(normalize("أحمد إلى آخر"), "احمد الي اخر");
        assert_eq!(normalize("مؤمن"), "مومن");
        assert_eq!(normalize("قائم"), "قايم");
        assert_eq!(normalize("مستشفى"), "مستشفي");
    }

    #[test]
    fn test_removes_tatweel_and_elongation() {
        assert_eq!(normalize("جـــميل"), "جميل");
        assert_eq!(normalize("رائعععع"), "رايع");
        // Runs of two are kept.
        assert_eq!(normalize("book"), "book");
    }

    #[test]
    fn test_article_duplication() {
        assert_eq!(normalize("الكتاب"), "كتاب الكتاب");
        // Too short to strip.
        assert_eq!(normalize("الم"), "الم");
        assert_eq!(
            normalize("ما هو الذكاء الاصطناعي"),
            "ما هو ذكاء الذكاء اصطناعي الاصطناعي"
        );
    }

    #[test]
    fn test_article_chain() {
        assert_eq!(normalize("الالكتاب"), "كتاب الكتاب الالكتاب");
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
    }

    #[test]
    fn test_idempotent_examples() {
        for text in [
            "الكتاب",
            "ذكاء الذكاء",
            "الالكتاب الجديد",
            "سؤال: ما هو الذكاء الاصطناعي؟ جواب: هو فرع من علوم الحاسوب.",
            "mixed العربية and English",
        ] {
            let once = normalize(text);
            assert_eq!(normalize(&once), once, "not idempotent for {text:?}");
        }
    }

    #[test]
    fn test_fold_char() {
        assert_eq!(fold_char('\u{064E}'), None);
        assert_eq!(fold_char(TATWEEL), None);
        assert_eq!(fold_char('أ'), Some('ا'));
        assert_eq!(fold_char('x'), Some('x'));
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(s in "[ا-يأإآؤئةىـَُِ a-z\\n]{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
