/// Character-set fuzzy matching between two tokens.
use std::collections::HashSet;

use super::keywords::prepare;

/// Weight of the shared leading run in the non-substring case.
const PREFIX_WEIGHT: f64 = 0.3;

/// Similarity in `[0, 1]` between two tokens.
///
/// Both sides are lower-cased and normalized first. Equal strings score 1.0,
/// a substring scores `len(shorter) / len(longer)`, anything else scores the
/// Jaccard index of the two char sets plus a common-prefix bonus.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let w1 = prepare(a);
    let w2 = prepare(b);

    if w1 == w2 {
        return 1.0;
    }

    let len1 = w1.chars().count();
    let len2 = w2.chars().count();

    if w1.contains(w2.as_str()) || w2.contains(w1.as_str()) {
        let shorter = len1.min(len2);
        let longer = len1.max(len2);
        return shorter as f64 / longer as f64;
    }

    let set1: HashSet<char> = w1.chars().collect();
    let set2: HashSet<char> = w2.chars().collect();
    let union = set1.union(&set2).count();
    if union == 0 {
        return 0.0;
    }
    let jaccard = set1.intersection(&set2).count() as f64 / union as f64;

    let common_prefix = w1
        .chars()
        .zip(w2.chars())
        .take_while(|(c1, c2)| c1 == c2)
        .count();
    let prefix_bonus = common_prefix as f64 / len1.max(len2) as f64 * PREFIX_WEIGHT;

    (jaccard + prefix_bonus).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical() {
        assert_eq!(similarity("كتاب", "كتاب"), 1.0);
        assert_eq!(similarity("Rust", "rust"), 1.0);
    }

    #[test]
    fn test_equal_after_normalization() {
        assert_eq!(similarity("مدرسة", "مدرسه"), 1.0);
        assert_eq!(similarity("أحمد", "احمد"), 1.0);
    }

    #[test]
    fn test_substring() {
        let s = similarity("program", "programming");
        assert!((s - 7.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_jaccard_with_prefix() {
        // sets {c,a,t} and {c,a,r}: jaccard 2/4; prefix "ca" 2/3 * 0.3
        let s = similarity("cat", "car");
        assert!((s - (0.5 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_empty() {
        assert_eq!(similarity("", "word"), 0.0);
        assert_eq!(similarity("word", ""), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_disjoint() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    proptest! {
        #[test]
        fn prop_reflexive(a in "[a-zا-ي]{1,12}") {
            prop_assert_eq!(similarity(&a, &a), 1.0);
        }

        #[test]
        fn prop_symmetric(a in "[a-zا-يأة]{0,10}", b in "[a-zا-يأة]{0,10}") {
            prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }

        #[test]
        fn prop_bounded(a in "\\PC{0,12}", b in "\\PC{0,12}") {
            let s = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}
