//! Transcript normalization.
//!
//! Every trigger and every transcript goes through [`normalize`] so that the
//! matcher only ever compares canonical forms.

use std::sync::OnceLock;

use regex::Regex;

fn separator_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s\p{P}]+").expect("Invalid separator regex"))
}

fn disallowed_char() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Combining marks stay: vowel signs and the virama are part of the letter
    // in abugida scripts.
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{M}\p{N} ]").expect("Invalid character-class regex"))
}

fn space_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("Invalid space regex"))
}

fn combining_mark() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{M}+").expect("Invalid combining-mark regex"))
}

/// Canonicalize raw text for matching.
///
/// Lowercases, turns runs of whitespace and punctuation (any script) into a
/// single space, drops everything that is not a letter, combining mark,
/// digit, or space, and trims. The result never has leading, trailing, or
/// doubled spaces, and `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let spaced = separator_run().replace_all(&lowered, " ");
    let cleaned = disallowed_char().replace_all(&spaced, "");
    let collapsed = space_run().replace_all(&cleaned, " ");
    collapsed.trim().to_string()
}

/// Split normalized text into its non-empty tokens.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Length in characters, the unit the partial-match floors are expressed in.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Remove combining marks, leaving the base glyphs (`க்` becomes `க`).
pub fn strip_marks(text: &str) -> String {
    combining_mark().replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "உட்கார்",
        "  உட்கார்!!  நட,  ஓடு. ",
        "Hello,   World!!",
        "a\t\tb\n\nc",
        "நட… குதி",
        "“quoted” «text» 「括弧」",
        "price: $42 + 7% = ?",
        "İstanbul ΣΟΦΊΑ",
        "emoji 🐱 cat",
        "--- ...",
        "க்\u{200D}ஷ",
        "x\u{0301}y",
        "१२३ 123 ௧௨௩",
    ];

    #[test]
    fn test_tamil_word_is_preserved() {
        assert_eq!(normalize("உட்கார்"), "உட்கார்");
        assert_eq!(normalize("  ஓடுகிறேன் "), "ஓடுகிறேன்");
    }

    #[test]
    fn test_punctuation_becomes_single_space() {
        assert_eq!(normalize("  உட்கார்!!  நட,  ஓடு. "), "உட்கார் நட ஓடு");
        assert_eq!(normalize("Hello,   World!!"), "hello world");
        assert_eq!(normalize("நட…குதி"), "நட குதி");
    }

    #[test]
    fn test_symbols_are_removed() {
        assert_eq!(normalize("emoji 🐱 cat"), "emoji cat");
        assert_eq!(normalize("price: $42"), "price 42");
    }

    #[test]
    fn test_whitespace_variants_collapse() {
        assert_eq!(normalize("a\t\tb\n\nc"), "a b c");
        assert_eq!(normalize("a\u{00A0}\u{3000}b"), "a b");
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("--- ..."), "");
    }

    #[test]
    fn test_digits_from_any_script_are_kept() {
        assert_eq!(normalize("१२३ 123 ௧௨௩"), "१२३ 123 ௧௨௩");
    }

    #[test]
    fn test_idempotent() {
        for sample in SAMPLES {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_no_stray_spaces() {
        for sample in SAMPLES {
            let out = normalize(sample);
            assert!(!out.starts_with(' '), "leading space for {:?}", sample);
            assert!(!out.ends_with(' '), "trailing space for {:?}", sample);
            assert!(!out.contains("  "), "double space for {:?}", sample);
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("நட ஓடு"), vec!["நட", "ஓடு"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_char_len_counts_code_points() {
        assert_eq!(char_len("ஓடு"), 3);
        assert_eq!(char_len("அ"), 1);
        assert_eq!(char_len("உட்கார்"), 7);
    }

    #[test]
    fn test_strip_marks() {
        assert_eq!(strip_marks("க்"), "க");
        assert_eq!(strip_marks("அ"), "அ");
        assert_eq!(strip_marks("கா"), "க");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Tamil letters and signs mixed with punctuation and whitespace.
    fn tamil_transcript() -> impl Strategy<Value = String> {
        "[\u{0B85}-\u{0BB9}\u{0BBE}-\u{0BCD} ,.!?…\t\n\u{00A0}-]{0,40}"
    }

    fn assert_canonical(input: &str) -> Result<(), TestCaseError> {
        let once = normalize(input);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert!(!once.starts_with(' '), "leading space in {:?}", once);
        prop_assert!(!once.ends_with(' '), "trailing space in {:?}", once);
        prop_assert!(!once.contains("  "), "double space in {:?}", once);
        prop_assert!(
            once.chars().all(|c| c == ' ' || !c.is_whitespace()),
            "non-ASCII whitespace in {:?}",
            once
        );
        Ok(())
    }

    proptest! {
        #[test]
        fn normalize_is_canonical_for_any_string(input in any::<String>()) {
            assert_canonical(&input)?;
        }

        #[test]
        fn normalize_is_canonical_for_tamil_transcripts(input in tamil_transcript()) {
            assert_canonical(&input)?;
        }

        #[test]
        fn tokens_never_empty(input in any::<String>()) {
            let normalized = normalize(&input);
            prop_assert!(tokenize(&normalized).iter().all(|t| !t.is_empty()));
        }
    }
}
