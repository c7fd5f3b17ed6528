//! # Text Processing Tests
//!
//! Cleaning of raw recognizer output, price extraction, confidence estimation,
//! candidate selection and the fuzzy fallback matcher.

use price_tag_verifier::fuzzy_match::{
    character_overlap, fuzzy_match, match_with_tier, MatchTier, NO_MATCH_CONFIDENCE,
};
use price_tag_verifier::scoring::{estimate_confidence, select_best, Candidate};
use price_tag_verifier::text_processing::{clean_recognized_text, extract_price, is_garbage_word};

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_cleaning_price_tag_line() {
        assert_eq!(clean_recognized_text("12,99 KM hljeb"), "hljeb");
        assert_eq!(extract_price("12,99 KM hljeb"), Some("12,99 KM".to_string()));
    }

    #[test]
    fn test_cleaning_drops_noise_tokens() {
        let raw = "|| Dukat svježe mlijeko 1L\n3871234567890 xzqpflm EUR 2.49 ~~";
        assert_eq!(clean_recognized_text(raw), "Dukat svježe mlijeko");
    }

    #[test]
    fn test_cleaning_keeps_diacritics_and_strips_punctuation() {
        assert_eq!(clean_recognized_text("\"Čokoladna\" torta,"), "Čokoladna torta");
        assert_eq!(clean_recognized_text("Šećer-"), "Šećer");
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let samples = [
            "12,99 KM hljeb",
            "|| Dukat svježe mlijeko 1L",
            "xzqpflm aaab 4,50",
            "Bijeli KRUH 500g akcija!",
            "5KM hljeb",
            "KM12,99 hljeb",
            "3EUR mlijeko",
            "",
        ];
        for raw in samples {
            let once = clean_recognized_text(raw);
            assert_eq!(clean_recognized_text(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_glued_currency_never_reaches_candidate() {
        assert_eq!(clean_recognized_text("5KM hljeb"), "hljeb");
        assert_eq!(clean_recognized_text("KM12,99 hljeb"), "hljeb");
        assert_eq!(clean_recognized_text("3EUR mlijeko"), "mlijeko");
        assert_eq!(clean_recognized_text("mlijeko 2,49-KM"), "mlijeko");
    }

    #[test]
    fn test_garbage_words() {
        assert!(is_garbage_word("xzqpflm"));
        assert!(is_garbage_word("lll"));
        assert!(!is_garbage_word("jogurt"));
        assert!(!is_garbage_word("čaj"));
    }

    #[test]
    fn test_price_formats() {
        assert_eq!(extract_price("Cijena: KM 3,20"), Some("KM 3,20".to_string()));
        assert_eq!(extract_price("1.99€"), Some("1.99€".to_string()));
        assert_eq!(extract_price("samo 7 BAM"), Some("7 BAM".to_string()));
        assert_eq!(extract_price("bez cijene"), None);
    }

    #[test]
    fn test_confidence_bounds_and_monotonicity() {
        assert_eq!(estimate_confidence(""), 0.0);
        assert!(approx(estimate_confidence("hljeb"), 0.60));

        let one = estimate_confidence("mlijeko");
        let two = estimate_confidence("mlijeko svježe");
        let three = estimate_confidence("mlijeko svježe dukat");
        assert!(one <= two && two <= three);

        let long = estimate_confidence(&"riječ ".repeat(50));
        assert!(long > 0.0 && long <= 1.0);
    }

    #[test]
    fn test_selector_prefers_more_words_and_skips_empty() {
        let candidates = vec![
            Candidate::from_cleaned(String::new()),
            Candidate::from_cleaned("mlijeko".to_string()),
            Candidate::from_cleaned("Dukat svježe mlijeko".to_string()),
            Candidate::from_cleaned("mlijeko".to_string()),
        ];
        assert_eq!(select_best(candidates).text, "Dukat svježe mlijeko");

        assert_eq!(
            select_best(vec![Candidate::empty(), Candidate::empty()]),
            Candidate::empty()
        );
    }

    #[test]
    fn test_selector_keeps_first_on_tie() {
        let first = Candidate::from_cleaned("kruh".to_string());
        let second = Candidate::from_cleaned("sira".to_string());
        let selected = select_best(vec![first.clone(), second]);
        assert_eq!(selected, first);
    }

    #[test]
    fn test_fuzzy_exact_and_no_match() {
        let verdict = fuzzy_match("mlijeko", "Dukat svježe mlijeko 1L");
        assert!(verdict.is_match);
        assert_eq!(verdict.confidence, 0.85);

        let verdict = fuzzy_match("kruh", "Čokoladna torta");
        assert!(!verdict.is_match);
        assert_eq!(verdict.confidence, NO_MATCH_CONFIDENCE);
        assert!(verdict.reasoning.contains("kruh"));
    }

    #[test]
    fn test_fuzzy_substring_and_overlap_tiers() {
        let (tier, verdict) = match_with_tier("mlijeko", "mlijekom od");
        assert_eq!(tier, MatchTier::Substring);
        assert_eq!(verdict.confidence, 0.70);

        let (tier, verdict) = match_with_tier("mlijko", "Dukat mlijeko");
        assert_eq!(tier, MatchTier::CharacterOverlap);
        assert!(approx(verdict.confidence, 0.80));
    }

    #[test]
    fn test_fuzzy_match_confidence_invariant() {
        let pairs = [
            ("mlijeko", "Dukat svježe mlijeko"),
            ("kruh", "Bijeli kruh"),
            ("jogurt", "jogurtić"),
            ("sir", "Gauda sir 400g"),
            ("banane", "banana"),
            ("kava", "čaj"),
            ("", "tekst"),
            ("kruh", ""),
        ];
        for (item, text) in pairs {
            let verdict = fuzzy_match(item, text);
            assert!((0.0..=1.0).contains(&verdict.confidence));
            if verdict.is_match {
                assert!(verdict.confidence >= 0.60, "{} / {}", item, text);
            }
        }
    }

    #[test]
    fn test_character_overlap_ratio() {
        assert!(approx(character_overlap("abc", "cab"), 1.0));
        assert!(approx(character_overlap("kruh", "kora"), 0.5));
        assert_eq!(character_overlap("", "anything"), 0.0);
    }
}
