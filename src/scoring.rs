//! # Candidate Scoring
//!
//! Pure heuristics that rate cleaned recognition results and pick the one
//! most likely to hold the product name.

/// Starting confidence for any non-empty text
pub const BASE_CONFIDENCE: f64 = 0.30;
/// Bonus per word
pub const WORD_BONUS: f64 = 0.10;
/// Cap on the total word bonus
pub const WORD_BONUS_CAP: f64 = 0.30;
/// Bonus per character of average word length
pub const LENGTH_BONUS: f64 = 0.04;
/// Cap on the total length bonus
pub const LENGTH_BONUS_CAP: f64 = 0.30;
/// Lowest confidence reported for non-empty text
pub const CONFIDENCE_FLOOR: f64 = 0.10;

/// Selector weight per valid word
pub const WORD_WEIGHT: f64 = 1.0;
/// Selector weight of the estimated confidence
pub const CONFIDENCE_WEIGHT: f64 = 2.0;
/// Selector weight per character, applied up to [`CHAR_CAP`] characters
pub const CHAR_WEIGHT: f64 = 0.01;
/// Characters beyond this count add nothing to the selector score
pub const CHAR_CAP: usize = 40;

/// A cleaned recognition result with its estimated confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub confidence: f64,
    pub price: Option<String>,
}

impl Candidate {
    /// Builds a candidate from cleaned text, estimating its confidence.
    pub fn from_cleaned(text: String) -> Self {
        let confidence = estimate_confidence(&text);
        Self {
            text,
            confidence,
            price: None,
        }
    }

    /// The "nothing readable" result.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            price: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Estimates how trustworthy a cleaned text is from its shape alone.
///
/// Empty text scores exactly `0.0`. Otherwise:
///
/// ```text
/// clamp(BASE + min(words · WORD_BONUS, WORD_CAP)
///            + min(avg_len · LENGTH_BONUS, LENGTH_CAP), FLOOR, 1.0)
/// ```
///
/// The result never decreases when words are added or words get longer.
pub fn estimate_confidence(cleaned: &str) -> f64 {
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }

    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let average_length = total_chars as f64 / words.len() as f64;

    let word_bonus = (words.len() as f64 * WORD_BONUS).min(WORD_BONUS_CAP);
    let length_bonus = (average_length * LENGTH_BONUS).min(LENGTH_BONUS_CAP);

    (BASE_CONFIDENCE + word_bonus + length_bonus).clamp(CONFIDENCE_FLOOR, 1.0)
}

/// Selector score of a candidate.
///
/// The character term is bounded by `CHAR_WEIGHT · CHAR_CAP` (0.4), which is
/// below `WORD_WEIGHT`, so an extra word with no loss of confidence always wins.
pub fn selection_score(candidate: &Candidate) -> f64 {
    let chars = candidate
        .text
        .chars()
        .filter(|c| !c.is_whitespace())
        .count()
        .min(CHAR_CAP);
    WORD_WEIGHT * candidate.word_count() as f64
        + CONFIDENCE_WEIGHT * candidate.confidence
        + CHAR_WEIGHT * chars as f64
}

/// Picks the best non-empty candidate; ties keep the first one seen.
///
/// Returns [`Candidate::empty`] when every candidate is empty.
pub fn select_best<I>(candidates: I) -> Candidate
where
    I: IntoIterator<Item = Candidate>,
{
    let mut best: Option<(f64, Candidate)> = None;

    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        let score = selection_score(&candidate);
        match &best {
            Some((best_score, _)) if score <= *best_score => {}
            _ => best = Some((score, candidate)),
        }
    }

    best.map(|(_, candidate)| candidate)
        .unwrap_or_else(Candidate::empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str) -> Candidate {
        Candidate::from_cleaned(text.to_string())
    }

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(estimate_confidence(""), 0.0);
        assert_eq!(estimate_confidence("   "), 0.0);
    }

    #[test]
    fn test_confidence_bounds() {
        for text in ["ab", "mlijeko", "Dukat svježe mlijeko", "a b c d e f g h i j k"] {
            let confidence = estimate_confidence(text);
            assert!((CONFIDENCE_FLOOR..=1.0).contains(&confidence), "{} -> {}", text, confidence);
        }
        let long = "supercalifragilistic ".repeat(20);
        assert!(estimate_confidence(&long) <= 1.0);
    }

    #[test]
    fn test_confidence_monotonic_in_words() {
        let one = estimate_confidence("mlijeko");
        let two = estimate_confidence("mlijeko mlijeko");
        let three = estimate_confidence("mlijeko mlijeko mlijeko");
        assert!(one <= two && two <= three);
    }

    #[test]
    fn test_confidence_monotonic_in_length() {
        assert!(estimate_confidence("ab") <= estimate_confidence("abcd"));
        assert!(estimate_confidence("abcd") <= estimate_confidence("abcdefgh"));
    }

    #[test]
    fn test_more_words_never_lose() {
        let fewer = Candidate {
            text: "čokoladnamlijecnaprelivena".to_string(),
            confidence: 0.5,
            price: None,
        };
        let more = Candidate {
            text: "ab cd".to_string(),
            confidence: 0.5,
            price: None,
        };
        assert!(selection_score(&more) > selection_score(&fewer));
    }

    #[test]
    fn test_select_skips_empty() {
        let best = select_best(vec![candidate(""), candidate("kruh"), candidate("")]);
        assert_eq!(best.text, "kruh");
    }

    #[test]
    fn test_select_all_empty() {
        let best = select_best(vec![candidate(""), candidate("")]);
        assert_eq!(best, Candidate::empty());
        assert_eq!(select_best(Vec::new()), Candidate::empty());
    }

    #[test]
    fn test_ties_keep_first() {
        let first = Candidate {
            text: "kruh".to_string(),
            confidence: 0.6,
            price: Some("1,00 KM".to_string()),
        };
        let second = Candidate {
            text: "hruk".to_string(),
            confidence: 0.6,
            price: None,
        };
        assert_eq!(select_best(vec![first.clone(), second]), first);
    }

    #[test]
    fn test_richer_candidate_wins() {
        let best = select_best(vec![
            candidate("mlijeko"),
            candidate("Dukat svježe mlijeko"),
            candidate("Dukat"),
        ]);
        assert_eq!(best.text, "Dukat svježe mlijeko");
    }
}
