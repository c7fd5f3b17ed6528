//! # Fuzzy Fallback Matcher
//!
//! Decides whether a shopping-list item appears in recognized price-tag text
//! when the semantic engine cannot be used. Three tiers, strongest first:
//!
//! ```text
//! whole word   "mlijeko" in "svježe mlijeko 1L"          → match, 0.85
//! substring    "mlijek"  in "svježemlijeko"              → match, 0.70
//! overlap      ≥70% of item chars found in one word      → match, 0.60 + 0.20·ratio
//! otherwise                                              → no match, 0.50
//! ```
//!
//! Reasoning strings are fixed Bosnian sentences so identical inputs always
//! produce identical verdicts.

/// Confidence of a whole-word occurrence
pub const EXACT_MATCH_CONFIDENCE: f64 = 0.85;
/// Confidence of a bare substring occurrence
pub const PARTIAL_MATCH_CONFIDENCE: f64 = 0.70;
/// Base confidence of a character-overlap match
pub const OVERLAP_BASE_CONFIDENCE: f64 = 0.60;
/// Scale applied to the overlap ratio on top of the base
pub const OVERLAP_RATIO_WEIGHT: f64 = 0.20;
/// Minimum overlap ratio that counts as a match
pub const OVERLAP_MATCH_RATIO: f64 = 0.70;
/// Confidence reported for every non-match
pub const NO_MATCH_CONFIDENCE: f64 = 0.50;
/// Recognized words shorter than this are ignored by the overlap tier
pub const MIN_OVERLAP_WORD_CHARS: usize = 3;

/// Which tier produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    WholeWord,
    Substring,
    CharacterOverlap,
    NoMatch,
}

/// Outcome of a match decision.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchVerdict {
    pub is_match: bool,
    pub confidence: f64,
    pub reasoning: String,
}

impl MatchVerdict {
    /// Builds a verdict, clamping confidence into `[0, 1]`.
    pub fn new(is_match: bool, confidence: f64, reasoning: impl Into<String>) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            is_match,
            confidence,
            reasoning: reasoning.into(),
        }
    }
}

/// Share of the item's characters (with repetition) present anywhere in `word`.
pub fn character_overlap(item: &str, word: &str) -> f64 {
    let item_chars: Vec<char> = item.chars().collect();
    if item_chars.is_empty() {
        return 0.0;
    }
    let present = item_chars.iter().filter(|&&c| word.contains(c)).count();
    present as f64 / item_chars.len() as f64
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `\b` between `before` and `after`, either of which may be the text edge.
fn is_boundary(before: Option<char>, after: Option<char>) -> bool {
    before.is_some_and(is_word_char) != after.is_some_and(is_word_char)
}

/// Whether `needle` occurs in `haystack` with a word boundary on both sides.
fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    let (Some(first), Some(last)) = (needle.chars().next(), needle.chars().next_back()) else {
        return false;
    };
    haystack.match_indices(needle).any(|(start, found)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + found.len()..].chars().next();
        is_boundary(before, Some(first)) && is_boundary(Some(last), after)
    })
}

/// Classifies the match and returns the tier together with the verdict.
pub fn match_with_tier(item_name: &str, recognized_text: &str) -> (MatchTier, MatchVerdict) {
    let item_display = item_name.trim();
    let item = item_display.to_lowercase();
    let text = recognized_text.to_lowercase();

    let no_match = || {
        (
            MatchTier::NoMatch,
            MatchVerdict::new(
                false,
                NO_MATCH_CONFIDENCE,
                format!(
                    "Artikal '{}' nije pronađen u tekstu sa cjenovnika.",
                    item_display
                ),
            ),
        )
    };

    if item.is_empty() || text.trim().is_empty() {
        return no_match();
    }

    if contains_whole_word(&text, &item) {
        return (
            MatchTier::WholeWord,
            MatchVerdict::new(
                true,
                EXACT_MATCH_CONFIDENCE,
                format!("Pronađeno tačno podudaranje: '{}' u tekstu.", item_display),
            ),
        );
    }

    if text.contains(&item) {
        return (
            MatchTier::Substring,
            MatchVerdict::new(
                true,
                PARTIAL_MATCH_CONFIDENCE,
                format!(
                    "Pronađeno djelomično podudaranje: '{}' u tekstu.",
                    item_display
                ),
            ),
        );
    }

    let best = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= MIN_OVERLAP_WORD_CHARS)
        .map(|word| (word, character_overlap(&item, word)))
        .fold(None::<(&str, f64)>, |best, (word, ratio)| match best {
            Some((_, best_ratio)) if ratio <= best_ratio => best,
            _ => Some((word, ratio)),
        });

    match best {
        Some((word, ratio)) if ratio >= OVERLAP_MATCH_RATIO => (
            MatchTier::CharacterOverlap,
            MatchVerdict::new(
                true,
                OVERLAP_BASE_CONFIDENCE + OVERLAP_RATIO_WEIGHT * ratio,
                format!(
                    "Pronađena slična riječ '{}' za artikal '{}' ({:.0}% podudaranja znakova).",
                    word,
                    item_display,
                    ratio * 100.0
                ),
            ),
        ),
        _ => no_match(),
    }
}

/// Decides whether `item_name` appears in `recognized_text`.
///
/// # Examples
///
/// ```
/// use price_tag_verifier::fuzzy_match::fuzzy_match;
///
/// let verdict = fuzzy_match("mlijeko", "Dukat svježe mlijeko 1L");
/// assert!(verdict.is_match);
/// assert_eq!(verdict.confidence, 0.85);
/// ```
pub fn fuzzy_match(item_name: &str, recognized_text: &str) -> MatchVerdict {
    match_with_tier(item_name, recognized_text).1
}
