//! # Text Processing Module
//!
//! Cleans raw recognizer output down to plausible product-name words and pulls
//! a price out of it.
//!
//! ## Token Filtering
//!
//! Raw text is split on whitespace. Each token is reduced twice:
//!
//! ```text
//! "(12,99€"  ──strip non-alphanumerics──►  "12,99"     (checked as number/price/currency)
//! "mlijeko," ──strip non-letters────────►  "mlijeko"   (checked as a word, and emitted)
//! ```
//!
//! A token is dropped when any of these hold:
//! - the word has fewer than 2 characters
//! - the token is a run of more than 6 digits (barcodes, article numbers)
//! - the token is a price such as `12,99`, `4.50KM`, `5KM` or `KM12,99`
//! - the token or its word is a currency marker (`KM`, `BAM`, `EUR`, `HRK`, `RSD`, `DIN`, `USD`)
//! - the word looks like recognizer garbage (see [`is_garbage_word`])
//!
//! Surviving words keep their order and are joined with single spaces, so
//! cleaning already-clean text returns it unchanged.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

/// Words shorter than this are dropped
pub const MIN_WORD_CHARS: usize = 2;
/// Digit-only tokens longer than this are treated as barcodes
pub const MAX_DIGIT_RUN: usize = 6;
/// More consecutive consonants than this marks a word as garbage
pub const MAX_CONSONANT_RUN: usize = 5;
/// Vowel-free words longer than this are garbage
pub const MAX_VOWELLESS_CHARS: usize = 4;
/// Words of at least this length need more than two distinct characters
pub const MIN_CHARS_FOR_VARIETY_CHECK: usize = 4;

/// Currency markers that never belong to a product name
pub const CURRENCY_TOKENS: [&str; 7] = ["KM", "BAM", "EUR", "HRK", "RSD", "DIN", "USD"];

const VOWELS: &str = "aeiouáàâäéèêëíìîïóòôöúùûü";

lazy_static! {
    /// `12,99`, `4.50KM`, `5KM`, `KM12,99`
    static ref PRICE_TOKEN: Regex = Regex::new(
        r"(?i)^(\d+[,.]\d{2}(KM|BAM|EUR|€)?|\d+(KM|BAM|EUR|€)|(KM|BAM|EUR|€)\d+([,.]\d{2})?)$"
    )
    .expect("Price token pattern should be valid");

    /// Price patterns in priority order: amount+currency, currency+amount,
    /// bare decimal amount, whole amount+currency.
    static ref PRICE_PATTERNS: [Regex; 4] = [
        Regex::new(r"(?i)(\d+[,.]\d{2})\s*(KM|BAM|€|EUR)")
            .expect("Amount-currency pattern should be valid"),
        Regex::new(r"(?i)(KM|BAM|€|EUR)\s*(\d+[,.]\d{2})")
            .expect("Currency-amount pattern should be valid"),
        Regex::new(r"\d+[,.]\d{2}").expect("Decimal amount pattern should be valid"),
        Regex::new(r"(?i)(\d+)\s*(KM|BAM|€|EUR)")
            .expect("Whole amount pattern should be valid"),
    ];
}

fn is_vowel(c: char) -> bool {
    VOWELS.contains(c)
}

/// Heuristic check for recognizer garbage such as `xzqpflm`, `lll` or `ababab`.
///
/// Case-insensitive. A word is garbage when it contains a character repeated
/// three times in a row, more than [`MAX_CONSONANT_RUN`] consonants in a row,
/// no vowel at all while longer than [`MAX_VOWELLESS_CHARS`], or at most two
/// distinct characters while at least [`MIN_CHARS_FOR_VARIETY_CHECK`] long.
pub fn is_garbage_word(word: &str) -> bool {
    let chars: Vec<char> = word.to_lowercase().chars().collect();

    if chars
        .windows(3)
        .any(|window| window[0] == window[1] && window[1] == window[2])
    {
        return true;
    }

    let mut consonant_run = 0usize;
    for &c in &chars {
        if c.is_alphabetic() && !is_vowel(c) {
            consonant_run += 1;
            if consonant_run > MAX_CONSONANT_RUN {
                return true;
            }
        } else {
            consonant_run = 0;
        }
    }

    let has_vowel = chars.iter().any(|&c| is_vowel(c));
    if chars.len() > MAX_VOWELLESS_CHARS && !has_vowel {
        return true;
    }

    if chars.len() >= MIN_CHARS_FOR_VARIETY_CHECK {
        let distinct: HashSet<char> = chars.iter().copied().collect();
        if distinct.len() <= 2 {
            return true;
        }
    }

    false
}

/// Reduces one whitespace-delimited token to a product-name word, or rejects it.
pub fn clean_token(token: &str) -> Option<&str> {
    let stripped = token.trim_matches(|c: char| !c.is_alphanumeric());

    if stripped.chars().count() > MAX_DIGIT_RUN && stripped.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if PRICE_TOKEN.is_match(stripped) {
        return None;
    }
    if is_currency(stripped) {
        return None;
    }

    let word = stripped.trim_matches(|c: char| !c.is_alphabetic());
    if word.chars().count() < MIN_WORD_CHARS {
        return None;
    }
    // the emitted word must survive its own cleaning pass
    if is_currency(word) || is_garbage_word(word) {
        return None;
    }

    Some(word)
}

fn is_currency(token: &str) -> bool {
    CURRENCY_TOKENS.contains(&token.to_uppercase().as_str())
}

/// Cleans raw recognizer output into space-separated product-name words.
///
/// # Examples
///
/// ```
/// use price_tag_verifier::text_processing::clean_recognized_text;
///
/// assert_eq!(clean_recognized_text("12,99 KM hljeb"), "hljeb");
/// assert_eq!(clean_recognized_text("Dukat svježe mlijeko 1L"), "Dukat svježe mlijeko");
/// ```
pub fn clean_recognized_text(raw: &str) -> String {
    let words: Vec<&str> = raw.split_whitespace().filter_map(clean_token).collect();
    trace!(
        raw_tokens = raw.split_whitespace().count(),
        kept_words = words.len(),
        "Cleaned recognized text"
    );
    words.join(" ")
}

/// Extracts the first price found in `text`, trying patterns in priority order.
///
/// Currency markers are `KM`, `BAM`, `€` and `EUR` in any case.
///
/// # Examples
///
/// ```
/// use price_tag_verifier::text_processing::extract_price;
///
/// assert_eq!(extract_price("12,99 KM hljeb"), Some("12,99 KM".to_string()));
/// assert_eq!(extract_price("hljeb"), None);
/// ```
pub fn extract_price(text: &str) -> Option<String> {
    PRICE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|found| found.as_str().trim().to_string())
}
