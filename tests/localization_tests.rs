//! # Localization Tests
//!
//! Message retrieval and formatting for the embedded Bosnian and English
//! resources, including fallback behavior.

use price_tag_verifier::localization::{LocalizationManager, DEFAULT_LANGUAGE};
use std::collections::HashMap;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    const KEYS: [&str; 18] = [
        "verify-confirmed",
        "verify-uncertain",
        "verify-rejected",
        "verify-image-unclear",
        "verify-confirmed-image",
        "verify-uncertain-image",
        "verify-rejected-image",
        "error-validation",
        "error-image-processing",
        "error-invalid-json",
        "error-body-too-large",
        "error-not-found",
        "error-method-not-allowed",
        "error-service-unavailable",
        "error-internal",
        "validation-item-empty",
        "validation-item-too-long",
        "validation-image-too-short",
    ];

    #[test]
    fn test_default_language_is_bosnian() {
        assert_eq!(DEFAULT_LANGUAGE, "bs");
    }

    #[test]
    fn test_every_key_exists_in_both_languages() {
        let manager = setup_localization();

        for language in ["bs", "en"] {
            for key in KEYS {
                let message = manager.get_message_in_language(key, language, None);
                assert!(
                    !message.starts_with("Missing translation:"),
                    "{} missing in {}",
                    key,
                    language
                );
            }
        }
    }

    #[test]
    fn test_confirmed_message_with_args() {
        let manager = setup_localization();

        let message =
            manager.get_message_with_args_in_language("verify-confirmed", "bs", &[("item", "mlijeko")]);
        assert_eq!(
            message,
            "✓ Proizvod potvrđen: 'mlijeko' odgovara cjenovniku."
        );
    }

    #[test]
    fn test_uncertain_message_shows_percentage() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("item", "jogurt");
        args.insert("confidence", "45%");
        let message = manager.get_message_in_language("verify-uncertain", "en", Some(&args));

        assert!(message.contains("'jogurt'"));
        assert!(message.contains("45%"));
    }

    #[test]
    fn test_rejected_message_includes_reasoning() {
        let manager = setup_localization();

        let message = manager.get_message_with_args_in_language(
            "verify-rejected",
            "bs",
            &[
                ("item", "kruh"),
                ("reasoning", "Artikal 'kruh' nije pronađen u tekstu sa cjenovnika."),
            ],
        );
        assert!(message.starts_with('✗'));
        assert!(message.ends_with("nije pronađen u tekstu sa cjenovnika."));
    }

    #[test]
    fn test_unsupported_language_falls_back_to_bosnian() {
        let manager = setup_localization();

        let fallback = manager.get_message_in_language("error-not-found", "de", None);
        let bosnian = manager.get_message_in_language("error-not-found", "bs", None);
        assert_eq!(fallback, bosnian);
        assert!(!manager.is_language_supported("de"));
    }

    #[test]
    fn test_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert_eq!(message, "Missing translation: nonexistent-key");
    }

    #[test]
    fn test_validation_limits_are_interpolated() {
        let manager = setup_localization();

        let message = manager.get_message_with_args_in_language(
            "validation-item-too-long",
            "en",
            &[("max", "200")],
        );
        assert_eq!(message, "Item name can have at most 200 characters.");
    }
}
