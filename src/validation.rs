//! # Request Validation
//!
//! Checks a verification request before any image work starts.

use crate::errors::{AppError, AppResult};
use crate::models::VerifyItemRequest;

/// Longest accepted item name, in characters
pub const MAX_ITEM_NAME_CHARS: usize = 200;
/// Shortest accepted base64 payload, in characters
pub const MIN_IMAGE_BASE64_CHARS: usize = 100;

/// Which rule a request broke; the transport layer localizes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    ItemNameEmpty,
    ItemNameTooLong,
    ImageTooShort,
}

impl ValidationFailure {
    /// Fluent message key
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationFailure::ItemNameEmpty => "validation-item-empty",
            ValidationFailure::ItemNameTooLong => "validation-item-too-long",
            ValidationFailure::ImageTooShort => "validation-image-too-short",
        }
    }
}

/// Validates an item name: non-empty after trimming, at most 200 characters.
pub fn validate_item_name(item_name: &str) -> Result<(), ValidationFailure> {
    let trimmed = item_name.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::ItemNameEmpty);
    }
    if trimmed.chars().count() > MAX_ITEM_NAME_CHARS {
        return Err(ValidationFailure::ItemNameTooLong);
    }
    Ok(())
}

/// Validates the base64 payload length.
pub fn validate_image_payload(image_base64: &str) -> Result<(), ValidationFailure> {
    if image_base64.trim().chars().count() < MIN_IMAGE_BASE64_CHARS {
        return Err(ValidationFailure::ImageTooShort);
    }
    Ok(())
}

/// Runs every request check, reporting the first failure.
pub fn check_request(request: &VerifyItemRequest) -> Result<(), ValidationFailure> {
    validate_item_name(&request.item_name)?;
    validate_image_payload(&request.image_base64)?;
    Ok(())
}

/// [`check_request`] mapped into the application error type.
pub fn validate_request(request: &VerifyItemRequest) -> AppResult<()> {
    check_request(request).map_err(|failure| {
        crate::errors::error_logging::log_validation_error(
            &failure.message_key(),
            "validate_request",
            "verify_request",
            Some(&request.item_name),
        );
        AppError::Validation(failure.message_key().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(item: &str, image_len: usize) -> VerifyItemRequest {
        VerifyItemRequest {
            item_name: item.to_string(),
            image_base64: "A".repeat(image_len),
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(check_request(&request("mlijeko", 100)).is_ok());
        assert!(check_request(&request(&"ž".repeat(200), 500)).is_ok());
    }

    #[test]
    fn test_item_name_rules() {
        assert_eq!(
            check_request(&request("   ", 200)),
            Err(ValidationFailure::ItemNameEmpty)
        );
        assert_eq!(
            check_request(&request(&"a".repeat(201), 200)),
            Err(ValidationFailure::ItemNameTooLong)
        );
    }

    #[test]
    fn test_image_length_rule() {
        assert_eq!(
            check_request(&request("kruh", 99)),
            Err(ValidationFailure::ImageTooShort)
        );
    }

    #[test]
    fn test_validate_request_maps_to_app_error() {
        let err = validate_request(&request("", 200)).unwrap_err();
        assert_eq!(err, AppError::Validation("validation-item-empty".to_string()));
    }
}
