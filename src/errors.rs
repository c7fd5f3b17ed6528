//! # Application Error Types
//!
//! This module defines common error types used throughout the price-tag verifier.
//! Recognition and semantic engine failures never surface here: they degrade
//! to empty attempts or the fallback matcher.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Request validation errors (item names, payload sizes)
    Validation(String),
    /// Image payload could not be decoded
    Decode(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Decode(msg) => write!(f, "[DECODE] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// HTTP status code the transport layer reports for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 422,
            AppError::Decode(_) => 400,
            AppError::Config(_) | AppError::Internal(_) => 500,
        }
    }

    /// Whether the error was caused by the client's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::Decode(_))
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the service
pub mod error_logging {
    use tracing::{error, warn};

    /// Log semantic engine failures; these degrade to the fallback matcher
    pub fn log_semantic_error(
        error: &impl std::fmt::Display,
        operation: &str,
        model: &str,
        breaker_open: bool,
    ) {
        warn!(
            error = %error,
            operation = %operation,
            model = %model,
            breaker_open = %breaker_open,
            "Semantic engine unavailable, using fallback matcher"
        );
    }

    /// Log validation errors with input context
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        warn!(
            error = %error,
            operation = %operation,
            input_type = %input_type,
            input_value = ?input_value.map(truncate_for_log),
            "Validation failed"
        );
    }

    /// Log internal application errors with component context
    pub fn log_internal_error(error: &impl std::fmt::Display, component: &str, operation: &str) {
        error!(
            error = %error,
            component = %component,
            operation = %operation,
            "Internal application error"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }

    fn truncate_for_log(value: &str) -> String {
        if value.chars().count() > 100 {
            format!("{}...", value.chars().take(100).collect::<String>())
        } else {
            value.to_string()
        }
    }
}
