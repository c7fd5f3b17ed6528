//! # Unified Application Configuration
//!
//! This module consolidates all service settings into a single configuration
//! object. Values are loaded from environment variables (after `dotenvy` has
//! read any `.env` file), validated once at startup, and shared read-only.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::ocr_config::OcrConfig;

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            max_body_bytes: 20 * 1024 * 1024, // base64 of a 15MB image
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::Config("Server host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(AppError::Config("Server port cannot be 0".to_string()));
        }
        if self.max_body_bytes == 0 {
            return Err(AppError::Config("max_body_bytes cannot be 0".to_string()));
        }
        Ok(())
    }
}

/// Semantic engine (OpenAI-compatible) settings
#[derive(Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// API key; the engine is disabled when absent
    pub api_key: Option<String>,
    /// Chat model name
    pub model: String,
    /// Base URL of the chat-completions API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

// Hand-written so the API key never reaches a log line.
impl fmt::Debug for SemanticConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SemanticConfig {
    /// Whether an API key is available
    pub fn is_enabled(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }

    /// Validate semantic engine configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.model.trim().is_empty() {
            return Err(AppError::Config("Semantic model cannot be empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Semantic base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(AppError::Config(
                "Semantic timeout must be between 1 and 300 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// How an item is verified against the uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Recognize text on the price tag, then judge the text
    #[default]
    Ocr,
    /// Send the image itself to a vision-capable semantic engine
    Vision,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMode::Ocr => "ocr",
            VerificationMode::Vision => "vision",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ocr" => Some(VerificationMode::Ocr),
            "vision" => Some(VerificationMode::Vision),
            _ => None,
        }
    }
}

/// Decision settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Minimum verdict confidence for a confirmed match
    pub confidence_threshold: f64,
    /// OCR or vision verification
    pub mode: VerificationMode,
    /// Language of user-facing messages
    pub message_language: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            mode: VerificationMode::default(),
            message_language: "bs".to_string(),
        }
    }
}

impl VerificationConfig {
    /// Validate verification configuration
    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AppError::Config(format!(
                "Confidence threshold must be within 0.0-1.0, got {}",
                self.confidence_threshold
            )));
        }
        if self.message_language.trim().is_empty() {
            return Err(AppError::Config(
                "Message language cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub semantic: SemanticConfig,
    pub verification: VerificationConfig,
    pub ocr: OcrConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let server_defaults = ServerConfig::default();
        let semantic_defaults = SemanticConfig::default();
        let verification_defaults = VerificationConfig::default();

        let server = ServerConfig {
            host: env::var("HOST").unwrap_or(server_defaults.host),
            port: env::var("PORT")
                .unwrap_or_else(|_| server_defaults.port.to_string())
                .parse()
                .map_err(|_| AppError::Config("Invalid PORT".to_string()))?,
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| server_defaults.max_body_bytes.to_string())
                .parse()
                .map_err(|_| AppError::Config("Invalid MAX_BODY_BYTES".to_string()))?,
        };

        let semantic = SemanticConfig {
            api_key: env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: env::var("OPENAI_MODEL").unwrap_or(semantic_defaults.model),
            base_url: env::var("OPENAI_BASE_URL").unwrap_or(semantic_defaults.base_url),
            timeout_secs: env::var("SEMANTIC_TIMEOUT_SECS")
                .unwrap_or_else(|_| semantic_defaults.timeout_secs.to_string())
                .parse()
                .map_err(|_| AppError::Config("Invalid SEMANTIC_TIMEOUT_SECS".to_string()))?,
        };

        let mode = match env::var("VERIFICATION_MODE") {
            Ok(raw) => VerificationMode::parse(&raw).ok_or_else(|| {
                AppError::Config(format!(
                    "VERIFICATION_MODE must be 'ocr' or 'vision', got '{}'",
                    raw
                ))
            })?,
            Err(_) => verification_defaults.mode,
        };

        let verification = VerificationConfig {
            confidence_threshold: env::var("CONFIDENCE_THRESHOLD")
                .unwrap_or_else(|_| verification_defaults.confidence_threshold.to_string())
                .parse()
                .map_err(|_| AppError::Config("Invalid CONFIDENCE_THRESHOLD".to_string()))?,
            mode,
            message_language: env::var("MESSAGE_LANGUAGE")
                .unwrap_or(verification_defaults.message_language),
        };

        Ok(Self {
            server,
            semantic,
            verification,
            ocr: OcrConfig::from_env()?,
            observability: ObservabilityConfig::from_env(),
        })
    }

    /// Validate every section
    pub fn validate(&self) -> AppResult<()> {
        self.server.validate()?;
        self.semantic.validate()?;
        self.verification.validate()?;
        self.ocr.validate()?;
        self.observability.validate().map_err(AppError::Config)?;
        Ok(())
    }

    /// One-line summary safe for logs
    pub fn summary(&self) -> String {
        format!(
            "listen={}:{} mode={} language={} model={} semantic={} threshold={} attempts={}",
            self.server.host,
            self.server.port,
            self.verification.mode.as_str(),
            self.ocr.language,
            self.semantic.model,
            if self.semantic.is_enabled() { "enabled" } else { "disabled" },
            self.verification.confidence_threshold,
            self.ocr.attempt_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.verification.confidence_threshold, 0.6);
        assert_eq!(config.semantic.model, "gpt-4o-mini");
        assert_eq!(config.verification.mode, VerificationMode::Ocr);
    }

    #[test]
    fn test_threshold_bounds() {
        let mut config = AppConfig::default();
        config.verification.confidence_threshold = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_semantic_base_url_validation() {
        let config = SemanticConfig {
            base_url: "api.openai.com".to_string(),
            ..SemanticConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted() {
        let config = SemanticConfig {
            api_key: Some("sk-secret".to_string()),
            ..SemanticConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));

        let app = AppConfig {
            semantic: config,
            ..AppConfig::default()
        };
        assert!(!app.summary().contains("sk-secret"));
        assert!(app.summary().contains("semantic=enabled"));
    }

    #[test]
    fn test_verification_mode_parse() {
        assert_eq!(VerificationMode::parse("Vision"), Some(VerificationMode::Vision));
        assert_eq!(VerificationMode::parse("ocr"), Some(VerificationMode::Ocr));
        assert_eq!(VerificationMode::parse("both"), None);
    }
}
