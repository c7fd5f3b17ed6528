//! # OCR Configuration Module
//!
//! This module defines configuration structures for the recognition pipeline:
//! the variant × page-segmentation grid, rescaling bounds, per-attempt limits
//! and the semantic engine's circuit breaker settings.

use std::env;

use crate::errors::{AppError, AppResult};
use crate::preprocessing::VariantKind;

// Constants for OCR configuration
pub const DEFAULT_LANGUAGE: &str = "hrv";
/// Smaller side of the image is upscaled to at least this many pixels
pub const MIN_DIMENSION: u32 = 800;
/// Larger side of the image is downscaled to at most this many pixels
pub const MAX_DIMENSION: u32 = 2400;
pub const DEFAULT_CONTRAST_FACTOR: f32 = 1.5;
pub const SOURCE_DPI: i32 = 300;
pub const MAX_IMAGE_BYTES: usize = 15 * 1024 * 1024; // 15MB decoded payload limit

/// Limits applied to recognition attempts and to the semantic engine
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Timeout for a single recognition attempt in seconds
    pub attempt_timeout_secs: u64,
    /// Recognition attempts allowed to run at once per request
    pub max_concurrent_attempts: usize,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: 15,
            max_concurrent_attempts: 4,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

impl RecoveryConfig {
    /// Validate recovery configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.attempt_timeout_secs == 0 {
            return Err(AppError::Config(
                "attempt_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent_attempts == 0 {
            return Err(AppError::Config(
                "max_concurrent_attempts must be greater than 0".to_string(),
            ));
        }
        if self.circuit_breaker_threshold == 0 {
            return Err(AppError::Config(
                "circuit_breaker_threshold must be greater than 0".to_string(),
            ));
        }
        if self.circuit_breaker_reset_secs == 0 {
            return Err(AppError::Config(
                "circuit_breaker_reset_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Page Segmentation Mode for Tesseract OCR
///
/// Only the layouts that make sense for a price tag are listed; each one is a
/// different guess at how the product name is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    #[default]
    Auto = 3,
    /// Assume a single column of text
    SingleColumn = 4,
    /// Assume a single uniform block of text
    SingleBlock = 6,
    /// Treat the image as a single text line
    SingleLine = 7,
    /// Treat the image as a single word
    SingleWord = 8,
    /// Find as much text as possible in no particular order
    SparseText = 11,
    /// Treat the image as a single text line, bypassing Tesseract-specific hacks
    RawLine = 13,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SingleWord => "8",
            PageSegMode::SparseText => "11",
            PageSegMode::RawLine => "13",
        }
    }

    /// Parse a numeric Tesseract PSM code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "3" => Some(PageSegMode::Auto),
            "4" => Some(PageSegMode::SingleColumn),
            "6" => Some(PageSegMode::SingleBlock),
            "7" => Some(PageSegMode::SingleLine),
            "8" => Some(PageSegMode::SingleWord),
            "11" => Some(PageSegMode::SparseText),
            "13" => Some(PageSegMode::RawLine),
            _ => None,
        }
    }
}

/// Default attempt order: whole page, block, line, word, sparse text
pub fn default_page_seg_modes() -> Vec<PageSegMode> {
    vec![
        PageSegMode::Auto,
        PageSegMode::SingleBlock,
        PageSegMode::SingleLine,
        PageSegMode::SingleWord,
        PageSegMode::SparseText,
    ]
}

/// Tesseract model type for different accuracy/speed trade-offs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelType {
    /// Fast model (tessdata_fast) - faster processing, lower accuracy
    #[default]
    Fast,
    /// Best model (tessdata_best) - slower processing, higher accuracy
    Best,
}

impl ModelType {
    /// Get the tessdata directory name for this model type
    pub fn tessdata_dir(&self) -> &'static str {
        match self {
            ModelType::Fast => "tessdata_fast",
            ModelType::Best => "tessdata_best",
        }
    }

    /// Parse `fast` / `best`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "fast" => Some(ModelType::Fast),
            "best" => Some(ModelType::Best),
            _ => None,
        }
    }
}

/// Configuration structure for OCR processing
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language code (e.g. "hrv", "bos+hrv")
    pub language: String,
    /// Tesseract model type (Fast vs Best accuracy)
    pub model_type: ModelType,
    /// Page segmentation modes tried for every variant, in order
    pub page_seg_modes: Vec<PageSegMode>,
    /// Preprocessing variants generated for every image, in order
    pub variants: Vec<VariantKind>,
    /// Upscale target for the smaller image side
    pub min_dimension: u32,
    /// Downscale bound for the larger image side
    pub max_dimension: u32,
    /// Contrast enhancement factor for the contrast variant
    pub contrast_factor: f32,
    /// Resolution reported to Tesseract for in-memory images
    pub source_dpi: i32,
    /// Maximum decoded image payload in bytes
    pub max_image_bytes: usize,
    /// Attempt limits and circuit breaker settings
    pub recovery: RecoveryConfig,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            model_type: ModelType::default(),
            page_seg_modes: default_page_seg_modes(),
            variants: VariantKind::ALL.to_vec(),
            min_dimension: MIN_DIMENSION,
            max_dimension: MAX_DIMENSION,
            contrast_factor: DEFAULT_CONTRAST_FACTOR,
            source_dpi: SOURCE_DPI,
            max_image_bytes: MAX_IMAGE_BYTES,
            recovery: RecoveryConfig::default(),
        }
    }
}

impl OcrConfig {
    /// Load OCR settings from environment variables, falling back to defaults
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let page_seg_modes = match env::var("OCR_PAGE_SEG_MODES") {
            Ok(raw) => raw
                .split(',')
                .filter(|code| !code.trim().is_empty())
                .map(|code| {
                    PageSegMode::from_code(code).ok_or_else(|| {
                        AppError::Config(format!("Unsupported page segmentation mode: {}", code))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?,
            Err(_) => defaults.page_seg_modes,
        };

        let model_type = match env::var("OCR_MODEL_TYPE") {
            Ok(raw) => ModelType::parse(&raw).ok_or_else(|| {
                AppError::Config(format!("OCR_MODEL_TYPE must be 'fast' or 'best', got '{}'", raw))
            })?,
            Err(_) => defaults.model_type,
        };

        let recovery = RecoveryConfig {
            attempt_timeout_secs: env::var("OCR_ATTEMPT_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.recovery.attempt_timeout_secs.to_string())
                .parse()
                .map_err(|_| AppError::Config("Invalid OCR_ATTEMPT_TIMEOUT_SECS".to_string()))?,
            max_concurrent_attempts: env::var("OCR_MAX_CONCURRENT_ATTEMPTS")
                .unwrap_or_else(|_| defaults.recovery.max_concurrent_attempts.to_string())
                .parse()
                .map_err(|_| {
                    AppError::Config("Invalid OCR_MAX_CONCURRENT_ATTEMPTS".to_string())
                })?,
            circuit_breaker_threshold: env::var("SEMANTIC_BREAKER_THRESHOLD")
                .unwrap_or_else(|_| defaults.recovery.circuit_breaker_threshold.to_string())
                .parse()
                .map_err(|_| {
                    AppError::Config("Invalid SEMANTIC_BREAKER_THRESHOLD".to_string())
                })?,
            circuit_breaker_reset_secs: env::var("SEMANTIC_BREAKER_RESET_SECS")
                .unwrap_or_else(|_| defaults.recovery.circuit_breaker_reset_secs.to_string())
                .parse()
                .map_err(|_| {
                    AppError::Config("Invalid SEMANTIC_BREAKER_RESET_SECS".to_string())
                })?,
        };

        Ok(Self {
            language: env::var("OCR_LANGUAGE").unwrap_or(defaults.language),
            model_type,
            page_seg_modes,
            variants: defaults.variants,
            min_dimension: defaults.min_dimension,
            max_dimension: defaults.max_dimension,
            contrast_factor: defaults.contrast_factor,
            source_dpi: defaults.source_dpi,
            max_image_bytes: defaults.max_image_bytes,
            recovery,
        })
    }

    /// Number of recognition attempts one image produces
    pub fn attempt_count(&self) -> usize {
        self.variants.len() * self.page_seg_modes.len()
    }

    /// Validate OCR configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.language.trim().is_empty() {
            return Err(AppError::Config("language cannot be empty".to_string()));
        }
        if self.page_seg_modes.is_empty() {
            return Err(AppError::Config(
                "at least one page segmentation mode is required".to_string(),
            ));
        }
        if self.variants.is_empty() {
            return Err(AppError::Config(
                "at least one preprocessing variant is required".to_string(),
            ));
        }
        if self.min_dimension == 0 || self.max_dimension < self.min_dimension {
            return Err(AppError::Config(format!(
                "max_dimension ({}) must be >= min_dimension ({}) > 0",
                self.max_dimension, self.min_dimension
            )));
        }
        if !(self.contrast_factor.is_finite() && self.contrast_factor > 0.0) {
            return Err(AppError::Config(format!(
                "contrast_factor must be positive, got {}",
                self.contrast_factor
            )));
        }
        if self.max_image_bytes == 0 {
            return Err(AppError::Config(
                "max_image_bytes must be greater than 0".to_string(),
            ));
        }

        self.recovery.validate()?;

        Ok(())
    }
}
