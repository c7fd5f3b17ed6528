//! # OCR Error Types Module
//!
//! Error types for recognition attempts. None of these reach the client:
//! a failed attempt degrades to an empty result.

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// OCR engine initialization errors
    Initialization(String),
    /// Variant could not be handed to the engine
    ImageLoad(String),
    /// Text extraction errors
    Extraction(String),
    /// Blocking worker panicked or was aborted
    Worker(String),
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Initialization(msg) => {
                write!(f, "[OCR_INIT] OCR engine initialization failed: {}", msg)
            }
            OcrError::ImageLoad(msg) => {
                write!(f, "[IMAGE_LOAD] Failed to load image for OCR processing: {}", msg)
            }
            OcrError::Extraction(msg) => {
                write!(f, "[OCR_EXTRACT] Text extraction from image failed: {}", msg)
            }
            OcrError::Worker(msg) => write!(f, "[OCR_WORKER] OCR worker failed: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}
