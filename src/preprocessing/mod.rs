//! # Image Preprocessing Module
//!
//! This module prepares price-tag photos for recognition.
//!
//! The module is organized into focused sub-modules:
//! - `scaling`: Rescaling into the size range the recognizer handles best
//! - `thresholding`: Binary thresholding using Otsu's method
//! - `variants`: The ordered set of sibling images fed to the recognizer
//! - `types`: Shared types and error definitions

pub mod scaling;
pub mod thresholding;
pub mod types;
pub mod variants;

// Re-export commonly used types and functions for convenience
pub use types::{
    PreprocessedVariant, PreprocessingError, ScaledImageResult, ThresholdedImageResult,
    VariantKind,
};

pub use scaling::rescale_for_ocr;
pub use thresholding::{apply_otsu_threshold, binarize, intensity_histogram, invert, otsu_threshold};
pub use variants::{enhance_contrast, generate_variants, sharpen};
