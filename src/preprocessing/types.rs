//! # Shared Types for Image Preprocessing
//!
//! This module contains the shared types, structs, and enums used across
//! the preprocessing sub-modules.

use std::fmt;

use image::GrayImage;

/// Errors that can occur during image preprocessing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessingError {
    /// Image has no pixels to work with
    EmptyImage { width: u32, height: u32 },
}

impl fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessingError::EmptyImage { width, height } => {
                write!(f, "Image has no pixels: {}x{}", width, height)
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

/// Transform applied to produce a preprocessing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// Luma conversion of the rescaled input
    Grayscale,
    /// Contrast stretched around the mean intensity
    Contrast,
    /// Contrast-enhanced image passed through a sharpening kernel
    Sharpened,
    /// Otsu binarization of the grayscale base
    Binary,
    /// Binary variant with black and white swapped
    Inverted,
}

impl VariantKind {
    /// Default generation order
    pub const ALL: [VariantKind; 5] = [
        VariantKind::Grayscale,
        VariantKind::Contrast,
        VariantKind::Sharpened,
        VariantKind::Binary,
        VariantKind::Inverted,
    ];

    /// Stable label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            VariantKind::Grayscale => "grayscale",
            VariantKind::Contrast => "contrast",
            VariantKind::Sharpened => "sharpen",
            VariantKind::Binary => "binary",
            VariantKind::Inverted => "inverted",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A derived image plus the transform that produced it.
///
/// Every variant owns its own pixel buffer; generating one never touches the
/// source image or a sibling variant.
#[derive(Debug, Clone)]
pub struct PreprocessedVariant {
    pub kind: VariantKind,
    pub image: GrayImage,
}

/// Result of an OCR-oriented rescaling operation.
#[derive(Debug, Clone)]
pub struct ScaledImageResult {
    /// The rescaled grayscale image
    pub image: GrayImage,
    /// Original image dimensions (width, height)
    pub original_dimensions: (u32, u32),
    /// New image dimensions (width, height)
    pub new_dimensions: (u32, u32),
    /// Scale factor applied
    pub scale_factor: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of image thresholding operation.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// The thresholded binary image
    pub image: GrayImage,
    /// Optimal threshold value found by Otsu's method
    pub threshold: u8,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
