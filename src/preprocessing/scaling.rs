//! # Image Scaling Module
//!
//! Brings handheld photos into the size range Tesseract reads best: small
//! crops are upscaled, oversized camera frames are reduced.

use image::imageops::{self, FilterType};
use image::GrayImage;

use super::types::ScaledImageResult;

/// Computes the uniform scale factor for an image of `width` × `height`.
///
/// The smaller side is raised to `min_dimension` when it falls short; the larger
/// side is then capped at `max_dimension`, which takes precedence.
pub fn scale_factor_for(width: u32, height: u32, min_dimension: u32, max_dimension: u32) -> f32 {
    let smaller = width.min(height).max(1) as f32;
    let larger = width.max(height).max(1) as f32;

    let mut factor = if smaller < min_dimension as f32 {
        min_dimension as f32 / smaller
    } else {
        1.0
    };

    if larger * factor > max_dimension as f32 {
        factor = max_dimension as f32 / larger;
    }

    factor
}

/// Rescales a grayscale image with Lanczos3 resampling.
///
/// Returns a copy when no scaling is needed so the caller's buffer is never shared.
pub fn rescale_for_ocr(
    gray: &GrayImage,
    min_dimension: u32,
    max_dimension: u32,
) -> ScaledImageResult {
    let start_time = std::time::Instant::now();
    let (width, height) = gray.dimensions();
    let factor = scale_factor_for(width, height, min_dimension, max_dimension);

    let image = if (factor - 1.0).abs() < f32::EPSILON {
        gray.clone()
    } else {
        let new_width = ((width as f32 * factor).round() as u32).max(1);
        let new_height = ((height as f32 * factor).round() as u32).max(1);
        imageops::resize(gray, new_width, new_height, FilterType::Lanczos3)
    };

    let processing_time = start_time.elapsed();
    tracing::debug!(
        target: "ocr_preprocessing",
        "Rescaled {}x{} -> {}x{} (factor {:.2}) in {}ms",
        width,
        height,
        image.width(),
        image.height(),
        factor,
        processing_time.as_millis()
    );

    ScaledImageResult {
        original_dimensions: (width, height),
        new_dimensions: image.dimensions(),
        image,
        scale_factor: factor,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}
