//! # Image Thresholding Module
//!
//! Binary thresholding for OCR preprocessing, using Otsu's method for
//! automatic threshold selection.

use image::{GrayImage, Luma};

use super::types::ThresholdedImageResult;

/// Builds the 256-bin intensity histogram of a grayscale image.
pub fn intensity_histogram(gray: &GrayImage) -> [u32; 256] {
    let mut histogram = [0u32; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }
    histogram
}

/// Finds the optimal threshold using Otsu's method by maximizing between-class variance.
///
/// The background class holds intensities `<= t` and the foreground class
/// intensities `> t`. A single forward pass accumulates the background weight
/// and weighted intensity sum; the foreground is the complement of the totals.
///
/// ```text
/// σ²(t) = w_bg · w_fg · (μ_bg − μ_fg)²
/// ```
///
/// Thresholds where either class is empty are skipped, so a histogram with all
/// of its mass in one bin (or no mass at all) never divides by zero and yields `0`.
/// When several thresholds reach the same variance the lowest one wins.
///
/// # Arguments
///
/// * `histogram` - The 256-bin histogram of pixel intensities
/// * `total_pixels` - Total number of pixels counted in the histogram
///
/// # Examples
///
/// ```
/// use price_tag_verifier::preprocessing::otsu_threshold;
///
/// let mut histogram = [0u32; 256];
/// histogram[20] = 50;
/// histogram[220] = 50;
/// assert_eq!(otsu_threshold(&histogram, 100), 20);
/// ```
pub fn otsu_threshold(histogram: &[u32; 256], total_pixels: u64) -> u8 {
    if total_pixels == 0 {
        return 0;
    }

    let total = total_pixels as f64;
    let total_weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(intensity, &count)| intensity as f64 * count as f64)
        .sum();

    let mut background_weight = 0f64;
    let mut background_sum = 0f64;
    let mut max_variance = 0f64;
    let mut optimal_threshold = 0u8;

    for (threshold, &count) in histogram.iter().enumerate() {
        background_weight += count as f64;
        background_sum += threshold as f64 * count as f64;

        if background_weight == 0.0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight <= 0.0 {
            break;
        }

        let background_mean = background_sum / background_weight;
        let foreground_mean = (total_weighted_sum - background_sum) / foreground_weight;
        let mean_difference = background_mean - foreground_mean;

        let variance = (background_weight / total)
            * (foreground_weight / total)
            * mean_difference
            * mean_difference;

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

/// Binarizes a grayscale image: pixels above `threshold` become white, the rest black.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Swaps dark and light intensities.
pub fn invert(gray: &GrayImage) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([255u8 - gray.get_pixel(x, y)[0]])
    })
}

/// Applies Otsu's thresholding algorithm to convert an image to binary (black/white).
///
/// # Arguments
///
/// * `gray` - The grayscale input; it is left untouched
///
/// # Returns
///
/// A fresh binary image together with the threshold that produced it
pub fn apply_otsu_threshold(gray: &GrayImage) -> ThresholdedImageResult {
    let start_time = std::time::Instant::now();

    let histogram = intensity_histogram(gray);
    let total_pixels = u64::from(gray.width()) * u64::from(gray.height());
    let optimal_threshold = otsu_threshold(&histogram, total_pixels);
    let binary_img = binarize(gray, optimal_threshold);

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Otsu thresholding completed in {:.2}ms: threshold={}, dimensions={}x{}",
        processing_time.as_millis(),
        optimal_threshold,
        gray.width(),
        gray.height()
    );

    ThresholdedImageResult {
        image: binary_img,
        threshold: optimal_threshold,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}
