//! # Preprocessing Variant Generator
//!
//! Turns one decoded photo into an ordered set of sibling images. No single
//! transform reads every price tag well, so each variant is recognized
//! separately and the best result wins downstream.

use image::{imageops, DynamicImage, GrayImage, Luma};

use super::scaling::rescale_for_ocr;
use super::thresholding::{apply_otsu_threshold, invert};
use super::types::{PreprocessedVariant, PreprocessingError, VariantKind};
use crate::ocr_config::OcrConfig;

/// 3×3 sharpening kernel; weights sum to 1 so overall brightness is kept.
const SHARPEN_KERNEL: [f32; 9] = [
    -0.125, -0.125, -0.125, //
    -0.125, 2.0, -0.125, //
    -0.125, -0.125, -0.125,
];

/// Stretches intensities away from the image mean by `factor`.
///
/// `out = mean + factor · (p − mean)`, clamped to `0..=255`.
pub fn enhance_contrast(gray: &GrayImage, factor: f32) -> GrayImage {
    let pixel_count = u64::from(gray.width()) * u64::from(gray.height());
    if pixel_count == 0 {
        return gray.clone();
    }

    let sum: u64 = gray.pixels().map(|p| u64::from(p[0])).sum();
    let mean = (sum as f64 / pixel_count as f64).round() as f32;

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0] as f32;
        let stretched = mean + factor * (value - mean);
        Luma([stretched.round().clamp(0.0, 255.0) as u8])
    })
}

/// Applies the sharpening kernel.
pub fn sharpen(gray: &GrayImage) -> GrayImage {
    imageops::filter3x3(gray, &SHARPEN_KERNEL)
}

/// Generates every configured variant for `image`, in configuration order.
///
/// The grayscale base is rescaled first (see [`rescale_for_ocr`]); the binary
/// and inverted variants share one Otsu threshold computed on that base.
///
/// # Errors
///
/// Returns [`PreprocessingError::EmptyImage`] for images with a zero dimension.
pub fn generate_variants(
    image: &DynamicImage,
    config: &OcrConfig,
) -> Result<Vec<PreprocessedVariant>, PreprocessingError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(PreprocessingError::EmptyImage { width, height });
    }

    let scaled = rescale_for_ocr(&image.to_luma8(), config.min_dimension, config.max_dimension);
    let base = scaled.image;

    let mut contrast: Option<GrayImage> = None;
    let mut binary: Option<GrayImage> = None;
    let mut variants = Vec::with_capacity(config.variants.len());

    for &kind in &config.variants {
        let derived = match kind {
            VariantKind::Grayscale => base.clone(),
            VariantKind::Contrast => contrast
                .get_or_insert_with(|| enhance_contrast(&base, config.contrast_factor))
                .clone(),
            VariantKind::Sharpened => {
                let enhanced = contrast
                    .get_or_insert_with(|| enhance_contrast(&base, config.contrast_factor));
                sharpen(enhanced)
            }
            VariantKind::Binary => binary
                .get_or_insert_with(|| apply_otsu_threshold(&base).image)
                .clone(),
            VariantKind::Inverted => {
                let binarized = binary.get_or_insert_with(|| apply_otsu_threshold(&base).image);
                invert(binarized)
            }
        };
        variants.push(PreprocessedVariant {
            kind,
            image: derived,
        });
    }

    tracing::debug!(
        target: "ocr_preprocessing",
        variant_count = variants.len(),
        width = base.width(),
        height = base.height(),
        "Generated preprocessing variants"
    );

    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn sample_image() -> DynamicImage {
        let rgb = RgbImage::from_fn(100, 40, |x, _| {
            if (x / 10) % 2 == 0 {
                image::Rgb([30, 30, 30])
            } else {
                image::Rgb([220, 220, 220])
            }
        });
        DynamicImage::ImageRgb8(rgb)
    }

    #[test]
    fn test_variant_order_is_fixed() {
        let variants = generate_variants(&sample_image(), &OcrConfig::default()).unwrap();
        let kinds: Vec<_> = variants.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, VariantKind::ALL.to_vec());
    }

    #[test]
    fn test_variants_are_upscaled_to_min_dimension() {
        let variants = generate_variants(&sample_image(), &OcrConfig::default()).unwrap();
        for variant in &variants {
            assert_eq!(variant.image.height(), 800);
            assert_eq!(variant.image.width(), 2000);
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = OcrConfig::default();
        let first = generate_variants(&sample_image(), &config).unwrap();
        let second = generate_variants(&sample_image(), &config).unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.image.as_raw(), b.image.as_raw());
        }
    }

    #[test]
    fn test_inverted_is_complement_of_binary() {
        let variants = generate_variants(&sample_image(), &OcrConfig::default()).unwrap();
        let binary = &variants[3].image;
        let inverted = &variants[4].image;
        for (b, i) in binary.pixels().zip(inverted.pixels()) {
            assert_eq!(b[0], 255 - i[0]);
        }
    }

    #[test]
    fn test_contrast_stretches_around_mean() {
        let gray = GrayImage::from_fn(2, 1, |x, _| if x == 0 { Luma([100]) } else { Luma([200]) });
        let enhanced = enhance_contrast(&gray, 1.5);
        assert_eq!(enhanced.get_pixel(0, 0)[0], 75);
        assert_eq!(enhanced.get_pixel(1, 0)[0], 225);
    }

    #[test]
    fn test_sharpen_keeps_flat_regions() {
        let gray = GrayImage::from_pixel(5, 5, Luma([90]));
        let sharpened = sharpen(&gray);
        for y in 1..4 {
            for x in 1..4 {
                assert!((sharpened.get_pixel(x, y)[0] as i32 - 90).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_empty_image_rejected() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 10));
        assert_eq!(
            generate_variants(&empty, &OcrConfig::default()).unwrap_err(),
            PreprocessingError::EmptyImage { width: 0, height: 10 }
        );
    }
}
