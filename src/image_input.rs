//! # Image Input
//!
//! Decodes the base64 image payload of a verification request. Payloads may
//! arrive bare or as a `data:image/...;base64,` URL.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};

use crate::errors::{AppError, AppResult};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = b"\xff\xd8\xff";

/// A decoded request image. Lives only for the duration of one request.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

/// Removes a `data:<mime>;base64,` prefix and any embedded whitespace.
pub fn strip_data_url(payload: &str) -> String {
    let trimmed = payload.trim();
    let body = match (trimmed.starts_with("data:"), trimmed.find(',')) {
        (true, Some(comma)) => &trimmed[comma + 1..],
        _ => trimmed,
    };
    body.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Decodes base64 into raw bytes, enforcing `max_bytes`.
pub fn decode_base64_payload(payload: &str, max_bytes: usize) -> AppResult<Vec<u8>> {
    let body = strip_data_url(payload);
    if body.is_empty() {
        return Err(AppError::Decode("image payload is empty".to_string()));
    }

    // 4 base64 chars carry 3 bytes; reject before allocating the decoded buffer
    if body.len() / 4 * 3 > max_bytes + 3 {
        return Err(AppError::Decode(format!(
            "image exceeds {} bytes",
            max_bytes
        )));
    }

    let bytes = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| AppError::Decode(format!("invalid base64: {}", e)))?;

    if bytes.len() > max_bytes {
        return Err(AppError::Decode(format!(
            "image is {} bytes, limit is {}",
            bytes.len(),
            max_bytes
        )));
    }

    Ok(bytes)
}

/// Decodes a base64 payload into pixels.
///
/// # Errors
///
/// [`AppError::Decode`] for invalid base64, oversized payloads, or bytes that
/// are not a supported image.
pub fn decode_image(payload: &str, max_bytes: usize) -> AppResult<DecodedImage> {
    let bytes = decode_base64_payload(payload, max_bytes)?;
    let format = image::guess_format(&bytes).ok();
    let image = image::load_from_memory(&bytes)
        .map_err(|e| AppError::Decode(format!("unsupported image data: {}", e)))?;

    tracing::debug!(
        bytes = bytes.len(),
        format = ?format,
        width = image.width(),
        height = image.height(),
        "Decoded request image"
    );

    Ok(DecodedImage {
        bytes,
        image,
        format,
    })
}

/// MIME type from magic bytes; JPEG when unrecognized.
pub fn detect_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        b if b.starts_with(PNG_SIGNATURE) => "image/png",
        b if b.starts_with(JPEG_SIGNATURE) => "image/jpeg",
        _ => "image/jpeg",
    }
}

/// Builds the data URL sent to a vision-capable semantic engine.
///
/// Payloads that already are image data URLs pass through unchanged.
pub fn to_data_url(payload: &str, bytes: &[u8]) -> String {
    let trimmed = payload.trim();
    if trimmed.starts_with("data:image/") {
        return trimmed.to_string();
    }
    format!(
        "data:{};base64,{}",
        detect_mime(bytes),
        strip_data_url(trimmed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::io::Cursor;

    fn png_base64() -> String {
        let image = GrayImage::from_pixel(8, 8, Luma([200]));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        STANDARD.encode(buffer.into_inner())
    }

    #[test]
    fn test_decode_png() {
        let decoded = decode_image(&png_base64(), 1024 * 1024).unwrap();
        assert_eq!(decoded.format, Some(ImageFormat::Png));
        assert_eq!(decoded.image.width(), 8);
    }

    #[test]
    fn test_decode_data_url() {
        let payload = format!("data:image/png;base64,{}", png_base64());
        assert!(decode_image(&payload, 1024 * 1024).is_ok());
    }

    #[test]
    fn test_invalid_base64_is_decode_error() {
        let err = decode_image("@@@ not base64 @@@", 1024).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_non_image_bytes_is_decode_error() {
        let payload = STANDARD.encode(b"just some text, definitely not an image");
        let err = decode_image(&payload, 1024).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_size_limit() {
        let err = decode_image(&png_base64(), 10).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_detect_mime() {
        assert_eq!(detect_mime(b"\x89PNG\r\n\x1a\nrest"), "image/png");
        assert_eq!(detect_mime(b"\xff\xd8\xff\xe0"), "image/jpeg");
        assert_eq!(detect_mime(b"GIF89a"), "image/jpeg");
    }

    #[test]
    fn test_to_data_url() {
        assert_eq!(
            to_data_url("data:image/webp;base64,AAAA", b""),
            "data:image/webp;base64,AAAA"
        );
        assert_eq!(
            to_data_url(" iVBOR ", b"\x89PNG\r\n\x1a\n"),
            "data:image/png;base64,iVBOR"
        );
    }
}
