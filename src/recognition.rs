//! # Recognition Engine Boundary
//!
//! The recognizer is an external collaborator: it takes a grayscale image, a
//! language code and a page segmentation mode, and returns either plain text
//! or per-word text with confidences. [`TesseractEngine`] is the production
//! implementation; tests substitute in-memory engines.

use std::io::Cursor;
use std::sync::Arc;

use image::{GrayImage, ImageFormat};

use crate::instance_manager::{InstanceKey, OcrInstanceManager};
use crate::ocr_config::{ModelType, PageSegMode};
use crate::ocr_errors::OcrError;

/// One recognized word with the engine's confidence (0-100 scale).
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedWord {
    pub text: String,
    pub confidence: f32,
}

/// Raw output of one recognition call.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutput {
    Text(String),
    Words(Vec<RecognizedWord>),
}

impl RecognitionOutput {
    /// Flattens the output to text; words without positive confidence are dropped.
    pub fn into_text(self) -> String {
        match self {
            RecognitionOutput::Text(text) => text,
            RecognitionOutput::Words(words) => words
                .into_iter()
                .filter(|word| word.confidence > 0.0)
                .map(|word| word.text)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// A synchronous recognizer. Calls may block for seconds; callers run them on
/// the blocking thread pool.
pub trait RecognitionEngine: Send + Sync {
    /// Human-readable engine name for logs
    fn name(&self) -> &str;

    /// Recognizes text in `image`.
    fn recognize(
        &self,
        image: &GrayImage,
        language: &str,
        mode: PageSegMode,
    ) -> Result<RecognitionOutput, OcrError>;
}

/// Tesseract through leptess, with instances cached per configuration.
pub struct TesseractEngine {
    instances: Arc<OcrInstanceManager>,
    model_type: ModelType,
    source_dpi: i32,
}

impl TesseractEngine {
    pub fn new(instances: Arc<OcrInstanceManager>, model_type: ModelType, source_dpi: i32) -> Self {
        Self {
            instances,
            model_type,
            source_dpi,
        }
    }

    /// Eagerly initializes the instance for `language`, surfacing missing
    /// language data at startup instead of on the first request.
    pub fn warm_up(&self, language: &str, modes: &[PageSegMode]) -> Result<(), OcrError> {
        for &mode in modes {
            self.instances
                .get_instance(&InstanceKey::new(language, self.model_type, mode))?;
        }
        Ok(())
    }
}

/// Encodes a variant as PNG for hand-off to Leptonica.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, OcrError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| OcrError::ImageLoad(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(
        &self,
        image: &GrayImage,
        language: &str,
        mode: PageSegMode,
    ) -> Result<RecognitionOutput, OcrError> {
        let png = encode_png(image)?;
        let instance = self
            .instances
            .get_instance(&InstanceKey::new(language, self.model_type, mode))?;
        let mut tess = instance.lock();

        tess.set_image_from_mem(&png)
            .map_err(|e| OcrError::ImageLoad(format!("Leptonica rejected image: {:?}", e)))?;
        tess.set_source_resolution(self.source_dpi);

        let text = tess
            .get_utf8_text()
            .map_err(|e| OcrError::Extraction(format!("Invalid UTF-8 from Tesseract: {}", e)))?;

        tracing::trace!(
            psm = mode.as_str(),
            mean_confidence = tess.mean_text_conf(),
            chars = text.len(),
            "Tesseract pass finished"
        );

        Ok(RecognitionOutput::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_with_zero_confidence_dropped() {
        let output = RecognitionOutput::Words(vec![
            RecognizedWord {
                text: "Dukat".to_string(),
                confidence: 91.0,
            },
            RecognizedWord {
                text: "~~".to_string(),
                confidence: 0.0,
            },
            RecognizedWord {
                text: "mlijeko".to_string(),
                confidence: 77.5,
            },
        ]);
        assert_eq!(output.into_text(), "Dukat mlijeko");
    }

    #[test]
    fn test_text_output_passes_through() {
        let output = RecognitionOutput::Text("12,99 KM\nhljeb".to_string());
        assert_eq!(output.into_text(), "12,99 KM\nhljeb");
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&GrayImage::new(4, 4)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
