//! # Recognition Pipeline
//!
//! Image in, best product-name candidate out:
//!
//! ```text
//! image ─► variants ─► attempts ─► clean ─► estimate ─► select ─► price
//! ```
//!
//! The pipeline never fails because recognition failed; a photo nobody can
//! read yields the empty candidate.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};

use crate::errors::{AppError, AppResult};
use crate::ocr::{AttemptResult, AttemptRunner};
use crate::ocr_config::OcrConfig;
use crate::preprocessing::generate_variants;
use crate::recognition::RecognitionEngine;
use crate::scoring::{select_best, Candidate};
use crate::text_processing::{clean_recognized_text, extract_price};

/// Everything one pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The winning candidate, or the empty candidate
    pub selection: Candidate,
    /// Every attempt, in variant-major order
    pub attempts: Vec<AttemptResult>,
}

/// Builds candidates from attempts and selects the winner.
///
/// The price comes from the winning attempt's raw text, or failing that from
/// the first attempt whose raw text contains one. An empty selection carries
/// no price.
pub fn select_from_attempts(attempts: &[AttemptResult]) -> Candidate {
    let candidates = attempts.iter().map(|attempt| {
        let mut candidate = Candidate::from_cleaned(clean_recognized_text(attempt.text()));
        candidate.price = extract_price(attempt.text());
        candidate
    });

    let mut selection = select_best(candidates);
    if selection.is_empty() {
        return Candidate::empty();
    }
    if selection.price.is_none() {
        selection.price = attempts
            .iter()
            .find_map(|attempt| extract_price(attempt.text()));
    }
    selection
}

/// Runs preprocessing and recognition for one image.
#[derive(Clone)]
pub struct RecognitionPipeline {
    runner: AttemptRunner,
    config: Arc<OcrConfig>,
}

impl RecognitionPipeline {
    pub fn new(engine: Arc<dyn RecognitionEngine>, config: OcrConfig) -> Self {
        Self {
            runner: AttemptRunner::new(engine, &config),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Recognizes the product name on `image`.
    ///
    /// # Errors
    ///
    /// [`AppError::Decode`] when the image has no pixels and
    /// [`AppError::Internal`] when the preprocessing worker dies. Recognition
    /// failures are not errors.
    pub async fn recognize(
        &self,
        image: DynamicImage,
        cancel: &CancellationToken,
    ) -> AppResult<PipelineOutcome> {
        let span = crate::observability::ocr_span("recognize_price_tag");
        async move {
            let started = Instant::now();
            let config = Arc::clone(&self.config);

            let variants = tokio::task::spawn_blocking(move || generate_variants(&image, &config))
                .await
                .map_err(|e| AppError::Internal(format!("preprocessing worker failed: {}", e)))?
                .map_err(|e| AppError::Decode(e.to_string()))?;

            let attempts = self.runner.run(variants, cancel).await;
            let selection = select_from_attempts(&attempts);

            let successes = attempts.iter().filter(|a| a.succeeded()).count();
            crate::observability::record_pipeline_metrics(
                attempts.len(),
                successes,
                started.elapsed(),
            );
            info!(
                engine = self.runner.engine_name(),
                attempts = attempts.len(),
                successful_attempts = successes,
                selected_words = selection.word_count(),
                confidence = selection.confidence,
                has_price = selection.price.is_some(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Recognition pipeline finished"
            );

            Ok(PipelineOutcome {
                selection,
                attempts,
            })
        }
        .instrument(span)
        .await
    }
}
