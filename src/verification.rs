//! # Verification Orchestrator
//!
//! Decides whether the uploaded photo shows the requested shopping-list item.
//!
//! ## OCR mode
//!
//! ```text
//! validate ─► decode ─► pipeline ─┬─ no text ──► "image unclear", confidence 0.0
//!                                 └─ text ─► semantic engine ─┬─ verdict
//!                                                             └─ error/open breaker ─► fuzzy fallback
//! ```
//!
//! ## Vision mode
//!
//! The image goes straight to the semantic engine. When that fails the OCR
//! pipeline runs and the fuzzy fallback decides.
//!
//! In both modes the final answer is a match only when the verdict says so
//! *and* its confidence reaches the configured threshold. Semantic engine
//! failures are never reported to the client.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{VerificationConfig, VerificationMode};
use crate::errors::{error_logging, AppError, AppResult};
use crate::fuzzy_match::{fuzzy_match, MatchVerdict};
use crate::image_input::{decode_image, to_data_url, DecodedImage};
use crate::localization::LocalizationManager;
use crate::models::{VerifyItemRequest, VerifyItemResponse};
use crate::observability;
use crate::ocr_config::RecoveryConfig;
use crate::pipeline::RecognitionPipeline;
use crate::semantic::{SemanticEngine, SemanticError};
use crate::validation::validate_request;

/// Who produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Semantic,
    Fallback,
}

impl VerdictSource {
    pub fn label(&self) -> &'static str {
        match self {
            VerdictSource::Semantic => "semantic",
            VerdictSource::Fallback => "fallback",
        }
    }
}

/// What the verdict was compared against; selects the message wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subject {
    PriceTag,
    Image,
}

/// Turns a verdict into the final answer and its message.
pub fn apply_threshold(verdict: &MatchVerdict, threshold: f64) -> bool {
    verdict.is_match && verdict.confidence >= threshold
}

/// Verification service shared by all request handlers.
pub struct VerificationService {
    pipeline: RecognitionPipeline,
    semantic: Option<Arc<dyn SemanticEngine>>,
    breaker: CircuitBreaker,
    localization: Arc<LocalizationManager>,
    config: VerificationConfig,
}

impl VerificationService {
    pub fn new(
        pipeline: RecognitionPipeline,
        semantic: Option<Arc<dyn SemanticEngine>>,
        localization: Arc<LocalizationManager>,
        config: VerificationConfig,
        recovery: &RecoveryConfig,
    ) -> Self {
        Self {
            pipeline,
            semantic,
            breaker: CircuitBreaker::new(recovery),
            localization,
            config,
        }
    }

    /// Whether a semantic engine is configured
    pub fn semantic_available(&self) -> bool {
        self.semantic.is_some()
    }

    /// Model name of the semantic engine, if any
    pub fn model_name(&self) -> Option<&str> {
        self.semantic.as_ref().map(|engine| engine.model_name())
    }

    pub fn mode(&self) -> VerificationMode {
        self.config.mode
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Verifies one request.
    ///
    /// Recognition attempts still waiting to start are skipped if the returned
    /// future is dropped (for example when the client disconnects).
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] for malformed requests, [`AppError::Decode`]
    /// for undecodable images, [`AppError::Internal`] for worker failures.
    pub async fn verify(&self, request: &VerifyItemRequest) -> AppResult<VerifyItemResponse> {
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();
        self.verify_with_cancellation(request, &cancel).await
    }

    /// [`verify`](Self::verify) with a caller-owned cancellation token.
    pub async fn verify_with_cancellation(
        &self,
        request: &VerifyItemRequest,
        cancel: &CancellationToken,
    ) -> AppResult<VerifyItemResponse> {
        validate_request(request)?;
        let item = request.item_name.trim();
        let span = observability::verification_span(self.config.mode.as_str(), item.chars().count());

        async move {
            let started = Instant::now();

            let payload = request.image_base64.clone();
            let max_bytes = self.pipeline.config().max_image_bytes;
            let decoded = tokio::task::spawn_blocking(move || decode_image(&payload, max_bytes))
                .await
                .map_err(|e| AppError::Internal(format!("decode worker failed: {}", e)))??;

            let (response, outcome, source) = match self.config.mode {
                VerificationMode::Ocr => self.verify_by_text(item, decoded, cancel).await?,
                VerificationMode::Vision => {
                    self.verify_by_image(item, &request.image_base64, decoded, cancel)
                        .await?
                }
            };

            observability::record_verification_metrics(outcome, source.label(), started.elapsed());
            info!(
                outcome = outcome,
                source = source.label(),
                is_match = response.is_match,
                confidence = response.confidence,
                has_price = response.extracted_price.is_some(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Verification finished"
            );
            Ok(response)
        }
        .instrument(span)
        .await
    }

    async fn verify_by_text(
        &self,
        item: &str,
        decoded: DecodedImage,
        cancel: &CancellationToken,
    ) -> AppResult<(VerifyItemResponse, &'static str, VerdictSource)> {
        let outcome = self.pipeline.recognize(decoded.image, cancel).await?;
        let selection = outcome.selection;
        if selection.is_empty() {
            return Ok((self.unclear_response(), "unclear", VerdictSource::Fallback));
        }

        let (verdict, source) = self.judge_text(item, &selection.text).await;
        let (response, outcome) = self.build_response(
            item,
            &verdict,
            selection.text,
            selection.price,
            Subject::PriceTag,
        );
        Ok((response, outcome, source))
    }

    async fn verify_by_image(
        &self,
        item: &str,
        payload: &str,
        decoded: DecodedImage,
        cancel: &CancellationToken,
    ) -> AppResult<(VerifyItemResponse, &'static str, VerdictSource)> {
        let data_url = to_data_url(payload, &decoded.bytes);
        let judged = self
            .call_semantic("judge_image", |engine| {
                let data_url = data_url.clone();
                async move { engine.judge_image(item, &data_url).await }
            })
            .await;

        if let Some(verdict) = judged {
            let (response, outcome) =
                self.build_response(item, &verdict, String::new(), None, Subject::Image);
            return Ok((response, outcome, VerdictSource::Semantic));
        }

        let outcome = self.pipeline.recognize(decoded.image, cancel).await?;
        let selection = outcome.selection;
        if selection.is_empty() {
            return Ok((self.unclear_response(), "unclear", VerdictSource::Fallback));
        }

        let verdict = fuzzy_match(item, &selection.text);
        let (response, outcome) = self.build_response(
            item,
            &verdict,
            selection.text,
            selection.price,
            Subject::PriceTag,
        );
        Ok((response, outcome, VerdictSource::Fallback))
    }

    /// Semantic text judgment with fuzzy fallback.
    pub async fn judge_text(&self, item: &str, text: &str) -> (MatchVerdict, VerdictSource) {
        let judged = self
            .call_semantic("judge_text", |engine| async move {
                engine.judge_text(item, text).await
            })
            .await;

        match judged {
            Some(verdict) => (verdict, VerdictSource::Semantic),
            None => (fuzzy_match(item, text), VerdictSource::Fallback),
        }
    }

    /// Runs a semantic call through the circuit breaker. `None` means the
    /// caller should fall back.
    async fn call_semantic<'a, F, Fut>(&'a self, operation: &'static str, call: F) -> Option<MatchVerdict>
    where
        F: FnOnce(&'a dyn SemanticEngine) -> Fut,
        Fut: std::future::Future<Output = Result<MatchVerdict, SemanticError>> + 'a,
    {
        let Some(engine) = self.semantic.as_deref() else {
            observability::record_fallback("not_configured");
            return None;
        };

        if !self.breaker.try_acquire() {
            error_logging::log_semantic_error(
                &SemanticError::Transport("circuit breaker open".to_string()),
                operation,
                engine.model_name(),
                true,
            );
            observability::record_fallback("circuit_open");
            return None;
        }

        let started = Instant::now();
        let result = call(engine)
            .instrument(observability::semantic_span(operation, engine.model_name()))
            .await;
        observability::record_semantic_metrics(result.is_ok(), started.elapsed());

        match result {
            Ok(verdict) => {
                self.breaker.record_success();
                Some(verdict)
            }
            Err(error) => {
                self.breaker.record_failure();
                error_logging::log_semantic_error(
                    &error,
                    operation,
                    engine.model_name(),
                    self.breaker.is_open(),
                );
                observability::record_fallback("semantic_error");
                None
            }
        }
    }

    fn message(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.localization
            .get_message_with_args_in_language(key, &self.config.message_language, args)
    }

    fn unclear_response(&self) -> VerifyItemResponse {
        VerifyItemResponse {
            is_match: false,
            confidence: 0.0,
            ocr_text: String::new(),
            extracted_price: None,
            message: self.message("verify-image-unclear", &[]),
        }
    }

    fn build_response(
        &self,
        item: &str,
        verdict: &MatchVerdict,
        ocr_text: String,
        extracted_price: Option<String>,
        subject: Subject,
    ) -> (VerifyItemResponse, &'static str) {
        let is_match = apply_threshold(verdict, self.config.confidence_threshold);
        let suffix = match subject {
            Subject::PriceTag => "",
            Subject::Image => "-image",
        };

        let (outcome, message) = if is_match {
            (
                "match",
                self.message(&format!("verify-confirmed{}", suffix), &[("item", item)]),
            )
        } else if verdict.is_match {
            let percent = format!("{:.0}%", verdict.confidence * 100.0);
            (
                "uncertain",
                self.message(
                    &format!("verify-uncertain{}", suffix),
                    &[("item", item), ("confidence", percent.as_str())],
                ),
            )
        } else {
            (
                "no_match",
                self.message(
                    &format!("verify-rejected{}", suffix),
                    &[("item", item), ("reasoning", verdict.reasoning.as_str())],
                ),
            )
        };

        (
            VerifyItemResponse {
                is_match,
                confidence: verdict.confidence,
                ocr_text,
                extracted_price,
                message,
            },
            outcome,
        )
    }
}
