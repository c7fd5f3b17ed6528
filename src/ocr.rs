//! # Recognition Attempt Runner
//!
//! Runs every preprocessing variant through every configured page
//! segmentation mode. Attempts are independent: a failure, panic or timeout
//! in one of them is recorded and the rest carry on.
//!
//! ## Execution Model
//!
//! ```text
//! variants × modes ──► JoinSet ──► Semaphore (max_concurrent_attempts)
//!                                     │
//!                                     ▼
//!                         spawn_blocking(engine.recognize)
//!                                     │  tokio::time::timeout
//!                                     ▼
//!                            AttemptResult (slot order)
//! ```
//!
//! Results come back in iteration order (variant-major, then mode) no matter
//! which attempt finishes first. Attempts that have not started when the
//! cancellation token fires are recorded as [`AttemptOutcome::Cancelled`].
//! A timed-out attempt cannot be interrupted inside Tesseract; its blocking
//! thread runs to completion and the result is discarded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ocr_config::{OcrConfig, PageSegMode};
use crate::ocr_errors::OcrError;
use crate::preprocessing::{PreprocessedVariant, VariantKind};
use crate::recognition::RecognitionEngine;

/// How a single recognition attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Engine returned text (possibly empty)
    Recognized(String),
    /// Engine or worker reported an error
    Failed(String),
    /// Attempt exceeded its time budget
    TimedOut,
    /// Request was cancelled before the attempt started
    Cancelled,
}

impl AttemptOutcome {
    /// Metric/log label
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Recognized(_) => "recognized",
            AttemptOutcome::Failed(_) => "failed",
            AttemptOutcome::TimedOut => "timed_out",
            AttemptOutcome::Cancelled => "cancelled",
        }
    }
}

/// One (variant, mode) pair and what came of it
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptResult {
    pub variant: VariantKind,
    pub mode: PageSegMode,
    pub outcome: AttemptOutcome,
    pub duration: Duration,
}

impl AttemptResult {
    /// Raw recognized text; empty for anything but a successful attempt.
    pub fn text(&self) -> &str {
        match &self.outcome {
            AttemptOutcome::Recognized(text) => text,
            _ => "",
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Recognized(_))
    }
}

/// Runs the variant × mode grid against a recognition engine.
#[derive(Clone)]
pub struct AttemptRunner {
    engine: Arc<dyn RecognitionEngine>,
    language: String,
    modes: Vec<PageSegMode>,
    attempt_timeout: Duration,
    max_concurrent: usize,
}

impl AttemptRunner {
    pub fn new(engine: Arc<dyn RecognitionEngine>, config: &OcrConfig) -> Self {
        Self {
            engine,
            language: config.language.clone(),
            modes: config.page_seg_modes.clone(),
            attempt_timeout: Duration::from_secs(config.recovery.attempt_timeout_secs),
            max_concurrent: config.recovery.max_concurrent_attempts.max(1),
        }
    }

    /// Overrides the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Recognizes every variant with every mode.
    ///
    /// Never fails: each pair yields exactly one [`AttemptResult`], in
    /// variant-major order.
    pub async fn run(
        &self,
        variants: Vec<PreprocessedVariant>,
        cancel: &CancellationToken,
    ) -> Vec<AttemptResult> {
        let variants: Vec<Arc<PreprocessedVariant>> = variants.into_iter().map(Arc::new).collect();
        let mode_count = self.modes.len();
        let total = variants.len() * mode_count;
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (variant_index, variant) in variants.iter().enumerate() {
            for (mode_index, &mode) in self.modes.iter().enumerate() {
                let slot = variant_index * mode_count + mode_index;
                let engine = Arc::clone(&self.engine);
                let variant = Arc::clone(variant);
                let language = self.language.clone();
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();
                let timeout = self.attempt_timeout;

                tasks.spawn(async move {
                    let started = Instant::now();
                    let kind = variant.kind;
                    let outcome =
                        run_single(engine, variant, language, mode, timeout, semaphore, cancel)
                            .await;
                    (
                        slot,
                        AttemptResult {
                            variant: kind,
                            mode,
                            outcome,
                            duration: started.elapsed(),
                        },
                    )
                });
            }
        }

        let mut slots: Vec<Option<AttemptResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => {
                    crate::observability::record_attempt_metrics(
                        result.outcome.label(),
                        result.duration,
                    );
                    debug!(
                        variant = %result.variant,
                        psm = result.mode.as_str(),
                        outcome = result.outcome.label(),
                        chars = result.text().len(),
                        duration_ms = result.duration.as_millis() as u64,
                        "Recognition attempt finished"
                    );
                    slots[slot] = Some(result);
                }
                Err(join_error) => {
                    warn!(error = %join_error, "Recognition attempt task did not complete");
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(slot, result)| {
                result.unwrap_or_else(|| AttemptResult {
                    variant: variants[slot / mode_count].kind,
                    mode: self.modes[slot % mode_count],
                    outcome: AttemptOutcome::Failed(
                        OcrError::Worker("attempt task aborted".to_string()).to_string(),
                    ),
                    duration: Duration::ZERO,
                })
            })
            .collect()
    }
}

async fn run_single(
    engine: Arc<dyn RecognitionEngine>,
    variant: Arc<PreprocessedVariant>,
    language: String,
    mode: PageSegMode,
    timeout: Duration,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> AttemptOutcome {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return AttemptOutcome::Cancelled,
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return AttemptOutcome::Cancelled,
        },
    };
    if cancel.is_cancelled() {
        return AttemptOutcome::Cancelled;
    }

    let task =
        tokio::task::spawn_blocking(move || engine.recognize(&variant.image, &language, mode));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(output))) => AttemptOutcome::Recognized(output.into_text()),
        Ok(Ok(Err(error))) => AttemptOutcome::Failed(error.to_string()),
        Ok(Err(join_error)) => {
            AttemptOutcome::Failed(OcrError::Worker(join_error.to_string()).to_string())
        }
        Err(_) => AttemptOutcome::TimedOut,
    }
}
