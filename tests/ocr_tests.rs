//! # OCR Tests Module
//!
//! Attempt runner and recognition pipeline behavior against in-memory
//! recognition engines: ordering, failure isolation, timeouts, cancellation
//! and bounded concurrency.

#[cfg(test)]
mod tests {
    use image::{DynamicImage, GrayImage, Luma};
    use price_tag_verifier::circuit_breaker::CircuitBreaker;
    use price_tag_verifier::ocr::{AttemptOutcome, AttemptRunner};
    use price_tag_verifier::ocr_config::{ModelType, OcrConfig, PageSegMode, RecoveryConfig};
    use price_tag_verifier::ocr_errors::OcrError;
    use price_tag_verifier::pipeline::RecognitionPipeline;
    use price_tag_verifier::preprocessing::{PreprocessedVariant, VariantKind};
    use price_tag_verifier::recognition::{RecognitionEngine, RecognitionOutput, RecognizedWord};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Engine that reports which mode it was called with
    struct EchoEngine;

    impl RecognitionEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        fn recognize(
            &self,
            image: &GrayImage,
            _language: &str,
            mode: PageSegMode,
        ) -> Result<RecognitionOutput, OcrError> {
            Ok(RecognitionOutput::Text(format!(
                "w{} psm{}",
                image.width(),
                mode.as_str()
            )))
        }
    }

    /// Engine that always fails
    struct FailingEngine;

    impl RecognitionEngine for FailingEngine {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize(
            &self,
            _image: &GrayImage,
            _language: &str,
            _mode: PageSegMode,
        ) -> Result<RecognitionOutput, OcrError> {
            Err(OcrError::Extraction("engine exploded".to_string()))
        }
    }

    /// Engine that blocks longer than the test timeout
    struct SlowEngine {
        delay: Duration,
    }

    impl RecognitionEngine for SlowEngine {
        fn name(&self) -> &str {
            "slow"
        }

        fn recognize(
            &self,
            _image: &GrayImage,
            _language: &str,
            _mode: PageSegMode,
        ) -> Result<RecognitionOutput, OcrError> {
            std::thread::sleep(self.delay);
            Ok(RecognitionOutput::Text("prekasno".to_string()))
        }
    }

    /// Engine that tracks the highest number of simultaneous calls
    struct CountingEngine {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl RecognitionEngine for CountingEngine {
        fn name(&self) -> &str {
            "counting"
        }

        fn recognize(
            &self,
            _image: &GrayImage,
            _language: &str,
            _mode: PageSegMode,
        ) -> Result<RecognitionOutput, OcrError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(RecognitionOutput::Text("mlijeko".to_string()))
        }
    }

    /// Engine answering per mode, used for pipeline selection
    struct ScriptedEngine;

    impl RecognitionEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognize(
            &self,
            _image: &GrayImage,
            _language: &str,
            mode: PageSegMode,
        ) -> Result<RecognitionOutput, OcrError> {
            match mode {
                PageSegMode::Auto => Ok(RecognitionOutput::Text("|| 4,99 KM ~~".to_string())),
                PageSegMode::SingleBlock => Ok(RecognitionOutput::Words(vec![
                    RecognizedWord {
                        text: "Dukat".to_string(),
                        confidence: 91.0,
                    },
                    RecognizedWord {
                        text: "svježe".to_string(),
                        confidence: 88.0,
                    },
                    RecognizedWord {
                        text: "mlijeko".to_string(),
                        confidence: 93.0,
                    },
                    RecognizedWord {
                        text: "šum".to_string(),
                        confidence: -1.0,
                    },
                ])),
                _ => Err(OcrError::Extraction("no text".to_string())),
            }
        }
    }

    fn variants(widths: &[u32]) -> Vec<PreprocessedVariant> {
        widths
            .iter()
            .zip(VariantKind::ALL)
            .map(|(&w, kind)| PreprocessedVariant {
                kind,
                image: GrayImage::from_pixel(w, 8, Luma([200])),
            })
            .collect()
    }

    fn config(modes: Vec<PageSegMode>, max_concurrent: usize) -> OcrConfig {
        OcrConfig {
            page_seg_modes: modes,
            recovery: RecoveryConfig {
                max_concurrent_attempts: max_concurrent,
                ..RecoveryConfig::default()
            },
            ..OcrConfig::default()
        }
    }

    fn test_image() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(40, 20, |x, y| {
            Luma([((x * 13 + y * 7) % 256) as u8])
        }))
    }

    #[test]
    fn test_ocr_config_defaults() {
        let config = OcrConfig::default();

        assert_eq!(config.language, "hrv");
        assert_eq!(config.model_type, ModelType::Fast);
        assert_eq!(config.variants, VariantKind::ALL.to_vec());
        assert_eq!(config.page_seg_modes.len(), 5);
        assert_eq!(config.attempt_count(), 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_circuit_breaker_state_transitions() {
        let breaker = CircuitBreaker::new(&RecoveryConfig {
            circuit_breaker_threshold: 2,
            ..RecoveryConfig::default()
        });

        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_results_are_variant_major() {
        let modes = vec![PageSegMode::Auto, PageSegMode::SingleLine];
        let runner = AttemptRunner::new(Arc::new(EchoEngine), &config(modes, 3));

        let results = runner
            .run(variants(&[10, 20, 30]), &CancellationToken::new())
            .await;

        let texts: Vec<&str> = results.iter().map(|r| r.text()).collect();
        assert_eq!(
            texts,
            vec!["w10 psm3", "w10 psm7", "w20 psm3", "w20 psm7", "w30 psm3", "w30 psm7"]
        );
        assert_eq!(results[2].variant, VariantKind::Contrast);
        assert_eq!(results[3].mode, PageSegMode::SingleLine);
        assert!(results.iter().all(|r| r.succeeded()));
    }

    #[tokio::test]
    async fn test_failures_are_recorded_not_raised() {
        let runner = AttemptRunner::new(
            Arc::new(FailingEngine),
            &config(vec![PageSegMode::Auto, PageSegMode::SparseText], 4),
        );

        let results = runner
            .run(variants(&[10, 10]), &CancellationToken::new())
            .await;

        assert_eq!(results.len(), 4);
        for result in &results {
            assert!(!result.succeeded());
            assert_eq!(result.text(), "");
            assert!(matches!(&result.outcome, AttemptOutcome::Failed(msg) if msg.contains("engine exploded")));
        }
    }

    #[tokio::test]
    async fn test_slow_attempts_time_out() {
        let runner = AttemptRunner::new(
            Arc::new(SlowEngine {
                delay: Duration::from_millis(300),
            }),
            &config(vec![PageSegMode::Auto], 2),
        )
        .with_attempt_timeout(Duration::from_millis(20));

        let results = runner
            .run(variants(&[10, 10]), &CancellationToken::new())
            .await;

        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.outcome == AttemptOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_attempts() {
        let runner = AttemptRunner::new(Arc::new(EchoEngine), &config(vec![PageSegMode::Auto], 1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = runner.run(variants(&[10, 20, 30]), &cancel).await;

        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|r| r.outcome == AttemptOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let engine = Arc::new(CountingEngine {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let runner = AttemptRunner::new(
            engine.clone(),
            &config(vec![PageSegMode::Auto, PageSegMode::SingleBlock], 2),
        );

        let results = runner
            .run(variants(&[10, 10, 10, 10]), &CancellationToken::new())
            .await;

        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.succeeded()));
        assert!(engine.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_pipeline_selects_name_and_borrows_price() {
        let pipeline = RecognitionPipeline::new(
            Arc::new(ScriptedEngine),
            config(vec![PageSegMode::Auto, PageSegMode::SingleBlock], 4),
        );

        let outcome = pipeline
            .recognize(test_image(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.attempts.len(), 10);
        assert_eq!(outcome.selection.text, "Dukat svježe mlijeko");
        assert_eq!(outcome.selection.price.as_deref(), Some("4,99 KM"));
        assert!(outcome.selection.confidence > 0.0 && outcome.selection.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_pipeline_with_failing_engine_returns_empty() {
        let pipeline = RecognitionPipeline::new(
            Arc::new(FailingEngine),
            config(vec![PageSegMode::Auto], 4),
        );

        let outcome = pipeline
            .recognize(test_image(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.attempts.len(), 5);
        assert!(outcome.selection.is_empty());
        assert_eq!(outcome.selection.confidence, 0.0);
        assert!(outcome.selection.price.is_none());
    }
}
