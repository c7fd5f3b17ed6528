use std::sync::Arc;

use anyhow::Result;
use price_tag_verifier::config::AppConfig;
use price_tag_verifier::errors::error_logging;
use price_tag_verifier::instance_manager::OcrInstanceManager;
use price_tag_verifier::localization::LocalizationManager;
use price_tag_verifier::observability;
use price_tag_verifier::pipeline::RecognitionPipeline;
use price_tag_verifier::recognition::{RecognitionEngine, TesseractEngine};
use price_tag_verifier::semantic::{OpenAiSemanticEngine, SemanticEngine};
use price_tag_verifier::server::{run_server, AppState};
use price_tag_verifier::verification::VerificationService;
use tracing::{info, warn};

/// Build the Tesseract engine and initialize its instances up front
async fn init_recognition_engine(config: &AppConfig) -> Result<Arc<TesseractEngine>> {
    let engine = Arc::new(TesseractEngine::new(
        Arc::new(OcrInstanceManager::new()),
        config.ocr.model_type,
        config.ocr.source_dpi,
    ));

    let warm = Arc::clone(&engine);
    let language = config.ocr.language.clone();
    let modes = config.ocr.page_seg_modes.clone();
    tokio::task::spawn_blocking(move || warm.warm_up(&language, &modes)).await??;

    Ok(engine)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    config.validate().map_err(|e| {
        error_logging::log_config_error(&e, "environment", "startup");
        anyhow::anyhow!("Configuration validation failed: {}", e)
    })?;

    // Initialize complete observability stack (metrics, tracing, logging)
    observability::init_observability_with_config(config.observability.clone()).await?;
    info!(config = %config.summary(), "Configuration loaded");

    let localization = Arc::new(LocalizationManager::new()?);

    let semantic: Option<Arc<dyn SemanticEngine>> =
        match OpenAiSemanticEngine::from_config(&config.semantic)? {
            Some(engine) => Some(Arc::new(engine)),
            None => {
                warn!("OPENAI_API_KEY not set, verdicts will come from the fallback matcher");
                None
            }
        };

    // The API still answers /health when Tesseract is unavailable
    let service = match init_recognition_engine(&config).await {
        Ok(engine) => {
            let engine: Arc<dyn RecognitionEngine> = engine;
            let pipeline = RecognitionPipeline::new(engine, config.ocr.clone());
            Some(Arc::new(VerificationService::new(
                pipeline,
                semantic,
                Arc::clone(&localization),
                config.verification.clone(),
                &config.ocr.recovery,
            )))
        }
        Err(e) => {
            error_logging::log_internal_error(&e, "recognition_engine", "startup");
            None
        }
    };

    let state = Arc::new(AppState {
        config: Arc::new(config),
        service,
        localization,
    });

    run_server(state).await
}
