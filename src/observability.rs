//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels (pretty or JSON)
//! - Metrics collection and Prometheus export on a dedicated port
//! - Distributed tracing with OpenTelemetry OTLP export
//! - Span and metric helpers used by the verification pipeline

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tokio::net::TcpListener;
use tracing_subscriber::prelude::*;

use crate::observability_config::ObservabilityConfig;

async fn start_metrics_server(metrics_handle: PrometheusHandle, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on {}", addr);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let metrics_handle = metrics_handle.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                async move {
                                    match (req.method(), req.uri().path()) {
                                        (&hyper::Method::GET, "/metrics") => {
                                            Ok::<_, std::convert::Infallible>(
                                                hyper::Response::new(metrics_handle.render()),
                                            )
                                        }
                                        (&hyper::Method::GET, "/health/live") => {
                                            Ok(hyper::Response::new("OK".to_string()))
                                        }
                                        _ => {
                                            let mut response =
                                                hyper::Response::new("Not Found".to_string());
                                            *response.status_mut() = hyper::StatusCode::NOT_FOUND;
                                            Ok(response)
                                        }
                                    }
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            tracing::error!("Error serving metrics connection: {:?}", err);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Error accepting metrics connection: {}", e);
                }
            }
        }
    });

    Ok(())
}

/// Initialize the complete observability stack with custom configuration
pub async fn init_observability_with_config(config: ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    init_tracing_with_config(&config)?;

    if config.enable_metrics_export {
        let metrics_handle = init_metrics()?;
        start_metrics_server(metrics_handle, config.metrics_port).await?;
    }

    init_opentelemetry_tracing_with_config(&config)?;

    tracing::info!(
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        metrics_port = %config.metrics_port,
        "Observability stack initialized successfully"
    );
    Ok(())
}

/// Initialize structured logging with tracing and configuration
fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("price_tag_verifier={}", config.log_level).parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    let pretty = config.is_development()
        || std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()) == "pretty";

    if pretty {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        pretty = pretty,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Initialize metrics collection with Prometheus exporter
fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Metrics collection initialized");
    Ok(handle)
}

/// Initialize OpenTelemetry distributed tracing when an OTLP endpoint is configured
fn init_opentelemetry_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let Some(endpoint) = &config.otlp_endpoint else {
        tracing::info!("OpenTelemetry tracing disabled (no OTLP endpoint configured)");
        return Ok(());
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;

    let mut builder = SdkTracerProvider::builder().with_batch_exporter(exporter);
    if config.enable_trace_sampling {
        builder = builder.with_sampler(Sampler::TraceIdRatioBased(config.trace_sampling_ratio));
    }

    global::set_tracer_provider(builder.build());

    tracing::info!(
        otlp_endpoint = %endpoint,
        trace_sampling_enabled = %config.enable_trace_sampling,
        trace_sampling_ratio = %config.trace_sampling_ratio,
        "OpenTelemetry tracing initialized with OTLP export"
    );
    Ok(())
}

/// Create a span for a whole verification request
pub fn verification_span(mode: &str, item_chars: usize) -> tracing::Span {
    tracing::info_span!(
        "verification",
        mode = mode,
        item_chars = item_chars,
        component = "verification"
    )
}

/// Create a span for OCR operations
pub fn ocr_span(operation: &str) -> tracing::Span {
    tracing::info_span!("ocr_operation", operation = operation, component = "ocr")
}

/// Create a span for semantic engine calls
pub fn semantic_span(operation: &str, model: &str) -> tracing::Span {
    tracing::info_span!(
        "semantic_operation",
        operation = operation,
        model = model,
        component = "semantic"
    )
}

/// Record the outcome of one recognition attempt
pub fn record_attempt_metrics(outcome: &'static str, duration: Duration) {
    metrics::counter!("ocr_attempts_total", "outcome" => outcome).increment(1);
    metrics::histogram!("ocr_attempt_duration_seconds").record(duration.as_secs_f64());
}

/// Record a full recognition pipeline run
pub fn record_pipeline_metrics(attempts: usize, successes: usize, duration: Duration) {
    metrics::histogram!("ocr_pipeline_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("ocr_pipeline_attempts").record(attempts as f64);
    metrics::histogram!("ocr_pipeline_successful_attempts").record(successes as f64);
}

/// Record a semantic engine call
pub fn record_semantic_metrics(success: bool, duration: Duration) {
    metrics::counter!("semantic_requests_total", "result" => if success { "success" } else { "failure" })
        .increment(1);
    metrics::histogram!("semantic_request_duration_seconds").record(duration.as_secs_f64());
}

/// Record a verdict produced by the fuzzy fallback matcher
pub fn record_fallback(reason: &'static str) {
    metrics::counter!("semantic_fallbacks_total", "reason" => reason).increment(1);
}

/// Record a finished verification
pub fn record_verification_metrics(result: &'static str, source: &'static str, duration: Duration) {
    metrics::counter!("verifications_total", "result" => result, "source" => source).increment(1);
    metrics::histogram!("verification_duration_seconds").record(duration.as_secs_f64());
}

/// Record HTTP request metrics
pub fn record_request_metrics(method: &str, status: u16, duration: Duration) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!("requests_total", "method" => method, "status" => status).increment(1);
    metrics::histogram!("request_duration_seconds").record(duration.as_secs_f64());
}

/// Update circuit breaker state gauge
pub fn update_circuit_breaker_state(is_open: bool) {
    metrics::gauge!("circuit_breaker_state").set(if is_open { 1.0 } else { 0.0 });
}
