//! # HTTP Transport
//!
//! Thin hyper 1 layer over [`VerificationService`]:
//!
//! - `POST /verify` runs a verification
//! - `GET /health` reports collaborator readiness
//!
//! Every error body is `{"detail": "..."}` in the configured message language.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::server::conn::http1;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::errors::{error_logging, AppError};
use crate::localization::LocalizationManager;
use crate::models::{ErrorResponse, HealthResponse, ServiceStatus, VerifyItemRequest};
use crate::observability;
use crate::validation::{MAX_ITEM_NAME_CHARS, MIN_IMAGE_BASE64_CHARS};
use crate::verification::VerificationService;

/// Shared state handed to every connection
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// `None` when the recognition engine failed to start
    pub service: Option<Arc<VerificationService>>,
    pub localization: Arc<LocalizationManager>,
}

impl AppState {
    fn message(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.localization.get_message_with_args_in_language(
            key,
            &self.config.verification.message_language,
            args,
        )
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let payload = match serde_json::to_vec(body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            return plain_error(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(payload)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

fn plain_error(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"{\"detail\":\"\"}")));
    *response.status_mut() = status;
    response
}

fn error_response(status: StatusCode, detail: String) -> Response<Full<Bytes>> {
    json_response(status, &ErrorResponse { detail })
}

/// Maps an application error to its HTTP response without leaking internals.
pub fn app_error_response(state: &AppState, err: &AppError) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let detail = match err {
        AppError::Validation(key) => {
            let max = MAX_ITEM_NAME_CHARS.to_string();
            let min = MIN_IMAGE_BASE64_CHARS.to_string();
            let details = state.message(key, &[("max", max.as_str()), ("min", min.as_str())]);
            state.message("error-validation", &[("details", details.as_str())])
        }
        AppError::Decode(details) => {
            state.message("error-image-processing", &[("details", details.as_str())])
        }
        other => {
            error_logging::log_internal_error(other, "server", "verify");
            state.message("error-internal", &[])
        }
    };
    if err.is_client_error() {
        debug!(error = %err, status = status.as_u16(), "Rejected client input");
    }
    error_response(status, detail)
}

fn health(state: &AppState) -> Response<Full<Bytes>> {
    let (ocr, ai, model) = match &state.service {
        Some(service) => (
            true,
            service.semantic_available(),
            service.model_name().unwrap_or(&state.config.semantic.model).to_string(),
        ),
        None => (false, state.config.semantic.is_enabled(), state.config.semantic.model.clone()),
    };

    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "healthy".to_string(),
            ocr_language: state.config.ocr.language.clone(),
            ai_model: model,
            verification_mode: state.config.verification.mode.as_str().to_string(),
            services: ServiceStatus { ocr, ai },
            timestamp: chrono::Utc::now(),
        },
    )
}

async fn verify<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = match Limited::new(req.into_body(), state.config.server.max_body_bytes)
        .collect()
        .await
    {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                state.message("error-body-too-large", &[]),
            );
        }
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return error_response(
                StatusCode::BAD_REQUEST,
                state.message("error-invalid-json", &[("details", e.to_string().as_str())]),
            );
        }
    };

    let request: VerifyItemRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) if e.is_data() => {
            error_logging::log_validation_error(&e, "parse_request", "verify_request", None);
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                state.message("error-validation", &[("details", e.to_string().as_str())]),
            );
        }
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                state.message("error-invalid-json", &[("details", e.to_string().as_str())]),
            );
        }
    };

    let Some(service) = &state.service else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            state.message("error-service-unavailable", &[]),
        );
    };

    match service.verify(&request).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => app_error_response(state, &e),
    }
}

/// Routes one request.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/verify") => verify(req, &state).await,
        (&Method::GET, "/health") => health(&state),
        (_, "/verify") | (_, "/health") => error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            state.message("error-method-not-allowed", &[]),
        ),
        _ => error_response(StatusCode::NOT_FOUND, state.message("error-not-found", &[])),
    };

    let status = response.status().as_u16();
    observability::record_request_metrics(method.as_str(), status, started.elapsed());
    debug!(
        method = %method,
        path = %path,
        status = status,
        duration_ms = started.elapsed().as_millis() as u64,
        "Request handled"
    );
    Ok(response)
}

/// Serves the API until ctrl-c.
pub async fn run_server(state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;
    let listener = TcpListener::bind(addr).await?;
    info!("Verification API listening on {}", addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = hyper::service::service_fn(move |req: Request<hyper::body::Incoming>| {
                                handle_request(req, Arc::clone(&state))
                            });

                            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                                debug!("Error serving connection: {:?}", err);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping API listener");
                break;
            }
        }
    }

    Ok(())
}
