//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

/// Body of `POST /verify`. Accepts snake_case and camelCase field names.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyItemRequest {
    #[serde(alias = "itemName")]
    pub item_name: String,
    #[serde(alias = "imageBase64")]
    pub image_base64: String,
}

/// Body returned by `POST /verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyItemResponse {
    pub is_match: bool,
    pub confidence: f64,
    pub ocr_text: String,
    pub extracted_price: Option<String>,
    pub message: String,
}

/// Collaborator readiness reported by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub ocr: bool,
    pub ai: bool,
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ocr_language: String,
    pub ai_model: String,
    pub verification_mode: String,
    pub services: ServiceStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
