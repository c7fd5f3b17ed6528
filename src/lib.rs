//! # Price Tag Verifier
//!
//! An HTTP service that checks whether a photographed store price tag shows a
//! given shopping-list item. Tesseract reads the tag through several
//! preprocessed variants, the best reading is matched against the item by a
//! semantic engine, and a fuzzy matcher takes over when that engine is not
//! available.

pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod fuzzy_match;
pub mod image_input;
pub mod instance_manager;
pub mod localization;
pub mod models;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod pipeline;
pub mod preprocessing;
pub mod recognition;
pub mod scoring;
pub mod semantic;
pub mod server;
pub mod text_processing;
pub mod validation;
pub mod verification;

// Re-export types for easier access
pub use fuzzy_match::{fuzzy_match, MatchVerdict};
pub use scoring::Candidate;
pub use verification::VerificationService;
