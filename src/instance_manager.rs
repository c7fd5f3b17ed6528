//! # OCR Instance Manager Module
//!
//! Thread-safe cache of Tesseract instances. Creating an instance costs
//! 100-500ms, so each (language, model, page segmentation mode) combination is
//! initialized once and reused for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;

use leptess::LepTess;
use parking_lot::Mutex;
use tracing::info;

use crate::ocr_config::{ModelType, PageSegMode};
use crate::ocr_errors::OcrError;

/// Cache key for one configured Tesseract instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    pub language: String,
    pub model_type: ModelType,
    pub mode: PageSegMode,
}

impl InstanceKey {
    pub fn new(language: &str, model_type: ModelType, mode: PageSegMode) -> Self {
        Self {
            language: language.to_string(),
            model_type,
            mode,
        }
    }
}

/// Thread-safe OCR instance manager for reusing Tesseract instances
///
/// Each cached instance sits behind its own mutex. Attempts that share a page
/// segmentation mode take turns on one instance; attempts with different modes
/// run on different instances in parallel.
///
/// # Instance Lifecycle
///
/// - Instances are created on first request for a key
/// - Instances persist until cleared or the manager is dropped
pub struct OcrInstanceManager {
    instances: Mutex<HashMap<InstanceKey, Arc<Mutex<LepTess>>>>,
}

impl Default for OcrInstanceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrInstanceManager {
    /// Create a new, empty instance manager
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create an OCR instance for the given key
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::Initialization`] if Tesseract cannot load the language
    /// data or rejects the page segmentation mode.
    pub fn get_instance(&self, key: &InstanceKey) -> Result<Arc<Mutex<LepTess>>, OcrError> {
        if let Some(instance) = self.instances.lock().get(key) {
            return Ok(Arc::clone(instance));
        }

        info!(
            language = %key.language,
            model = %key.model_type.tessdata_dir(),
            psm = %key.mode.as_str(),
            "Creating new OCR instance"
        );

        let tessdata_path = Self::get_tessdata_path(key.model_type);

        let mut tess = LepTess::new(tessdata_path.as_deref(), &key.language).map_err(|e| {
            OcrError::Initialization(format!(
                "Failed to initialize Tesseract for '{}': {}",
                key.language, e
            ))
        })?;

        tess.set_variable(leptess::Variable::TesseditPagesegMode, key.mode.as_str())
            .map_err(|e| OcrError::Initialization(format!("Failed to set PSM mode: {}", e)))?;

        let instance = Arc::new(Mutex::new(tess));

        // Another thread may have raced us; keep whichever instance landed first.
        let mut instances = self.instances.lock();
        let stored = instances
            .entry(key.clone())
            .or_insert_with(|| Arc::clone(&instance));
        Ok(Arc::clone(stored))
    }

    /// Get the tessdata path for the specified model type
    ///
    /// Falls back to Tesseract's default search path if no model-specific
    /// directory is installed.
    fn get_tessdata_path(model_type: ModelType) -> Option<String> {
        if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
            return Some(prefix);
        }

        let dir = model_type.tessdata_dir();
        let possible_paths = [
            format!("/usr/share/tesseract-ocr/5/{}", dir),
            format!("/usr/share/tesseract-ocr/4.00/{}", dir),
            format!("/usr/share/{}", dir),
            format!("/usr/local/share/{}", dir),
        ];

        possible_paths
            .into_iter()
            .find(|path| std::path::Path::new(path).exists())
    }

    /// Clear all instances (useful for memory cleanup)
    pub fn clear(&self) {
        let mut instances = self.instances.lock();
        let count = instances.len();
        instances.clear();
        if count > 0 {
            info!("Cleared {count} OCR instances");
        }
    }

    /// Get the number of cached instances
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }
}
