//! Model file checks ahead of backend loading

use crate::config::PluginConfig;
use crate::error::VisionError;
use crate::models::{InferenceModel, ModelLoader};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Hex-encoded SHA-256 of a file
pub fn file_sha256(path: &Path) -> Result<String, VisionError> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Compare a file against an expected hex digest (case-insensitive)
pub fn verify_checksum(path: &Path, expected: &str) -> Result<(), VisionError> {
    let computed = file_sha256(path)?;
    if !computed.eq_ignore_ascii_case(expected.trim()) {
        return Err(VisionError::Model(format!(
            "Checksum mismatch for {:?}: expected {}, got {}",
            path,
            expected.trim(),
            computed
        )));
    }
    debug!("Verified checksum for {:?}", path);
    Ok(())
}

/// Validates model files and hands them to the configured backend
pub struct ModelManager {
    loader: Arc<dyn ModelLoader>,
}

impl ModelManager {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self { loader }
    }

    /// Fails when no inference backend is compiled in
    pub fn ensure_backend(&self) -> Result<(), VisionError> {
        if self.loader.is_available() {
            Ok(())
        } else {
            Err(VisionError::MissingDependency(
                "no inference backend compiled in (build with --features onnx)".to_string(),
            ))
        }
    }

    /// Load the model for one plugin entry. Each call yields an independent
    /// model instance.
    pub fn load_for(&self, plugin: &PluginConfig) -> Result<Arc<dyn InferenceModel>, VisionError> {
        let path = &plugin.model.path;
        if !path.is_file() {
            return Err(VisionError::Model(format!(
                "Model file for '{}' not found at {:?}",
                plugin.name, path
            )));
        }

        if let Some(expected) = plugin.model.sha256.as_deref() {
            verify_checksum(path, expected)?;
        }

        let mut thresholds = plugin.thresholds.clone();
        thresholds.max_results = plugin.max_results();

        let model = self.loader.load(plugin.kind, &plugin.model, &thresholds)?;
        info!("Loaded {:?} model for '{}' from {:?}", plugin.kind, plugin.name, path);
        Ok(model)
    }
}
