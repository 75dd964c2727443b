//! Inference seam between detector plugins and model backends

pub mod manager;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use manager::ModelManager;
#[cfg(feature = "onnx")]
pub use onnx::{OnnxModel, OnnxModelLoader};

use crate::config::{ModelSpec, Thresholds};
use crate::error::VisionError;
use crate::plugin::PluginKind;
use image::RgbImage;
use std::sync::Arc;

/// Face bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
}

/// Landmark in normalized image coordinates, (0, 0) top-left and (1, 1) bottom-right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// All landmarks of one detected hand or body
pub type LandmarkSet = Vec<Landmark>;

/// Output of one inference call
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionResult {
    Faces(Vec<FaceBox>),
    Landmarks(Vec<LandmarkSet>),
}

impl DetectionResult {
    /// Number of detected faces, hands or bodies
    pub fn len(&self) -> usize {
        match self {
            DetectionResult::Faces(boxes) => boxes.len(),
            DetectionResult::Landmarks(sets) => sets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A loaded model. Called from the render thread only, one frame at a time.
pub trait InferenceModel: Send + Sync {
    fn infer(&self, image: &RgbImage) -> Result<DetectionResult, VisionError>;
}

/// Turns a model file into a ready-to-run model
pub trait ModelLoader: Send + Sync {
    fn load(
        &self,
        kind: PluginKind,
        spec: &ModelSpec,
        thresholds: &Thresholds,
    ) -> Result<Arc<dyn InferenceModel>, VisionError>;

    /// Whether an inference backend is present at all
    fn is_available(&self) -> bool {
        true
    }
}

/// Loader used when no inference backend is compiled in
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableLoader;

impl ModelLoader for UnavailableLoader {
    fn load(
        &self,
        kind: PluginKind,
        spec: &ModelSpec,
        _thresholds: &Thresholds,
    ) -> Result<Arc<dyn InferenceModel>, VisionError> {
        Err(VisionError::MissingDependency(format!(
            "no inference backend compiled in for {:?} model {:?} (build with --features onnx)",
            kind, spec.path
        )))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Loader for the backends enabled at build time
pub fn default_loader() -> Arc<dyn ModelLoader> {
    #[cfg(feature = "onnx")]
    {
        Arc::new(OnnxModelLoader::default())
    }
    #[cfg(not(feature = "onnx"))]
    {
        Arc::new(UnavailableLoader)
    }
}
