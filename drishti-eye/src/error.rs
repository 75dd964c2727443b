//! Error types for drishti-eye

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),

    #[error("OpenCV error: {0}")]
    OpenCv(String),
}

impl VisionError {
    /// Whether this error must abort startup rather than degrade a single component.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VisionError::DeviceUnavailable(_)
                | VisionError::MissingDependency(_)
                | VisionError::Config(_)
                | VisionError::Yaml(_)
        )
    }
}

#[cfg(feature = "camera")]
impl From<opencv::Error> for VisionError {
    fn from(err: opencv::Error) -> Self {
        VisionError::OpenCv(err.message)
    }
}
