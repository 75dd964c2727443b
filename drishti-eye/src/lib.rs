//! drishti-eye: live camera annotation with toggleable detectors
//!
//! Frames flow from a [`FrameSource`] through an [`AnnotationPipeline`] of
//! face, hand and pose [`DetectionPlugin`]s and back to the display, while a
//! [`CommandShell`] flips plugins on and off from a text prompt. The
//! [`Controller`] owns both loops and sequences startup and shutdown.

pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod models;
pub mod plugin;
pub mod processing;
pub mod registry;
pub mod render;
pub mod shell;

pub use camera::{default_source, FrameSource, Presentation};
pub use config::DrishtiConfig;
pub use controller::{Controller, RunReport, ShutdownReason};
pub use error::VisionError;
pub use frame::Frame;
pub use models::{default_loader, DetectionResult, InferenceModel, ModelLoader};
pub use plugin::{DetectionPlugin, PluginKind, Toggle};
pub use processing::AnnotationPipeline;
pub use registry::{DetectorRegistry, PluginStatus};
pub use render::{RenderLoop, RenderStats};
pub use shell::{CommandShell, ShellExit};
