//! Detector plugins: one model each, independently toggled, drawing in place

use crate::config::{DrawStyle, PluginConfig, HAND_CONNECTIONS, POSE_CONNECTIONS};
use crate::error::VisionError;
use crate::frame::Frame;
use crate::models::{DetectionResult, FaceBox, InferenceModel, LandmarkSet};
use crate::processing::draw::{draw_line, draw_rect, draw_text, fill_circle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Closed set of detector kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    Face,
    Hand,
    Pose,
}

impl PluginKind {
    /// Built-in connection topology; faces have none
    pub fn default_connections(self) -> &'static [(usize, usize)] {
        match self {
            PluginKind::Face => &[],
            PluginKind::Hand => HAND_CONNECTIONS,
            PluginKind::Pose => POSE_CONNECTIONS,
        }
    }

    /// Built-in cap on detections per frame
    pub fn default_max_results(self) -> Option<u32> {
        match self {
            PluginKind::Face => None,
            PluginKind::Hand => Some(2),
            PluginKind::Pose => Some(1),
        }
    }

    /// Constructor for this kind
    pub fn constructor(self) -> fn(u32, String, Option<Arc<dyn InferenceModel>>) -> DetectionPlugin {
        match self {
            PluginKind::Face => DetectionPlugin::face_detector,
            PluginKind::Hand => DetectionPlugin::hand_detector,
            PluginKind::Pose => DetectionPlugin::pose_detector,
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PluginKind::Face => "face",
            PluginKind::Hand => "hand",
            PluginKind::Pose => "pose",
        };
        f.write_str(name)
    }
}

/// Outcome of a toggle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Enabled,
    Disabled,
    /// The model never loaded, so the plugin stays off
    Unavailable,
}

pub struct DetectionPlugin {
    id: u32,
    name: String,
    kind: PluginKind,
    enabled: AtomicBool,
    model: Option<Arc<dyn InferenceModel>>,
    style: DrawStyle,
    connections: Vec<(usize, usize)>,
}

impl DetectionPlugin {
    fn new(id: u32, name: String, kind: PluginKind, model: Option<Arc<dyn InferenceModel>>) -> Self {
        Self {
            id,
            name,
            kind,
            enabled: AtomicBool::new(false),
            model,
            style: DrawStyle::for_kind(kind),
            connections: kind.default_connections().to_vec(),
        }
    }

    pub fn face_detector(id: u32, name: String, model: Option<Arc<dyn InferenceModel>>) -> Self {
        Self::new(id, name, PluginKind::Face, model)
    }

    pub fn hand_detector(id: u32, name: String, model: Option<Arc<dyn InferenceModel>>) -> Self {
        Self::new(id, name, PluginKind::Hand, model)
    }

    pub fn pose_detector(id: u32, name: String, model: Option<Arc<dyn InferenceModel>>) -> Self {
        Self::new(id, name, PluginKind::Pose, model)
    }

    /// Build from a config entry; `model` is `None` when loading failed
    pub fn from_config(config: &PluginConfig, model: Option<Arc<dyn InferenceModel>>) -> Self {
        (config.kind.constructor())(config.id, config.name.clone(), model)
            .with_style(config.style())
            .with_connections(config.connections())
    }

    pub fn with_style(mut self, style: DrawStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_connections(mut self, connections: Vec<(usize, usize)>) -> Self {
        self.connections = connections;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    pub fn style(&self) -> &DrawStyle {
        &self.style
    }

    pub fn connections(&self) -> &[(usize, usize)] {
        &self.connections
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn enable(&self) -> Toggle {
        if self.model.is_none() {
            warn!("Plugin {} '{}' has no loaded model; it cannot be enabled", self.id, self.name);
            return Toggle::Unavailable;
        }
        self.enabled.store(true, Ordering::Release);
        info!("Plugin {} '{}' enabled", self.id, self.name);
        Toggle::Enabled
    }

    pub fn disable(&self) -> Toggle {
        self.enabled.store(false, Ordering::Release);
        info!("Plugin {} '{}' disabled", self.id, self.name);
        Toggle::Disabled
    }

    /// Run the model on a frame. `None` while disabled or without a model.
    pub fn detect(&self, frame: &Frame) -> Result<Option<DetectionResult>, VisionError> {
        let model = match (&self.model, self.is_enabled()) {
            (Some(model), true) => model,
            _ => return Ok(None),
        };

        let result = model.infer(&frame.to_rgb_image())?;
        match (self.kind, &result) {
            (PluginKind::Face, DetectionResult::Faces(_))
            | (PluginKind::Hand | PluginKind::Pose, DetectionResult::Landmarks(_)) => {
                debug!("Plugin {} detected {} item(s)", self.id, result.len());
                Ok(Some(result))
            }
            (kind, _) => Err(VisionError::Processing(format!(
                "{} plugin {} received a mismatched detection result",
                kind, self.id
            ))),
        }
    }

    /// Detect and annotate in place; the frame is untouched while disabled
    pub fn draw<'f>(&self, frame: &'f mut Frame) -> Result<&'f mut Frame, VisionError> {
        match self.detect(frame)? {
            Some(DetectionResult::Faces(boxes)) => self.draw_faces(frame, &boxes),
            Some(DetectionResult::Landmarks(sets)) => self.draw_landmarks(frame, &sets),
            None => {}
        }
        Ok(frame)
    }

    fn draw_faces(&self, frame: &mut Frame, boxes: &[FaceBox]) {
        let style = &self.style;
        for face in boxes {
            let (x1, y1) = (face.origin_x, face.origin_y);
            let (x2, y2) = (x1.saturating_add(face.width), y1.saturating_add(face.height));
            draw_rect(frame, x1, y1, x2, y2, style.box_color, style.box_thickness);

            let label = format!("Face: {:.2}", face.confidence);
            draw_text(
                frame,
                x1,
                y1.saturating_add(style.label.offset_y),
                &label,
                style.label.color,
                style.label.scale,
                style.label.thickness,
            );
        }
    }

    fn draw_landmarks(&self, frame: &mut Frame, sets: &[LandmarkSet]) {
        let style = &self.style;
        let (width, height) = (frame.width() as f32, frame.height() as f32);

        for set in sets {
            let points: Vec<Option<(i32, i32)>> = set
                .iter()
                .map(|l| {
                    let (x, y) = (l.x * width, l.y * height);
                    (x.is_finite() && y.is_finite()).then(|| (x as i32, y as i32))
                })
                .collect();

            for &(x, y) in points.iter().flatten() {
                fill_circle(frame, x, y, style.circle_radius, style.circle_color);
            }

            for &(a, b) in &self.connections {
                if let (Some(Some(start)), Some(Some(end))) = (points.get(a), points.get(b)) {
                    draw_line(frame, *start, *end, style.line_color, style.line_thickness);
                }
            }
        }
    }
}

impl fmt::Debug for DetectionPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionPlugin")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .field("has_model", &self.has_model())
            .finish()
    }
}
