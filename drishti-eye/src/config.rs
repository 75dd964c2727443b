//! Configuration for drishti-eye

use crate::error::VisionError;
use crate::plugin::PluginKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Color triple in the frame's channel order (blue, green, red).
pub type Bgr = [u8; 3];

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "DRISHTI_CONFIG";

/// File name looked up in the working directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "drishti.yaml";

/// Largest accepted stroke width or circle radius, in pixels
pub const MAX_STROKE_PX: u32 = 64;

/// Largest accepted label scale
pub const MAX_LABEL_SCALE: u32 = 8;

/// Top-level configuration, constructed once at startup and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrishtiConfig {
    pub camera: CameraConfig,
    pub render: RenderConfig,
    pub shell: ShellConfig,
    /// Detector plugins; list order is draw order.
    pub plugins: Vec<PluginConfig>,
}

/// Capture device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// USB camera device index (0, 1, 2, etc.)
    pub device_index: u32,
    /// Title of the preview window
    pub window_name: String,
    /// Requested capture resolution (width, height)
    pub resolution: (u32, u32),
    /// Requested capture frame rate
    pub fps: u32,
}

/// Render loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Pace of the render loop in frames per second
    pub target_fps: u32,
    /// How long shutdown waits for the render loop to finish
    pub join_timeout_ms: u64,
    /// Sleep between polls when the source has no frame ready
    pub idle_backoff_ms: u64,
    /// Sleep after a failed iteration
    pub error_backoff_ms: u64,
    /// Flip frames horizontally before any plugin draws on them
    pub mirror: bool,
}

/// Command shell wording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub prompt: String,
    pub invalid_command_message: String,
    pub exit_token: String,
}

/// One detector plugin entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Numeric id used by `enable <id>` / `disable <id>`
    pub id: u32,
    /// Display name in the status table
    pub name: String,
    pub kind: PluginKind,
    pub model: ModelSpec,
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Drawing style; the kind's default style when omitted
    #[serde(default)]
    pub style: Option<DrawStyle>,
    /// Landmark index pairs to connect; the kind's default topology when omitted
    #[serde(default)]
    pub connections: Option<Vec<(usize, usize)>>,
}

/// Location of a model file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model path; relative paths are resolved against the config file's directory
    pub path: PathBuf,
    /// Optional hex-encoded SHA-256 of the model file
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Inference thresholds handed to the model loader
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_detection_confidence: f32,
    pub min_presence_confidence: f32,
    pub min_tracking_confidence: f32,
    /// Maximum hands/poses reported per frame; the kind's default when omitted
    pub max_results: Option<u32>,
}

/// Annotation colors and sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawStyle {
    pub box_color: Bgr,
    pub box_thickness: u32,
    pub circle_color: Bgr,
    pub circle_radius: u32,
    pub line_color: Bgr,
    pub line_thickness: u32,
    pub label: LabelStyle,
}

/// Face label placement relative to the box's top-left corner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub offset_y: i32,
    pub scale: u32,
    pub color: Bgr,
    pub thickness: u32,
}

/// 21-point hand landmark topology.
pub const HAND_CONNECTIONS: &[(usize, usize)] = &[
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// 33-point body pose topology.
pub const POSE_CONNECTIONS: &[(usize, usize)] = &[
    (0, 1), (1, 2), (2, 3), (3, 7), (0, 4), (4, 5), (5, 6), (6, 8),
    (9, 10), (11, 12), (11, 13), (13, 15), (15, 17), (15, 19), (15, 21),
    (17, 19), (12, 14), (14, 16), (16, 18), (16, 20), (16, 22), (18, 20),
    (11, 23), (12, 24), (23, 24), (23, 25), (24, 26), (25, 27), (26, 28),
    (27, 29), (28, 30), (29, 31), (30, 32), (27, 31), (28, 32),
];

impl Default for DrishtiConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            render: RenderConfig::default(),
            shell: ShellConfig::default(),
            plugins: default_plugins(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            window_name: "Detection Camera (Multi-Function)".to_string(),
            resolution: (640, 480),
            fps: 30,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            join_timeout_ms: 2000,
            idle_backoff_ms: 10,
            error_backoff_ms: 10,
            mirror: false,
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "Enter command: ".to_string(),
            invalid_command_message: "Invalid command! Try: enable 2 / disable 3 / exit".to_string(),
            exit_token: "exit".to_string(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_presence_confidence: 0.5,
            min_tracking_confidence: 0.5,
            max_results: None,
        }
    }
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            box_color: [0, 0, 255],
            box_thickness: 2,
            circle_color: [255, 0, 0],
            circle_radius: 5,
            line_color: [0, 255, 0],
            line_thickness: 2,
            label: LabelStyle::default(),
        }
    }
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            offset_y: -10,
            scale: 1,
            color: [0, 0, 255],
            thickness: 1,
        }
    }
}

impl DrawStyle {
    /// Built-in style for a plugin kind
    pub fn for_kind(kind: PluginKind) -> Self {
        match kind {
            PluginKind::Face => Self::default(),
            PluginKind::Hand => Self {
                circle_color: [255, 0, 0],
                circle_radius: 5,
                line_color: [0, 255, 0],
                line_thickness: 2,
                ..Self::default()
            },
            PluginKind::Pose => Self {
                circle_color: [0, 255, 255],
                circle_radius: 4,
                line_color: [255, 255, 0],
                line_thickness: 2,
                ..Self::default()
            },
        }
    }
}

impl RenderConfig {
    /// Target duration of one render iteration
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl PluginConfig {
    /// Configured style, or the kind's built-in one
    pub fn style(&self) -> DrawStyle {
        self.style.clone().unwrap_or_else(|| DrawStyle::for_kind(self.kind))
    }

    /// Configured topology, or the kind's built-in one (empty for faces)
    pub fn connections(&self) -> Vec<(usize, usize)> {
        match &self.connections {
            Some(pairs) => pairs.clone(),
            None => self.kind.default_connections().to_vec(),
        }
    }

    /// Configured result cap, or the kind's default
    pub fn max_results(&self) -> Option<u32> {
        self.thresholds.max_results.or_else(|| self.kind.default_max_results())
    }
}

fn default_plugins() -> Vec<PluginConfig> {
    let entry = |id: u32, name: &str, kind: PluginKind, file: &str| PluginConfig {
        id,
        name: name.to_string(),
        kind,
        model: ModelSpec {
            path: PathBuf::from("models").join(file),
            sha256: None,
        },
        thresholds: Thresholds::default(),
        style: None,
        connections: None,
    };

    vec![
        entry(1, "Face Detection", PluginKind::Face, "face_detector.onnx"),
        entry(2, "Hand Gesture Detection", PluginKind::Hand, "hand_landmarker.onnx"),
        entry(3, "Human Stick Figure Detection", PluginKind::Pose, "pose_landmarker.onnx"),
    ]
}

impl DrishtiConfig {
    /// Parse a YAML document. Relative model paths are left untouched.
    pub fn from_str(content: &str) -> Result<Self, VisionError> {
        let config: DrishtiConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load, resolve model paths against the file's directory, and validate
    pub fn from_file(path: &Path) -> Result<Self, VisionError> {
        let content = fs::read_to_string(path).map_err(|e| {
            VisionError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_str(&content)?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_model_paths(base_dir);
        config.validate().map_err(VisionError::Config)?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Locate the configuration: `$DRISHTI_CONFIG`, then `./drishti.yaml`, then
    /// `<user config dir>/drishti/drishti.yaml`, then built-in defaults.
    pub fn discover() -> Result<(Self, Option<PathBuf>), VisionError> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(explicit);
            let config = Self::from_file(&path)?;
            return Ok((config, Some(path)));
        }

        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("drishti").join(CONFIG_FILE_NAME));
        }

        for candidate in candidates {
            if candidate.is_file() {
                let config = Self::from_file(&candidate)?;
                return Ok((config, Some(candidate)));
            }
            debug!("No config at {}", candidate.display());
        }

        let config = Self::default();
        config.validate().map_err(VisionError::Config)?;
        info!("Using built-in configuration");
        Ok((config, None))
    }

    /// Rewrite relative model paths so they point below `base_dir`
    pub fn resolve_model_paths(&mut self, base_dir: &Path) {
        for plugin in &mut self.plugins {
            if plugin.model.path.is_relative() {
                plugin.model.path = base_dir.join(&plugin.model.path);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let camera = &self.camera;
        if camera.resolution.0 == 0 || camera.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        if camera.resolution.0 > 7680 || camera.resolution.1 > 4320 {
            return Err("Resolution too large (max 8K)".to_string());
        }

        if camera.fps == 0 || camera.fps > 120 {
            return Err("Camera frame rate must be between 1 and 120".to_string());
        }

        if camera.device_index > 100 {
            return Err("Camera device index too large (max 100)".to_string());
        }

        if self.render.target_fps == 0 || self.render.target_fps > 120 {
            return Err("Render frame rate must be between 1 and 120".to_string());
        }

        if self.render.join_timeout_ms == 0 {
            return Err("Join timeout must be non-zero".to_string());
        }

        if self.shell.exit_token.trim().is_empty() {
            return Err("Exit token must not be empty".to_string());
        }

        let mut seen = HashSet::new();
        for plugin in &self.plugins {
            if !seen.insert(plugin.id) {
                return Err(format!("Duplicate plugin id {}", plugin.id));
            }

            if plugin.name.trim().is_empty() {
                return Err(format!("Plugin {} has an empty name", plugin.id));
            }

            let t = &plugin.thresholds;
            for (label, value) in [
                ("min_detection_confidence", t.min_detection_confidence),
                ("min_presence_confidence", t.min_presence_confidence),
                ("min_tracking_confidence", t.min_tracking_confidence),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(format!("Plugin {}: {} must be within [0, 1]", plugin.id, label));
                }
            }

            let style = plugin.style();
            if style.box_thickness == 0 || style.line_thickness == 0 || style.label.scale == 0 {
                return Err(format!("Plugin {}: thickness and label scale must be at least 1", plugin.id));
            }

            for (label, value) in [
                ("box_thickness", style.box_thickness),
                ("line_thickness", style.line_thickness),
                ("circle_radius", style.circle_radius),
                ("label.thickness", style.label.thickness),
            ] {
                if value > MAX_STROKE_PX {
                    return Err(format!("Plugin {}: {} must be at most {}", plugin.id, label, MAX_STROKE_PX));
                }
            }

            if style.label.scale > MAX_LABEL_SCALE {
                return Err(format!("Plugin {}: label scale must be at most {}", plugin.id, MAX_LABEL_SCALE));
            }

            if plugin.kind != PluginKind::Face && plugin.connections().is_empty() {
                return Err(format!("Plugin {}: landmark plugins need at least one connection", plugin.id));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = DrishtiConfig::default();
        assert_eq!(config.camera.device_index, 0);
        assert_eq!(config.camera.resolution, (640, 480));
        assert_eq!(config.render.target_fps, 30);
        assert_eq!(config.render.join_timeout(), Duration::from_secs(2));
        assert!(!config.render.mirror);
        assert_eq!(config.shell.exit_token, "exit");

        let ids: Vec<u32> = config.plugins.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(config.plugins[0].kind, PluginKind::Face);
        assert_eq!(config.plugins[1].kind, PluginKind::Hand);
        assert_eq!(config.plugins[2].kind, PluginKind::Pose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_kind_defaults() {
        let config = DrishtiConfig::default();
        assert!(config.plugins[0].connections().is_empty());
        assert_eq!(config.plugins[1].connections().len(), HAND_CONNECTIONS.len());
        assert_eq!(config.plugins[2].connections().len(), POSE_CONNECTIONS.len());
        assert_eq!(config.plugins[0].max_results(), None);
        assert_eq!(config.plugins[1].max_results(), Some(2));
        assert_eq!(config.plugins[2].max_results(), Some(1));
    }

    #[test]
    fn test_topologies_stay_within_landmark_counts() {
        assert!(HAND_CONNECTIONS.iter().all(|&(a, b)| a < 21 && b < 21));
        assert!(POSE_CONNECTIONS.iter().all(|&(a, b)| a < 33 && b < 33));
    }

    #[test]
    fn test_frame_interval() {
        let mut render = RenderConfig::default();
        render.target_fps = 20;
        assert_eq!(render.frame_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_config_validation_resolution() {
        let mut config = DrishtiConfig::default();
        config.camera.resolution = (0, 480);
        assert!(config.validate().is_err());

        config.camera.resolution = (7681, 4320);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_frame_rates() {
        let mut config = DrishtiConfig::default();
        config.render.target_fps = 0;
        assert!(config.validate().is_err());

        let mut config = DrishtiConfig::default();
        config.camera.fps = 121;
        assert!(config.validate().is_err());

        let mut config = DrishtiConfig::default();
        config.render.target_fps = 120;
        config.camera.fps = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_exit_token() {
        let mut config = DrishtiConfig::default();
        config.shell.exit_token = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_duplicate_ids() {
        let mut config = DrishtiConfig::default();
        config.plugins[2].id = 1;
        let err = config.validate().unwrap_err();
        assert!(err.contains("Duplicate plugin id 1"));
    }

    #[test]
    fn test_config_validation_thresholds() {
        let mut config = DrishtiConfig::default();
        config.plugins[1].thresholds.min_presence_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_thickness() {
        let mut config = DrishtiConfig::default();
        let mut style = DrawStyle::for_kind(PluginKind::Hand);
        style.line_thickness = 0;
        config.plugins[1].style = Some(style);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_topology() {
        let mut config = DrishtiConfig::default();
        config.plugins[2].connections = Some(Vec::new());
        assert!(config.validate().is_err());

        config.plugins[2].connections = None;
        config.plugins[0].connections = Some(Vec::new());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_style_caps() {
        let mut config = DrishtiConfig::default();
        config.plugins[1].style = Some(DrawStyle {
            line_thickness: MAX_STROKE_PX,
            circle_radius: MAX_STROKE_PX,
            ..DrawStyle::for_kind(PluginKind::Hand)
        });
        assert!(config.validate().is_ok());

        config.plugins[1].style = Some(DrawStyle {
            line_thickness: 1 << 22,
            ..DrawStyle::for_kind(PluginKind::Hand)
        });
        let err = config.validate().unwrap_err();
        assert!(err.contains("line_thickness"));

        config.plugins[1].style = Some(DrawStyle {
            circle_radius: MAX_STROKE_PX + 1,
            ..DrawStyle::for_kind(PluginKind::Hand)
        });
        assert!(config.validate().is_err());

        config.plugins[1].style = None;
        config.plugins[0].style = Some(DrawStyle {
            label: LabelStyle {
                scale: MAX_LABEL_SCALE + 1,
                ..LabelStyle::default()
            },
            ..DrawStyle::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_str_partial_document() {
        let yaml = r#"
render:
  target_fps: 15
  mirror: true
shell:
  exit_token: "exit()"
plugins:
  - id: 7
    name: Hands
    kind: hand
    model:
      path: models/hands.onnx
    thresholds:
      max_results: 4
    connections: [[0, 1], [1, 2]]
"#;
        let config = DrishtiConfig::from_str(yaml).unwrap();
        assert_eq!(config.render.target_fps, 15);
        assert!(config.render.mirror);
        assert_eq!(config.render.join_timeout_ms, 2000);
        assert_eq!(config.shell.exit_token, "exit()");
        assert_eq!(config.shell.prompt, "Enter command: ");
        assert_eq!(config.plugins.len(), 1);

        let plugin = &config.plugins[0];
        assert_eq!(plugin.kind, PluginKind::Hand);
        assert_eq!(plugin.connections(), vec![(0, 1), (1, 2)]);
        assert_eq!(plugin.max_results(), Some(4));
        assert_eq!(plugin.style(), DrawStyle::for_kind(PluginKind::Hand));
    }

    #[test]
    fn test_from_str_rejects_unknown_kind() {
        let yaml = r#"
plugins:
  - id: 1
    name: Cats
    kind: cat
    model:
      path: cat.onnx
"#;
        assert!(matches!(DrishtiConfig::from_str(yaml), Err(VisionError::Yaml(_))));
    }

    #[test]
    fn test_from_file_resolves_model_paths() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        let mut file = fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            "plugins:\n  - id: 1\n    name: Face\n    kind: face\n    model:\n      path: models/face.onnx\n  - id: 2\n    name: Pose\n    kind: pose\n    model:\n      path: /opt/models/pose.onnx"
        )
        .unwrap();

        let config = DrishtiConfig::from_file(&config_path).unwrap();
        assert_eq!(
            config.plugins[0].model.path,
            temp_dir.path().join("models/face.onnx")
        );
        assert_eq!(config.plugins[1].model.path, PathBuf::from("/opt/models/pose.onnx"));
    }

    #[test]
    fn test_from_file_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "render:\n  target_fps: 0\n").unwrap();

        let err = DrishtiConfig::from_file(&config_path).unwrap_err();
        assert!(matches!(err, VisionError::Config(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let err = DrishtiConfig::from_file(&temp_dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.is_fatal());
    }
}
