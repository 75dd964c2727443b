//! Detector registry: ordered id → plugin mapping built once at startup

use crate::config::DrishtiConfig;
use crate::error::VisionError;
use crate::models::ModelManager;
use crate::plugin::DetectionPlugin;
use std::collections::HashMap;
use tracing::{info, warn};

/// Snapshot row for the status table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginStatus {
    pub id: u32,
    pub name: String,
    pub enabled: bool,
}

/// Plugins in draw order. Membership is fixed after construction; only each
/// plugin's enabled flag changes.
#[derive(Debug)]
pub struct DetectorRegistry {
    plugins: Vec<DetectionPlugin>,
    /// Position of each id in `plugins`
    index: HashMap<u32, usize>,
}

impl DetectorRegistry {
    /// Register plugins in the given order; duplicate ids are rejected
    pub fn from_plugins(plugins: Vec<DetectionPlugin>) -> Result<Self, VisionError> {
        let mut index = HashMap::with_capacity(plugins.len());
        for (pos, plugin) in plugins.iter().enumerate() {
            if index.insert(plugin.id(), pos).is_some() {
                return Err(VisionError::Config(format!("Duplicate plugin id {}", plugin.id())));
            }
        }
        Ok(Self { plugins, index })
    }

    /// Build every configured plugin. A model that fails to load leaves its
    /// plugin registered but unable to enable; a missing backend is fatal.
    pub fn from_config(config: &DrishtiConfig, models: &ModelManager) -> Result<Self, VisionError> {
        models.ensure_backend()?;

        let mut plugins = Vec::with_capacity(config.plugins.len());
        for entry in &config.plugins {
            let model = match models.load_for(entry) {
                Ok(model) => Some(model),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Plugin {} '{}' is unavailable: {}", entry.id, entry.name, e);
                    None
                }
            };
            plugins.push(DetectionPlugin::from_config(entry, model));
        }

        let registry = Self::from_plugins(plugins)?;
        info!(
            "Registered {} detector plugin(s), {} with a loaded model",
            registry.len(),
            registry.iter().filter(|p| p.has_model()).count()
        );
        Ok(registry)
    }

    pub fn resolve(&self, id: u32) -> Option<&DetectionPlugin> {
        self.index.get(&id).map(|&pos| &self.plugins[pos])
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Current state of every plugin, in registry order
    pub fn list(&self) -> Vec<PluginStatus> {
        self.plugins
            .iter()
            .map(|p| PluginStatus {
                id: p.id(),
                name: p.name().to_string(),
                enabled: p.is_enabled(),
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionPlugin> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
