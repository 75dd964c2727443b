//! Annotation pipeline

use crate::frame::Frame;
use crate::registry::DetectorRegistry;
use std::sync::Arc;
use tracing::{debug, error};

/// Applies every plugin's `draw` to a frame in registry order
#[derive(Debug, Clone)]
pub struct AnnotationPipeline {
    registry: Arc<DetectorRegistry>,
    mirror: bool,
}

impl AnnotationPipeline {
    pub fn new(registry: Arc<DetectorRegistry>, mirror: bool) -> Self {
        Self { registry, mirror }
    }

    pub fn registry(&self) -> &Arc<DetectorRegistry> {
        &self.registry
    }

    /// Mirror if configured, then let each plugin draw on top of the previous
    /// ones. A failing plugin is logged and skipped for this frame.
    pub fn apply<'f>(&self, frame: &'f mut Frame) -> &'f mut Frame {
        if self.mirror {
            frame.mirror_horizontal();
        }

        for plugin in self.registry.iter() {
            if let Err(e) = plugin.draw(frame) {
                error!("Plugin {} '{}' failed on this frame: {}", plugin.id(), plugin.name(), e);
            }
        }

        debug!("Annotated {}x{} frame", frame.width(), frame.height());
        frame
    }
}
