//! Controller: owns the frame source, registry and loops, and sequences
//! startup and shutdown

use crate::camera::{self, FrameSource, SharedFrameSource};
use crate::config::DrishtiConfig;
use crate::error::VisionError;
use crate::models::{ModelLoader, ModelManager};
use crate::processing::AnnotationPipeline;
use crate::registry::DetectorRegistry;
use crate::render::{RenderLoop, RenderStats};
use crate::shell::{CommandShell, ShellExit};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The exit token was entered
    ExitCommand,
    /// Command input reached end of file
    EndOfInput,
    /// The display window asked to close
    WindowClosed,
    /// Reading commands or writing replies failed
    InputError,
}

/// Outcome of one `Controller::run`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// `None` when the render loop missed the join timeout
    pub render: Option<RenderStats>,
    pub shutdown: ShutdownReason,
}

pub struct Controller {
    config: Arc<DrishtiConfig>,
    registry: Arc<DetectorRegistry>,
    source: SharedFrameSource,
}

impl Controller {
    pub fn new(config: Arc<DrishtiConfig>, registry: Arc<DetectorRegistry>, source: Box<dyn FrameSource>) -> Self {
        Self {
            config,
            registry,
            source: camera::shared(source),
        }
    }

    /// Validate the configuration and load every plugin's model
    pub fn from_config(
        config: DrishtiConfig,
        source: Box<dyn FrameSource>,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        let registry = DetectorRegistry::from_config(&config, &ModelManager::new(loader))?;
        Ok(Self::new(Arc::new(config), Arc::new(registry), source))
    }

    pub fn registry(&self) -> &Arc<DetectorRegistry> {
        &self.registry
    }

    /// Start the camera, render in the background and serve commands from
    /// `input` until exit, end of input or a window close request
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> Result<RunReport, VisionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let device = self.config.camera.device_index;
        self.source.lock().start().map_err(|e| match e {
            VisionError::DeviceUnavailable(_) => e,
            other => VisionError::DeviceUnavailable(format!("camera {}: {}", device, other)),
        })?;
        info!("Camera {} started", device);

        let pipeline = AnnotationPipeline::new(self.registry.clone(), self.config.render.mirror);
        let render = RenderLoop::new(self.source.clone(), pipeline, &self.config.render);
        let running = render.running_flag();
        let close_requested = render.close_signal();
        let handle = match render.spawn() {
            Ok(handle) => handle,
            Err(e) => {
                self.release_source();
                return Err(e);
            }
        };

        let shell = CommandShell::new(self.registry.clone(), self.config.shell.clone());
        let shutdown = tokio::select! {
            result = shell.run(input, &mut *output) => match result {
                Ok(ShellExit::ExitToken) => ShutdownReason::ExitCommand,
                Ok(ShellExit::EndOfInput) => ShutdownReason::EndOfInput,
                Err(e) => {
                    error!("Command input failed: {}", e);
                    ShutdownReason::InputError
                }
            },
            _ = close_requested.notified() => ShutdownReason::WindowClosed,
        };

        info!("Shutting down ({:?})", shutdown);
        running.store(false, Ordering::Release);
        let render = handle.join(self.config.render.join_timeout()).await;
        self.release_source();

        if shutdown != ShutdownReason::InputError {
            output
                .write_all(b"\nShutting down...\nAll resources released, program exited safely\n")
                .await?;
            output.flush().await?;
        }

        Ok(RunReport { render, shutdown })
    }

    fn release_source(&self) {
        match self.source.try_lock_for(self.config.render.join_timeout()) {
            Some(mut source) => source.close(),
            None => warn!("Frame source still busy; leaving it to be released on drop"),
        }
    }
}
