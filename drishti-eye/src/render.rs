//! Render loop: acquire, annotate, present, pace

use crate::camera::{Presentation, SharedFrameSource};
use crate::config::RenderConfig;
use crate::error::VisionError;
use crate::processing::AnnotationPipeline;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Notify};
use tracing::{debug, error, info, warn};

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Iterations that presented a frame
    pub frames_rendered: u64,
    /// Iterations where the source had no frame
    pub idle_polls: u64,
    /// Iterations that panicked
    pub failed_iterations: u64,
}

enum Step {
    Presented,
    Idle,
    CloseRequested,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

pub struct RenderLoop {
    source: SharedFrameSource,
    pipeline: AnnotationPipeline,
    running: Arc<AtomicBool>,
    close_requested: Arc<Notify>,
    frame_interval: Duration,
    idle_backoff: Duration,
    error_backoff: Duration,
}

impl RenderLoop {
    pub fn new(source: SharedFrameSource, pipeline: AnnotationPipeline, config: &RenderConfig) -> Self {
        Self {
            source,
            pipeline,
            running: Arc::new(AtomicBool::new(false)),
            close_requested: Arc::new(Notify::new()),
            frame_interval: config.frame_interval(),
            idle_backoff: config.idle_backoff(),
            error_backoff: config.error_backoff(),
        }
    }

    /// Flag checked at the top of every iteration; clearing it stops the loop
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Notified once when the display asks to close
    pub fn close_signal(&self) -> Arc<Notify> {
        self.close_requested.clone()
    }

    fn iterate(&self) -> Step {
        let frame = self.source.lock().read();
        let Some(mut frame) = frame else {
            return Step::Idle;
        };

        self.pipeline.apply(&mut frame);

        match self.source.lock().present(&frame) {
            Presentation::Shown => Step::Presented,
            Presentation::CloseRequested => Step::CloseRequested,
        }
    }

    /// Loop on the calling thread until the running flag clears or the
    /// display requests a close
    pub fn run(&self) -> RenderStats {
        let mut stats = RenderStats::default();
        info!("Render loop started");

        while self.running.load(Ordering::Acquire) {
            let started = Instant::now();

            match panic::catch_unwind(AssertUnwindSafe(|| self.iterate())) {
                Ok(Step::Presented) => {
                    stats.frames_rendered += 1;
                    if let Some(rest) = self.frame_interval.checked_sub(started.elapsed()) {
                        thread::sleep(rest);
                    }
                }
                Ok(Step::Idle) => {
                    stats.idle_polls += 1;
                    thread::sleep(self.idle_backoff);
                }
                Ok(Step::CloseRequested) => {
                    stats.frames_rendered += 1;
                    info!("Display requested close");
                    self.running.store(false, Ordering::Release);
                    self.close_requested.notify_one();
                    break;
                }
                Err(payload) => {
                    stats.failed_iterations += 1;
                    error!("Render iteration failed: {}", panic_message(payload.as_ref()));
                    thread::sleep(self.error_backoff);
                }
            }
        }

        info!(
            "Render loop stopped after {} frame(s), {} idle poll(s), {} failure(s)",
            stats.frames_rendered, stats.idle_polls, stats.failed_iterations
        );
        stats
    }

    /// Start the loop on its own thread
    pub fn spawn(self) -> Result<RenderHandle, VisionError> {
        let (tx, rx) = oneshot::channel();
        self.running.store(true, Ordering::Release);
        let running = self.running.clone();

        thread::Builder::new()
            .name("drishti-render".to_string())
            .spawn(move || {
                let stats = self.run();
                if tx.send(stats).is_err() {
                    debug!("Render stats dropped; controller stopped waiting");
                }
            })
            .map_err(|e| {
                running.store(false, Ordering::Release);
                VisionError::Io(e)
            })?;

        Ok(RenderHandle { stats: rx })
    }
}

/// Completion handle of a spawned render loop
pub struct RenderHandle {
    stats: oneshot::Receiver<RenderStats>,
}

impl RenderHandle {
    /// Wait up to `timeout` for the loop to finish; `None` abandons it
    pub async fn join(self, timeout: Duration) -> Option<RenderStats> {
        match tokio::time::timeout(timeout, self.stats).await {
            Ok(Ok(stats)) => Some(stats),
            Ok(Err(_)) => {
                warn!("Render loop ended without reporting");
                None
            }
            Err(_) => {
                warn!("Render loop did not stop within {:?}; abandoning it", timeout);
                None
            }
        }
    }
}
