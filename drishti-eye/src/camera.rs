//! Frame sources: capture device plus preview window

use crate::config::CameraConfig;
use crate::error::VisionError;
use crate::frame::Frame;
use parking_lot::Mutex;
use std::sync::Arc;

/// What the display did with a presented frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    Shown,
    /// The user asked to close the window
    CloseRequested,
}

/// Capture device and display window. Must tolerate `close` before `start`
/// and repeated `close` calls.
pub trait FrameSource: Send {
    /// Open the device; failure aborts startup
    fn start(&mut self) -> Result<(), VisionError>;

    /// Next frame, or `None` when nothing could be read
    fn read(&mut self) -> Option<Frame>;

    /// Show a frame and poll the window for a close request
    fn present(&mut self, frame: &Frame) -> Presentation;

    /// Release the device and window
    fn close(&mut self);
}

/// Frame source shared between the render thread and the controller
pub type SharedFrameSource = Arc<Mutex<Box<dyn FrameSource>>>;

pub fn shared(source: Box<dyn FrameSource>) -> SharedFrameSource {
    Arc::new(Mutex::new(source))
}

/// Camera backend compiled into this build
pub fn default_source(config: &CameraConfig) -> Result<Box<dyn FrameSource>, VisionError> {
    #[cfg(feature = "camera")]
    {
        Ok(Box::new(opencv_camera::OpenCvCamera::new(config.clone())))
    }
    #[cfg(not(feature = "camera"))]
    {
        Err(VisionError::DeviceUnavailable(format!(
            "camera {} requested but this build has no capture backend (build with --features camera)",
            config.device_index
        )))
    }
}

#[cfg(feature = "camera")]
pub use opencv_camera::OpenCvCamera;

#[cfg(feature = "camera")]
mod opencv_camera {
    use super::{FrameSource, Presentation};
    use crate::config::CameraConfig;
    use crate::error::VisionError;
    use crate::frame::Frame;
    use opencv::{
        core::{Mat, CV_8UC3},
        highgui,
        prelude::*,
        videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
    };
    use tracing::{debug, info, warn};

    /// USB webcam with a HighGUI preview window
    pub struct OpenCvCamera {
        config: CameraConfig,
        capture: Option<VideoCapture>,
        window_open: bool,
    }

    impl OpenCvCamera {
        pub fn new(config: CameraConfig) -> Self {
            Self {
                config,
                capture: None,
                window_open: false,
            }
        }

        fn open(&self) -> Result<VideoCapture, VisionError> {
            let index = self.config.device_index;
            let mut capture = VideoCapture::new(index as i32, CAP_ANY)?;
            if !capture.is_opened()? {
                return Err(VisionError::DeviceUnavailable(format!("Camera {} failed to open", index)));
            }

            let (width, height) = self.config.resolution;
            capture.set(CAP_PROP_FRAME_WIDTH, width as f64)?;
            capture.set(CAP_PROP_FRAME_HEIGHT, height as f64)?;
            capture.set(CAP_PROP_FPS, self.config.fps as f64)?;
            Ok(capture)
        }

        fn grab(&mut self) -> Result<Option<Frame>, VisionError> {
            let Some(capture) = self.capture.as_mut() else {
                return Ok(None);
            };

            let mut mat = Mat::default();
            if !capture.read(&mut mat)? || mat.empty() {
                return Ok(None);
            }
            if mat.typ() != CV_8UC3 {
                return Err(VisionError::OpenCv(format!("Unsupported frame type {}", mat.typ())));
            }
            let mat = if mat.is_continuous() { mat } else { mat.try_clone()? };

            Frame::from_bgr(mat.cols() as u32, mat.rows() as u32, mat.data_bytes()?.to_vec()).map(Some)
        }

        fn show(&mut self, frame: &Frame) -> Result<Presentation, VisionError> {
            let mat = Mat::from_slice(frame.as_bytes())?
                .reshape(3, frame.height() as i32)?
                .try_clone()?;
            highgui::imshow(&self.config.window_name, &mat)?;
            self.window_open = true;

            let key = highgui::wait_key(1)?;
            if key & 0xFF == i32::from(b'q') {
                return Ok(Presentation::CloseRequested);
            }
            Ok(Presentation::Shown)
        }
    }

    impl FrameSource for OpenCvCamera {
        fn start(&mut self) -> Result<(), VisionError> {
            if self.capture.is_some() {
                return Ok(());
            }
            let capture = self.open().map_err(|e| match e {
                VisionError::DeviceUnavailable(_) => e,
                other => VisionError::DeviceUnavailable(format!(
                    "Failed to open camera {}: {}",
                    self.config.device_index, other
                )),
            })?;
            self.capture = Some(capture);

            let (width, height) = self.config.resolution;
            info!(
                "Camera {} initialized at {}x{} @ {}fps",
                self.config.device_index, width, height, self.config.fps
            );
            Ok(())
        }

        fn read(&mut self) -> Option<Frame> {
            match self.grab() {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("Camera read failed: {}", e);
                    None
                }
            }
        }

        fn present(&mut self, frame: &Frame) -> Presentation {
            match self.show(frame) {
                Ok(presentation) => presentation,
                Err(e) => {
                    warn!("Failed to display frame: {}", e);
                    Presentation::Shown
                }
            }
        }

        fn close(&mut self) {
            if let Some(mut capture) = self.capture.take() {
                if let Err(e) = capture.release() {
                    warn!("Failed to release camera: {}", e);
                }
                info!("Camera {} released", self.config.device_index);
            }
            if self.window_open {
                if let Err(e) = highgui::destroy_window(&self.config.window_name) {
                    debug!("Failed to destroy window: {}", e);
                }
                self.window_open = false;
            }
        }
    }

    impl Drop for OpenCvCamera {
        fn drop(&mut self) {
            self.close();
        }
    }
}
