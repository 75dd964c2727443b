//! Fakes shared by the integration tests

#![allow(dead_code)]

use drishti_eye::config::{ModelSpec, Thresholds};
use drishti_eye::models::{DetectionResult, FaceBox, InferenceModel, Landmark, ModelLoader};
use drishti_eye::{Frame, FrameSource, PluginKind, Presentation, VisionError};
use image::RgbImage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Observable state of a `FakeSource`, kept after the source moves into a controller
#[derive(Default)]
pub struct SourceTally {
    pub started: AtomicBool,
    pub closed: AtomicBool,
    pub presented: AtomicUsize,
    /// Per presented frame, whether the watched color appeared in it
    pub marked: Mutex<Vec<bool>>,
}

impl SourceTally {
    pub fn presented(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }

    /// Poll until `count` frames were presented
    pub async fn wait_for_presented(&self, count: usize) {
        while self.presented() < count {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    pub fn marked(&self) -> Vec<bool> {
        self.marked.lock().clone()
    }
}

/// Emits a fixed number of frames, then nothing
pub struct FakeSource {
    remaining: usize,
    frame: Frame,
    fail_start: bool,
    close_after: Option<usize>,
    present_delay: Duration,
    watch_color: Option<[u8; 3]>,
    tally: Arc<SourceTally>,
}

impl FakeSource {
    pub fn new(frames: usize) -> (Self, Arc<SourceTally>) {
        let tally = Arc::new(SourceTally::default());
        let source = Self {
            remaining: frames,
            frame: Frame::filled(64, 48, [40, 40, 40]),
            fail_start: false,
            close_after: None,
            present_delay: Duration::ZERO,
            watch_color: None,
            tally: tally.clone(),
        };
        (source, tally)
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Report a window close request on the n-th presented frame
    pub fn close_after(mut self, presented: usize) -> Self {
        self.close_after = Some(presented);
        self
    }

    pub fn slow_present(mut self, delay: Duration) -> Self {
        self.present_delay = delay;
        self
    }

    /// Record in the tally whether each presented frame contains `color`
    pub fn watch_color(mut self, color: [u8; 3]) -> Self {
        self.watch_color = Some(color);
        self
    }
}

impl FrameSource for FakeSource {
    fn start(&mut self) -> Result<(), VisionError> {
        if self.fail_start {
            return Err(VisionError::DeviceUnavailable("fake camera offline".to_string()));
        }
        self.tally.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self) -> Option<Frame> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.frame.clone())
    }

    fn present(&mut self, frame: &Frame) -> Presentation {
        std::thread::sleep(self.present_delay);
        if let Some(color) = self.watch_color {
            let found = (0..frame.height() as i32)
                .any(|y| (0..frame.width() as i32).any(|x| frame.pixel(x, y) == Some(color)));
            self.tally.marked.lock().push(found);
        }
        let presented = self.tally.presented.fetch_add(1, Ordering::SeqCst) + 1;
        if Some(presented) == self.close_after {
            Presentation::CloseRequested
        } else {
            Presentation::Shown
        }
    }

    fn close(&mut self) {
        self.tally.closed.store(true, Ordering::SeqCst);
    }
}

/// Returns the same result for every frame
pub struct CannedModel(pub DetectionResult);

impl InferenceModel for CannedModel {
    fn infer(&self, _image: &RgbImage) -> Result<DetectionResult, VisionError> {
        Ok(self.0.clone())
    }
}

pub fn face(x: i32, y: i32, w: i32, h: i32, confidence: f32) -> FaceBox {
    FaceBox {
        origin_x: x,
        origin_y: y,
        width: w,
        height: h,
        confidence,
    }
}

pub fn canned_faces(boxes: Vec<FaceBox>) -> Arc<dyn InferenceModel> {
    Arc::new(CannedModel(DetectionResult::Faces(boxes)))
}

pub fn canned_landmarks(points: &[(f32, f32)]) -> Arc<dyn InferenceModel> {
    let set = points.iter().map(|&(x, y)| Landmark::new(x, y)).collect();
    Arc::new(CannedModel(DetectionResult::Landmarks(vec![set])))
}

/// Backend that is present but rejects every model file
pub struct BrokenLoader;

impl ModelLoader for BrokenLoader {
    fn load(
        &self,
        kind: PluginKind,
        _spec: &ModelSpec,
        _thresholds: &Thresholds,
    ) -> Result<Arc<dyn InferenceModel>, VisionError> {
        Err(VisionError::Model(format!("unreadable {:?} model", kind)))
    }
}

/// Hands out canned models so every kind loads successfully
#[derive(Default)]
pub struct CannedLoader {
    pub loads: AtomicUsize,
}

impl ModelLoader for CannedLoader {
    fn load(
        &self,
        kind: PluginKind,
        _spec: &ModelSpec,
        _thresholds: &Thresholds,
    ) -> Result<Arc<dyn InferenceModel>, VisionError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(match kind {
            PluginKind::Face => canned_faces(vec![face(4, 14, 20, 20, 0.93)]),
            PluginKind::Hand | PluginKind::Pose => canned_landmarks(&[(0.2, 0.5), (0.8, 0.5)]),
        })
    }
}
