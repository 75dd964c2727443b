//! ONNX Runtime backend
//!
//! Expected model contracts:
//! - face: one `[1, 3, H, W]` RGB input in [0, 1]; output rows of
//!   `(x, y, w, h, score)` with a normalized box, shape `[N, 5]` or `[1, N, 5]`
//! - hand/pose: same input; output `[S, K, C]` or `[1, S, K, C]` with
//!   `C >= 2` and normalized `(x, y, ..)` per landmark

use crate::config::{ModelSpec, Thresholds};
use crate::error::VisionError;
use crate::models::{DetectionResult, FaceBox, InferenceModel, Landmark, LandmarkSet, ModelLoader};
use crate::plugin::PluginKind;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

fn ort_err(context: &str) -> impl FnOnce(ort::Error) -> VisionError + '_ {
    move |e| VisionError::Ort(format!("{}: {}", context, e))
}

/// Square network input side for a plugin kind
pub fn input_side(kind: PluginKind) -> u32 {
    match kind {
        PluginKind::Face => 128,
        PluginKind::Hand => 224,
        PluginKind::Pose => 256,
    }
}

/// Resize and lay out an RGB image as a normalized CHW tensor
pub fn to_chw_tensor(image: &RgbImage, side: u32) -> Vec<f32> {
    let resized = imageops::resize(image, side, side, FilterType::Triangle);
    let plane = (side * side) as usize;
    let mut data = vec![0.0f32; plane * 3];
    for (i, px) in resized.pixels().enumerate() {
        for c in 0..3 {
            data[c * plane + i] = px.0[c] as f32 / 255.0;
        }
    }
    data
}

/// Decode `(x, y, w, h, score)` rows into pixel boxes
pub fn decode_faces(
    shape: &[i64],
    data: &[f32],
    image_size: (u32, u32),
    thresholds: &Thresholds,
) -> Result<Vec<FaceBox>, VisionError> {
    let cols = shape.last().copied().unwrap_or(0);
    if cols < 5 {
        return Err(VisionError::Processing(format!("Unexpected face output shape {:?}", shape)));
    }
    let cols = cols as usize;
    let (width, height) = (image_size.0 as f32, image_size.1 as f32);

    let mut boxes: Vec<FaceBox> = data
        .chunks_exact(cols)
        .filter(|row| row[..5].iter().all(|v| v.is_finite()))
        .filter(|row| row[4] >= thresholds.min_detection_confidence)
        .map(|row| FaceBox {
            origin_x: (row[0] * width).round() as i32,
            origin_y: (row[1] * height).round() as i32,
            width: (row[2] * width).round() as i32,
            height: (row[3] * height).round() as i32,
            confidence: row[4],
        })
        .filter(|b| b.width > 0 && b.height > 0)
        .collect();

    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    if let Some(limit) = thresholds.max_results {
        boxes.truncate(limit as usize);
    }
    Ok(boxes)
}

/// Decode landmark tensors into normalized point sets
pub fn decode_landmarks(
    shape: &[i64],
    data: &[f32],
    thresholds: &Thresholds,
) -> Result<Vec<LandmarkSet>, VisionError> {
    let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    let (points, channels) = match dims.as_slice() {
        [.., k, c] if *c >= 2 && *k > 0 => (*k, *c),
        _ => {
            return Err(VisionError::Processing(format!(
                "Unexpected landmark output shape {:?}",
                shape
            )))
        }
    };

    let mut sets: Vec<LandmarkSet> = data
        .chunks_exact(points * channels)
        .map(|set| {
            set.chunks_exact(channels)
                .map(|p| Landmark::new(p[0], p[1]))
                .collect::<LandmarkSet>()
        })
        .filter(|set| set.iter().all(|l| l.x.is_finite() && l.y.is_finite()))
        .collect();

    if let Some(limit) = thresholds.max_results {
        sets.truncate(limit as usize);
    }
    Ok(sets)
}

/// One ONNX session bound to a plugin kind
pub struct OnnxModel {
    kind: PluginKind,
    thresholds: Thresholds,
    session: Mutex<Session>,
}

impl OnnxModel {
    pub fn new(kind: PluginKind, spec: &ModelSpec, thresholds: &Thresholds) -> Result<Self, VisionError> {
        let session = Session::builder()
            .map_err(ort_err("Failed to create session builder"))?
            .commit_from_file(&spec.path)
            .map_err(ort_err("Failed to load model"))?;

        info!("ONNX {:?} model loaded from {:?}", kind, spec.path);

        Ok(Self {
            kind,
            thresholds: thresholds.clone(),
            session: Mutex::new(session),
        })
    }
}

impl InferenceModel for OnnxModel {
    fn infer(&self, image: &RgbImage) -> Result<DetectionResult, VisionError> {
        let side = input_side(self.kind);
        let input = Tensor::from_array(([1usize, 3, side as usize, side as usize], to_chw_tensor(image, side)))
            .map_err(ort_err("Failed to create input tensor"))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(ort_err("Inference failed"))?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(ort_err("Failed to extract output tensor"))?;
        debug!("{:?} output shape: {:?}", self.kind, shape);

        match self.kind {
            PluginKind::Face => {
                decode_faces(shape, data, image.dimensions(), &self.thresholds).map(DetectionResult::Faces)
            }
            PluginKind::Hand | PluginKind::Pose => {
                decode_landmarks(shape, data, &self.thresholds).map(DetectionResult::Landmarks)
            }
        }
    }
}

/// Loads every plugin kind through ONNX Runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxModelLoader;

impl ModelLoader for OnnxModelLoader {
    fn load(
        &self,
        kind: PluginKind,
        spec: &ModelSpec,
        thresholds: &Thresholds,
    ) -> Result<Arc<dyn InferenceModel>, VisionError> {
        Ok(Arc::new(OnnxModel::new(kind, spec, thresholds)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chw_layout() {
        let mut image = RgbImage::new(2, 2);
        for px in image.pixels_mut() {
            px.0 = [255, 0, 51];
        }
        let data = to_chw_tensor(&image, 2);
        assert_eq!(data.len(), 12);
        assert!(data[..4].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(data[4..8].iter().all(|&v| v == 0.0));
        assert!(data[8..].iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_decode_faces_filters_and_scales() {
        let data = [
            0.1, 0.2, 0.5, 0.5, 0.9, //
            0.0, 0.0, 0.1, 0.1, 0.2, //
        ];
        let boxes = decode_faces(&[1, 2, 5], &data, (200, 100), &Thresholds::default()).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!((boxes[0].origin_x, boxes[0].origin_y), (20, 20));
        assert_eq!((boxes[0].width, boxes[0].height), (100, 50));
    }

    #[test]
    fn test_decode_landmarks_groups_sets() {
        let data: Vec<f32> = (0..2 * 3 * 3).map(|v| v as f32 / 100.0).collect();
        let thresholds = Thresholds {
            max_results: Some(1),
            ..Thresholds::default()
        };
        let sets = decode_landmarks(&[1, 2, 3, 3], &data, &thresholds).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].len(), 3);
        assert_eq!(sets[0][1], Landmark::new(0.03, 0.04));
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        assert!(decode_faces(&[1, 4], &[0.0; 4], (10, 10), &Thresholds::default()).is_err());
        assert!(decode_landmarks(&[5], &[0.0; 5], &Thresholds::default()).is_err());
    }
}
