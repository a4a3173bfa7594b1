//! BlazeFace face locator using ONNX Runtime via `ort`.
//!
//! Finds the single most confident face box in a frame. The landmark
//! model runs on a crop around this box.

use std::path::Path;

use crate::detection::infrastructure::tensor_input::{
    sample_crop, sigmoid, CropRect, TensorLayout,
};
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Regressor values per anchor: box (4) + six keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

/// Face box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f64,
}

impl FaceBox {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

pub struct OnnxBlazefaceLocator {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceLocator {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        log::info!("Loaded face locator model {}", model_path.display());
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }

    /// Returns the highest scoring face above the confidence threshold.
    pub fn locate(&mut self, frame: &Frame) -> Result<Option<FaceBox>, Box<dyn std::error::Error>> {
        let input_tensor = sample_crop(
            frame,
            CropRect::full_frame(frame),
            INPUT_SIZE as usize,
            TensorLayout::Nchw,
        );

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        Ok(decode_best(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence,
            frame.width(),
            frame.height(),
        ))
    }
}

/// Picks the best anchor above `confidence` and decodes its box into frame
/// coordinates, clamped to the frame.
fn decode_best(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f64,
    fw: u32,
    fh: u32,
) -> Option<FaceBox> {
    let num_anchors = anchors.len().min(NUM_ANCHORS).min(score_data.len());

    let (best, score) = score_data[..num_anchors]
        .iter()
        .enumerate()
        .map(|(i, &raw)| (i, sigmoid(raw)))
        .filter(|&(i, _)| (i + 1) * REGRESSOR_STRIDE <= reg_data.len())
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    if (score as f64) < confidence {
        return None;
    }

    let anchor = anchors[best];
    let offset = best * REGRESSOR_STRIDE;
    let size = INPUT_SIZE as f32;
    let cx = anchor[0] + reg_data[offset] / size;
    let cy = anchor[1] + reg_data[offset + 1] / size;
    let w = reg_data[offset + 2] / size;
    let h = reg_data[offset + 3] / size;

    let face = FaceBox {
        x1: ((cx - w / 2.0) * fw as f32).max(0.0) as f64,
        y1: ((cy - h / 2.0) * fh as f32).max(0.0) as f64,
        x2: ((cx + w / 2.0) * fw as f32).min(fw as f32) as f64,
        y2: ((cy + h / 2.0) * fh as f32).min(fh as f32) as f64,
        score: score as f64,
    };

    if face.width() <= 0.0 || face.height() <= 0.0 {
        return None;
    }
    Some(face)
}

/// Generate BlazeFace anchors for the short-range model.
///
/// The short-range model uses two feature map sizes: 16×16 and 8×8,
/// with 2 and 6 anchors per cell respectively.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}
