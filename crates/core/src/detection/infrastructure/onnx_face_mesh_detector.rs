//! Two-stage landmark detector: BlazeFace finds the face, a face-mesh model
//! places 468 (or 478, with irises) points on a square crop around it.

use std::path::{Path, PathBuf};

use crate::detection::domain::face_observation::FaceObservation;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::detection::infrastructure::mesh_topology::{observation_from_mesh, MESH_POINTS};
use crate::detection::infrastructure::onnx_blazeface_locator::{FaceBox, OnnxBlazefaceLocator};
use crate::detection::infrastructure::tensor_input::{sample_crop, sigmoid, CropRect, TensorLayout};
use crate::shared::constants::{
    DEFAULT_MESH_CONFIDENCE, FACE_DETECTOR_MODEL_NAME, FACE_MESH_MODEL_NAME,
};
use crate::shared::frame::Frame;
use crate::shared::geometry::{NormalizedRect, Point2};
use crate::shared::model_resolver;

/// Face-mesh model input resolution.
const MESH_INPUT_SIZE: usize = 192;

/// Crop side relative to the longer side of the located face box.
const CROP_SCALE: f64 = 1.5;

/// Model locations and the face-presence threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshDetectorConfig {
    pub detector_model: Option<PathBuf>,
    pub mesh_model: Option<PathBuf>,
    pub bundled_dir: Option<PathBuf>,
    pub confidence: f64,
}

impl Default for MeshDetectorConfig {
    fn default() -> Self {
        Self {
            detector_model: None,
            mesh_model: None,
            bundled_dir: None,
            confidence: DEFAULT_MESH_CONFIDENCE,
        }
    }
}

pub struct OnnxFaceMeshDetector {
    locator: OnnxBlazefaceLocator,
    session: ort::session::Session,
    layout: TensorLayout,
    confidence: f64,
}

impl OnnxFaceMeshDetector {
    /// Resolves both models and opens their inference sessions.
    pub fn new(config: &MeshDetectorConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if !(0.0..=1.0).contains(&config.confidence) {
            return Err(format!(
                "confidence must be between 0 and 1, got {}",
                config.confidence
            )
            .into());
        }

        let bundled = config.bundled_dir.as_deref();
        let detector_path = model_resolver::resolve(
            FACE_DETECTOR_MODEL_NAME,
            config.detector_model.as_deref(),
            bundled,
        )?;
        let mesh_path =
            model_resolver::resolve(FACE_MESH_MODEL_NAME, config.mesh_model.as_deref(), bundled)?;

        let locator = OnnxBlazefaceLocator::new(&detector_path, config.confidence)?;
        Self::with_locator(locator, &mesh_path, config.confidence)
    }

    fn with_locator(
        locator: OnnxBlazefaceLocator,
        mesh_path: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(mesh_path)?;

        // Converted MediaPipe models are usually channels-last; trust the
        // declared shape when it says otherwise.
        let layout = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    TensorLayout::from_shape(shape)
                } else {
                    None
                }
            })
            .unwrap_or(TensorLayout::Nhwc);

        log::info!(
            "Loaded face mesh model {} ({layout:?})",
            mesh_path.display()
        );

        Ok(Self {
            locator,
            session,
            layout,
            confidence,
        })
    }
}

impl LandmarkDetector for OnnxFaceMeshDetector {
    fn detect(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<FaceObservation>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(None);
        }
        if frame.channels() < 3 {
            return Err(format!("expected an RGB frame, got {} channel(s)", frame.channels()).into());
        }

        let face = match self.locator.locate(frame)? {
            Some(face) => face,
            None => return Ok(None),
        };

        let crop = CropRect::square_around(face.x1, face.y1, face.x2, face.y2, CROP_SCALE);
        let input_tensor = sample_crop(frame, crop, MESH_INPUT_SIZE, self.layout);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Landmarks: [1, 1, 1, 1404] or [1, 1434]; presence: one logit.
        let mut landmarks: Option<Vec<f32>> = None;
        let mut presence: Option<f32> = None;
        for i in 0..outputs.len() {
            let array = outputs[i].try_extract_array::<f32>()?;
            let values = array.as_slice().ok_or("Cannot get face mesh output slice")?;
            if values.len() >= MESH_POINTS * 3 && landmarks.is_none() {
                landmarks = Some(values.to_vec());
            } else if values.len() == 1 && presence.is_none() {
                presence = Some(values[0]);
            }
        }
        let landmarks = landmarks.ok_or("Face mesh model produced no landmark output")?;

        let observation = observation_from_outputs(
            &landmarks,
            presence,
            &face,
            crop,
            frame.width(),
            frame.height(),
            self.confidence,
        )?;
        if observation.is_none() {
            log::trace!("Frame {}: face presence below threshold", frame.sequence());
        }
        Ok(observation)
    }
}

/// Turns raw mesh outputs into an observation in normalized frame
/// coordinates. `None` when the presence score is below `confidence`.
fn observation_from_outputs(
    landmarks: &[f32],
    presence_logit: Option<f32>,
    face: &FaceBox,
    crop: CropRect,
    fw: u32,
    fh: u32,
    confidence: f64,
) -> Result<Option<FaceObservation>, String> {
    // Models without a presence head inherit the locator's score.
    let score = presence_logit
        .map(|logit| sigmoid(logit) as f64)
        .unwrap_or(face.score);
    if score < confidence {
        return Ok(None);
    }

    let (w, h) = (fw as f64, fh as f64);
    let points: Vec<Point2> = landmarks
        .chunks_exact(3)
        .map(|xyz| {
            let (x, y) = crop.to_frame(xyz[0] as f64, xyz[1] as f64, MESH_INPUT_SIZE);
            Point2::new(x / w, y / h)
        })
        .collect();

    let bounds = NormalizedRect {
        x: face.x1 / w,
        y: face.y1 / h,
        width: face.width() / w,
        height: face.height() / h,
    };

    observation_from_mesh(&points, bounds, score).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_observation::LandmarkRegion;
    use crate::detection::infrastructure::mesh_topology::REFINED_MESH_POINTS;
    use approx::assert_relative_eq;

    fn face() -> FaceBox {
        FaceBox {
            x1: 40.0,
            y1: 20.0,
            x2: 120.0,
            y2: 100.0,
            score: 0.8,
        }
    }

    fn crop() -> CropRect {
        let f = face();
        CropRect::square_around(f.x1, f.y1, f.x2, f.y2, CROP_SCALE)
    }

    /// Every mesh point at the center of the model input.
    fn centered_mesh(points: usize) -> Vec<f32> {
        let c = MESH_INPUT_SIZE as f32 / 2.0;
        (0..points).flat_map(|_| [c, c, 0.0]).collect()
    }

    #[test]
    fn test_points_map_back_to_normalized_frame() {
        let obs = observation_from_outputs(
            &centered_mesh(MESH_POINTS),
            Some(5.0),
            &face(),
            crop(),
            200,
            100,
            0.5,
        )
        .unwrap()
        .unwrap();

        // Crop center is the face box center: (80, 60) in a 200x100 frame.
        let p = obs.region(LandmarkRegion::OuterLips).unwrap()[0];
        assert_relative_eq!(p.x, 0.4, epsilon = 1e-9);
        assert_relative_eq!(p.y, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn test_bounds_are_normalized_face_box() {
        let obs = observation_from_outputs(
            &centered_mesh(MESH_POINTS),
            Some(5.0),
            &face(),
            crop(),
            200,
            100,
            0.5,
        )
        .unwrap()
        .unwrap();
        let b = obs.bounds();
        assert_relative_eq!(b.x, 0.2);
        assert_relative_eq!(b.y, 0.2);
        assert_relative_eq!(b.width, 0.4);
        assert_relative_eq!(b.height, 0.8);
    }

    #[test]
    fn test_low_presence_yields_none() {
        let result = observation_from_outputs(
            &centered_mesh(MESH_POINTS),
            Some(-3.0),
            &face(),
            crop(),
            200,
            100,
            0.5,
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_missing_presence_uses_locator_score() {
        let obs = observation_from_outputs(
            &centered_mesh(MESH_POINTS),
            None,
            &face(),
            crop(),
            200,
            100,
            0.5,
        )
        .unwrap()
        .unwrap();
        assert_relative_eq!(obs.confidence(), 0.8);
    }

    #[test]
    fn test_refined_mesh_includes_pupils() {
        let obs = observation_from_outputs(
            &centered_mesh(REFINED_MESH_POINTS),
            Some(5.0),
            &face(),
            crop(),
            200,
            100,
            0.5,
        )
        .unwrap()
        .unwrap();
        assert!(obs.region(LandmarkRegion::LeftPupil).is_some());
        assert!(obs.region(LandmarkRegion::RightPupil).is_some());
    }

    #[test]
    fn test_short_landmark_output_errors() {
        let result =
            observation_from_outputs(&centered_mesh(10), Some(5.0), &face(), crop(), 200, 100, 0.5);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_uses_default_confidence() {
        let config = MeshDetectorConfig::default();
        assert_eq!(config.confidence, DEFAULT_MESH_CONFIDENCE);
        assert!(config.detector_model.is_none());
    }
}
