use crate::detection::domain::face_observation::FaceObservation;
use crate::shared::frame::Frame;

/// Domain interface for facial landmark detection.
///
/// Returns the landmarks of at most one face. Inference sessions need
/// exclusive access, hence `&mut self`.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame)
        -> Result<Option<FaceObservation>, Box<dyn std::error::Error>>;
}
