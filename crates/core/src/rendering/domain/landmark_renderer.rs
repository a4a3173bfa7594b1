use thiserror::Error;

use crate::detection::domain::face_observation::FaceObservation;
use crate::shared::frame::Frame;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("cannot draw into a frame with {channels} channel(s); expected 3 or 4")]
    UnsupportedFormat { channels: u8 },
    #[error("frame data does not match its {width}x{height} dimensions")]
    BufferMismatch { width: u32, height: u32 },
}

/// Domain interface for drawing landmark contours over a frame.
///
/// Returns a new frame of the same dimensions; the source is left untouched.
pub trait LandmarkRenderer: Send {
    fn render(&self, frame: &Frame, face: &FaceObservation) -> Result<Frame, RenderError>;
}
