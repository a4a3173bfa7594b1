use std::path::Path;

use crate::shared::frame::Frame;

/// Loads a still image as a single frame.
pub trait ImageReader: Send {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;
}
