pub const FACE_DETECTOR_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const FACE_MESH_MODEL_NAME: &str = "face_mesh.onnx";

/// Capture preset matching a qHD camera stream.
pub const DEFAULT_CAPTURE_WIDTH: u32 = 960;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 540;
pub const DEFAULT_CAPTURE_FPS: u32 = 30;

/// Frames kept waiting while the worker is busy.
pub const DEFAULT_FRAME_BUFFER_SIZE: usize = 1;

pub const DEFAULT_MESH_CONFIDENCE: f64 = 0.5;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
