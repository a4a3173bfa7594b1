use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facemarks_core::capture::infrastructure::nokhwa_camera::CameraConfig;
use facemarks_core::detection::infrastructure::onnx_face_mesh_detector::MeshDetectorConfig;
use facemarks_core::pipeline::frame_pipeline::PipelineConfig;
use facemarks_core::shared::constants::{
    DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH, DEFAULT_FRAME_BUFFER_SIZE,
    DEFAULT_MESH_CONFIDENCE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Capture device index; `None` uses the first camera.
    pub camera: Option<u32>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frame_buffer_size: usize,
    pub mirror: bool,
    pub detector_model: Option<PathBuf>,
    pub mesh_model: Option<PathBuf>,
    /// Face presence threshold in percent.
    pub confidence: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera: None,
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS,
            frame_buffer_size: DEFAULT_FRAME_BUFFER_SIZE,
            mirror: true,
            detector_model: None,
            mesh_model: None,
            confidence: (DEFAULT_MESH_CONFIDENCE * 100.0).round() as u32,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Facemarks").join("settings.json"))
    }

    /// Loads the settings file, writing defaults on first launch so it can
    /// be edited. An existing file is never overwritten, even if unreadable.
    pub fn load_or_create() -> Self {
        Self::config_path()
            .map(|path| Self::load_or_create_at(&path))
            .unwrap_or_default()
    }

    fn load_or_create_at(path: &Path) -> Self {
        if path.exists() {
            return Self::load_from(path);
        }
        let settings = Self::default();
        settings.save_to(path);
        settings
    }

    /// Missing or unreadable files fall back to defaults.
    fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    log::warn!("Failed to save settings to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Failed to serialize settings: {e}"),
        }
    }

    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            device: self.camera,
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            frame_buffer_size: self.frame_buffer_size,
            mirror: self.mirror,
        }
    }

    pub fn detector_config(&self, bundled_dir: Option<PathBuf>) -> MeshDetectorConfig {
        MeshDetectorConfig {
            detector_model: self.detector_model.clone(),
            mesh_model: self.mesh_model.clone(),
            bundled_dir,
            confidence: self.confidence.min(100) as f64 / 100.0,
        }
    }
}
