//! Native camera capture through `nokhwa`.
//!
//! `nokhwa::Camera` is not `Send`, so the camera is created, streamed and
//! closed entirely on the capture thread; `open` only validates the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::capture_source::{
    AccessCallback, AuthorizationStatus, CaptureSource, FrameCallback,
};
use crate::shared::constants::{
    DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
};
use crate::shared::frame::Frame;

/// Consecutive frame read failures before the capture thread gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 30;

/// Requested capture device and format. The closest supported format wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CameraConfig {
    /// Device index; `None` picks the first enumerated device.
    pub device: Option<u32>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS,
        }
    }
}

/// A capture device as reported by the platform backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraDescriptor {
    pub index: String,
    pub name: String,
    pub description: String,
}

/// Lists the capture devices the native backend can see.
pub fn list_cameras() -> Result<Vec<CameraDescriptor>, CaptureError> {
    let cameras =
        nokhwa::query(ApiBackend::Auto).map_err(|e| CaptureError::FailedToOpen(e.to_string()))?;
    Ok(cameras
        .iter()
        .map(|info| CameraDescriptor {
            index: info.index().to_string(),
            name: info.human_name(),
            description: info.description().to_string(),
        })
        .collect())
}

pub struct NokhwaCamera {
    config: CameraConfig,
    index: Option<CameraIndex>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl NokhwaCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            index: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Camera capture thread panicked");
            }
        }
    }
}

impl CaptureSource for NokhwaCamera {
    fn authorization(&self) -> AuthorizationStatus {
        if nokhwa::nokhwa_check() {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::NotDetermined
        }
    }

    fn request_access(&mut self, on_result: AccessCallback) {
        let pending = Mutex::new(Some(on_result));
        nokhwa::nokhwa_initialize(move |granted| {
            let callback = pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(callback) = callback {
                callback(granted);
            }
        });
    }

    fn open(&mut self) -> Result<(), CaptureError> {
        let cameras = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CaptureError::FailedToOpen(e.to_string()))?;
        let available: Vec<CameraIndex> = cameras.iter().map(|c| c.index().clone()).collect();
        let index = select_index(&available, self.config.device)?;
        log::info!(
            "Using camera {index} ({}x{} @ {} fps requested)",
            self.config.width,
            self.config.height,
            self.config.fps
        );
        self.index = Some(index);
        Ok(())
    }

    fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError> {
        if self.is_running() {
            return Ok(());
        }
        let index = self
            .index
            .clone()
            .ok_or_else(|| CaptureError::FailedToOpen("camera not opened".into()))?;
        self.join_worker();

        let config = self.config;
        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        running.store(true, Ordering::SeqCst);

        let worker = std::thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || {
                let mut camera = match open_stream(index, &config) {
                    Ok(camera) => {
                        let _ = ready_tx.send(Ok(()));
                        camera
                    }
                    Err(e) => {
                        running.store(false, Ordering::SeqCst);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                capture_loop(&mut camera, &running, &on_frame);
                running.store(false, Ordering::SeqCst);
                if let Err(e) = camera.stop_stream() {
                    log::warn!("Failed to stop camera stream: {e}");
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::FailedToOpen(e.to_string())
            })?;
        self.worker = Some(worker);

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.join_worker();
                Err(e)
            }
            Err(_) => {
                self.join_worker();
                Err(CaptureError::FailedToOpen(
                    "capture thread exited during startup".into(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.join_worker();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for NokhwaCamera {
    fn drop(&mut self) {
        self.stop();
    }
}

fn select_index(available: &[CameraIndex], wanted: Option<u32>) -> Result<CameraIndex, CaptureError> {
    match wanted {
        Some(i) => {
            let index = CameraIndex::Index(i);
            if available.contains(&index) {
                Ok(index)
            } else {
                Err(CaptureError::FailedToOpen(format!(
                    "camera {i} not found ({} available)",
                    available.len()
                )))
            }
        }
        None => available
            .first()
            .cloned()
            .ok_or_else(|| CaptureError::FailedToOpen("no capture device found".into())),
    }
}

fn open_stream(index: CameraIndex, config: &CameraConfig) -> Result<Camera, CaptureError> {
    let format = CameraFormat::new(
        Resolution::new(config.width, config.height),
        FrameFormat::MJPEG,
        config.fps,
    );
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));
    let mut camera =
        Camera::new(index, requested).map_err(|e| CaptureError::FailedToOpen(e.to_string()))?;
    camera
        .open_stream()
        .map_err(|e| CaptureError::FailedToOpen(e.to_string()))?;
    log::debug!("Camera stream open: {:?}", camera.camera_format());
    Ok(camera)
}

fn capture_loop(camera: &mut Camera, running: &AtomicBool, on_frame: &FrameCallback) {
    let mut sequence: u64 = 0;
    let mut failures = 0;

    while running.load(Ordering::SeqCst) {
        let decoded = camera
            .frame()
            .and_then(|buffer| buffer.decode_image::<RgbFormat>());
        match decoded {
            Ok(img) => {
                failures = 0;
                let (width, height) = img.dimensions();
                on_frame(Frame::new(img.into_raw(), width, height, 3, sequence));
                sequence += 1;
            }
            Err(e) => {
                failures += 1;
                log::debug!("Camera frame read failed: {e}");
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    log::warn!("Camera stopped delivering frames: {e}");
                    break;
                }
            }
        }
    }
}
