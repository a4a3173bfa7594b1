use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use facemarks_core::capture::infrastructure::nokhwa_camera::NokhwaCamera;
use facemarks_core::detection::infrastructure::onnx_face_mesh_detector::OnnxFaceMeshDetector;
use facemarks_core::pipeline::frame_pipeline::{FramePipeline, PipelineOutput};
use facemarks_core::pipeline::live_session::LiveSession;
use facemarks_core::rendering::infrastructure::cpu_landmark_renderer::CpuLandmarkRenderer;

use crate::settings::Settings;

/// Frames in flight to the UI; new frames are skipped while it is full.
const FRAME_CHANNEL_CAPACITY: usize = 2;

/// How often the session thread checks that the camera is still streaming.
const CAPTURE_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Messages sent from the session thread to the UI.
#[derive(Debug, Clone)]
pub enum SessionMessage {
    Frame {
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    },
    Error(String),
}

/// Keeps the session thread alive; dropping it stops capture and the pipeline.
pub struct SessionHandle {
    pub messages: Receiver<SessionMessage>,
    _stop: Sender<()>,
}

/// Spawn the live session: load models, open the camera and stream
/// annotated frames back over a channel.
pub fn spawn(settings: Settings) -> SessionHandle {
    let (tx, rx) = crossbeam_channel::bounded::<SessionMessage>(FRAME_CHANNEL_CAPACITY);
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

    thread::spawn(move || {
        if let Err(e) = run_session(&settings, &tx, &stop_rx) {
            log::error!("Live session failed: {e}");
            let _ = tx.send(SessionMessage::Error(e.to_string()));
        }
    });

    SessionHandle {
        messages: rx,
        _stop: stop_tx,
    }
}

fn run_session(
    settings: &Settings,
    tx: &Sender<SessionMessage>,
    stop_rx: &Receiver<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let detector = OnnxFaceMeshDetector::new(&settings.detector_config(bundled_model_dir()))?;

    let frame_tx = tx.clone();
    let pipeline = FramePipeline::new(
        settings.pipeline_config(),
        Box::new(detector),
        Box::new(CpuLandmarkRenderer::default()),
        Box::new(move |output| {
            if let Some(message) = frame_message(output) {
                let _ = frame_tx.try_send(message);
            }
        }),
    )?;

    let session = LiveSession::start(
        Box::new(NokhwaCamera::new(settings.camera_config())),
        pipeline,
    )?;

    let end = wait_for_end(stop_rx, || session.is_capturing());
    let stats = session.stop();
    log::info!("Live session ended: {stats}");
    match end {
        SessionEnd::Stopped => Ok(()),
        SessionEnd::CaptureLost => Err("Camera stopped delivering frames".into()),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Stopped,
    CaptureLost,
}

/// Blocks until the UI drops its handle or capture ends on its own.
fn wait_for_end(stop_rx: &Receiver<()>, is_capturing: impl Fn() -> bool) -> SessionEnd {
    loop {
        match stop_rx.recv_timeout(CAPTURE_CHECK_INTERVAL) {
            Err(RecvTimeoutError::Timeout) => {
                if !is_capturing() {
                    log::warn!("Capture ended while the session was running");
                    return SessionEnd::CaptureLost;
                }
            }
            _ => return SessionEnd::Stopped,
        }
    }
}

fn frame_message(output: PipelineOutput) -> Option<SessionMessage> {
    let frame = output.frame;
    match frame.to_rgba() {
        Ok(rgba) => Some(SessionMessage::Frame {
            width: frame.width(),
            height: frame.height(),
            rgba,
        }),
        Err(e) => {
            log::debug!("Skipping frame {}: {e}", frame.sequence());
            None
        }
    }
}

/// `models/` next to the executable, for packaged installs.
fn bundled_model_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}
