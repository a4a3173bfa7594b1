use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::capture_source::{
    AccessCallback, AuthorizationStatus, CaptureSource, FrameCallback,
};
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::infrastructure::image_file_reader::ImageFileReader;
use crate::shared::frame::Frame;

/// Replays one image file as a live stream at a fixed rate.
///
/// Needs no camera permission. Each delivered frame carries a fresh
/// sequence number.
pub struct StillImageSource {
    path: PathBuf,
    interval: Duration,
    frame: Option<Frame>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl StillImageSource {
    pub fn new(path: &Path, fps: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            frame: None,
            stop_tx: None,
            worker: None,
        }
    }
}

impl CaptureSource for StillImageSource {
    fn authorization(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    fn request_access(&mut self, on_result: AccessCallback) {
        on_result(true);
    }

    fn open(&mut self) -> Result<(), CaptureError> {
        let frame = ImageFileReader::new()
            .read(&self.path)
            .map_err(|e| CaptureError::FailedToOpen(format!("{}: {e}", self.path.display())))?;
        log::info!(
            "Replaying {} ({}x{})",
            self.path.display(),
            frame.width(),
            frame.height()
        );
        self.frame = Some(frame);
        Ok(())
    }

    fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError> {
        if self.is_running() {
            return Ok(());
        }
        let frame = self
            .frame
            .clone()
            .ok_or_else(|| CaptureError::FailedToOpen("image not loaded".into()))?;

        let interval = self.interval;
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let worker = std::thread::Builder::new()
            .name("still-image-capture".into())
            .spawn(move || {
                let mut sequence = 0u64;
                loop {
                    on_frame(Frame::new(
                        frame.data().to_vec(),
                        frame.width(),
                        frame.height(),
                        frame.channels(),
                        sequence,
                    ));
                    sequence += 1;
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
            })
            .map_err(|e| CaptureError::FailedToOpen(e.to_string()))?;

        self.stop_tx = Some(stop_tx);
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the sender wakes the replay thread.
        self.stop_tx = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Still image capture thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for StillImageSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(dir: &Path) -> PathBuf {
        let path = dir.join("face.png");
        image::RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_always_authorized() {
        let mut source = StillImageSource::new(Path::new("unused.png"), 30);
        assert_eq!(source.authorization(), AuthorizationStatus::Authorized);

        let (tx, rx) = crossbeam_channel::bounded(1);
        source.request_access(Box::new(move |granted| tx.send(granted).unwrap()));
        assert!(rx.recv().unwrap());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let mut source = StillImageSource::new(Path::new("/nonexistent/face.png"), 30);
        assert!(matches!(source.open(), Err(CaptureError::FailedToOpen(_))));
    }

    #[test]
    fn test_delivers_frames_with_increasing_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = StillImageSource::new(&write_image(dir.path()), 200);
        source.open().unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        source
            .start(Box::new(move |frame| {
                let _ = tx.send(frame);
            }))
            .unwrap();
        assert!(source.is_running());

        let timeout = Duration::from_secs(5);
        let first = rx.recv_timeout(timeout).unwrap();
        let second = rx.recv_timeout(timeout).unwrap();
        source.stop();

        assert!(!source.is_running());
        assert_eq!((first.width(), first.height()), (8, 6));
        assert_eq!(first.pixel(0, 0), &[10, 20, 30]);
        assert_eq!(first.sequence(), 0);
        assert_eq!(second.sequence(), 1);
    }

    #[test]
    fn test_start_before_open_fails() {
        let mut source = StillImageSource::new(Path::new("face.png"), 30);
        assert!(source.start(Box::new(|_| {})).is_err());
        assert!(!source.is_running());
    }
}
