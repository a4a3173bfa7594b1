use crate::capture::capture_manager::CaptureManager;
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::capture_source::CaptureSource;
use crate::pipeline::frame_pipeline::{FramePipeline, PipelineState};
use crate::pipeline::pipeline_stats::PipelineStats;

/// A running camera → pipeline connection.
///
/// Capture frames go straight into the pipeline buffer from the capture
/// thread. Dropping the session stops capture first, then the pipeline.
pub struct LiveSession {
    capture: CaptureManager,
    pipeline: FramePipeline,
}

impl LiveSession {
    /// Authorizes and opens `source`, then starts feeding `pipeline`.
    pub fn start(
        source: Box<dyn CaptureSource>,
        pipeline: FramePipeline,
    ) -> Result<Self, CaptureError> {
        let mut capture = CaptureManager::new(source);
        capture.setup()?;

        let submitter = pipeline.submitter();
        capture.start(Box::new(move |frame| submitter.submit(frame)))?;

        Ok(Self { capture, pipeline })
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_running()
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    pub fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    /// Stops capture and the pipeline, returning the final counters.
    pub fn stop(self) -> PipelineStats {
        let Self { capture, pipeline } = self;
        drop(capture);
        pipeline.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_source::{
        AccessCallback, AuthorizationStatus, FrameCallback,
    };
    use crate::capture::infrastructure::still_image_source::StillImageSource;
    use crate::detection::domain::face_observation::{FaceObservation, LandmarkRegion};
    use crate::detection::domain::landmark_detector::LandmarkDetector;
    use crate::pipeline::frame_pipeline::{OutputHandler, PipelineConfig};
    use crate::rendering::infrastructure::cpu_landmark_renderer::CpuLandmarkRenderer;
    use crate::shared::frame::Frame;
    use crate::shared::geometry::{NormalizedRect, Point2};
    use std::path::Path;
    use std::time::Duration;

    struct FixedDetector;

    impl LandmarkDetector for FixedDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Option<FaceObservation>, Box<dyn std::error::Error>> {
            Ok(Some(
                FaceObservation::new(
                    NormalizedRect {
                        x: 0.1,
                        y: 0.1,
                        width: 0.8,
                        height: 0.8,
                    },
                    0.9,
                )
                .with_region(
                    LandmarkRegion::LeftEye,
                    vec![Point2::new(0.3, 0.3), Point2::new(0.4, 0.3), Point2::new(0.35, 0.4)],
                ),
            ))
        }
    }

    struct DeniedSource;

    impl CaptureSource for DeniedSource {
        fn authorization(&self) -> AuthorizationStatus {
            AuthorizationStatus::Denied
        }
        fn request_access(&mut self, on_result: AccessCallback) {
            on_result(false);
        }
        fn open(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }
        fn start(&mut self, _on_frame: FrameCallback) -> Result<(), CaptureError> {
            Ok(())
        }
        fn stop(&mut self) {}
        fn is_running(&self) -> bool {
            false
        }
    }

    fn pipeline(handler: OutputHandler) -> FramePipeline {
        FramePipeline::new(
            PipelineConfig::default(),
            Box::new(FixedDetector),
            Box::new(CpuLandmarkRenderer::default()),
            handler,
        )
        .unwrap()
    }

    #[test]
    fn test_frames_flow_from_source_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        image::RgbImage::from_pixel(64, 48, image::Rgb([90, 90, 90]))
            .save(&path)
            .unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let session = LiveSession::start(
            Box::new(StillImageSource::new(&path, 100)),
            pipeline(Box::new(move |output| {
                let _ = tx.send(output);
            })),
        )
        .unwrap();
        assert!(session.is_capturing());

        let output = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!((output.frame.width(), output.frame.height()), (64, 48));

        let stats = session.stop();
        assert!(stats.emitted >= 1);
        assert_eq!(
            stats.submitted,
            stats.dropped + stats.processed + stats.discarded
        );
    }

    #[test]
    fn test_denied_access_fails_to_start() {
        let result = LiveSession::start(Box::new(DeniedSource), pipeline(Box::new(|_| {})));
        assert!(matches!(result, Err(CaptureError::AuthorizationFailure)));
    }

    #[test]
    fn test_missing_image_fails_to_open() {
        let result = LiveSession::start(
            Box::new(StillImageSource::new(Path::new("/nonexistent/face.png"), 30)),
            pipeline(Box::new(|_| {})),
        );
        assert!(matches!(result, Err(CaptureError::FailedToOpen(_))));
    }
}
