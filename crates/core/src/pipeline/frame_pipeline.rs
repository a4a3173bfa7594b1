//! Single-flight frame pipeline: a bounded drop-oldest buffer feeding one
//! worker thread that runs detection and rendering.
//!
//! Producers (usually a capture thread) only touch the buffer under a mutex
//! and signal the worker; all inference happens on the worker. When frames
//! arrive faster than they can be processed the oldest queued frame is
//! evicted, never the one in flight.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use thiserror::Error;

use crate::detection::domain::face_observation::FaceObservation;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::pipeline::frame_buffer::FrameBuffer;
use crate::pipeline::pipeline_stats::PipelineStats;
use crate::rendering::domain::landmark_renderer::LandmarkRenderer;
use crate::shared::constants::DEFAULT_FRAME_BUFFER_SIZE;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("frame buffer size must be at least 1")]
    ZeroCapacity,
    #[error("failed to start pipeline worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Configuration for a frame pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Frames held while the worker is busy.
    pub frame_buffer_size: usize,
    /// Flip frames horizontally before detection, like a mirror.
    pub mirror: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_buffer_size: DEFAULT_FRAME_BUFFER_SIZE,
            mirror: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Processing,
}

/// An annotated frame and the observation it was drawn from.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    pub frame: Frame,
    pub observation: FaceObservation,
}

/// Receives each output on the worker thread.
pub type OutputHandler = Box<dyn Fn(PipelineOutput) + Send>;

struct Inner {
    buffer: FrameBuffer<Frame>,
    processing: bool,
    shutdown: bool,
    stats: PipelineStats,
}

struct Shared {
    inner: Mutex<Inner>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, frame: Frame) {
        let mut inner = self.lock();
        if inner.shutdown {
            log::trace!("Pipeline stopped, ignoring frame {}", frame.sequence());
            return;
        }
        inner.stats.submitted += 1;
        if let Some(evicted) = inner.buffer.push(frame) {
            inner.stats.dropped += 1;
            log::trace!("Dropped frame {}", evicted.sequence());
        }
        drop(inner);
        self.wake.notify_one();
    }
}

/// Cloneable handle that can only submit frames.
///
/// Capture callbacks hold one of these so the pipeline itself stays with
/// its owner. Frames submitted after the pipeline shut down are ignored.
#[derive(Clone)]
pub struct FrameSubmitter {
    shared: Arc<Shared>,
}

impl FrameSubmitter {
    pub fn submit(&self, frame: Frame) {
        self.shared.submit(frame);
    }
}

pub struct FramePipeline {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl FramePipeline {
    /// Starts the worker thread. It idles until the first frame arrives.
    pub fn new(
        config: PipelineConfig,
        detector: Box<dyn LandmarkDetector>,
        renderer: Box<dyn LandmarkRenderer>,
        on_output: OutputHandler,
    ) -> Result<Self, PipelineError> {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                buffer: FrameBuffer::new(config.frame_buffer_size)?,
                processing: false,
                shutdown: false,
                stats: PipelineStats::default(),
            }),
            wake: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("frame-pipeline".into())
            .spawn(move || {
                run_worker(&worker_shared, config.mirror, detector, renderer, on_output)
            })
            .map_err(PipelineError::Spawn)?;

        log::info!(
            "Frame pipeline started (buffer {}, mirror {})",
            config.frame_buffer_size,
            config.mirror
        );

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Queues a frame, evicting the oldest queued frame when the buffer is full.
    pub fn submit(&self, frame: Frame) {
        self.shared.submit(frame);
    }

    pub fn submitter(&self) -> FrameSubmitter {
        FrameSubmitter {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> PipelineState {
        if self.shared.lock().processing {
            PipelineState::Processing
        } else {
            PipelineState::Idle
        }
    }

    /// Sequence numbers of queued frames, oldest first.
    pub fn pending(&self) -> Vec<u64> {
        self.shared
            .lock()
            .buffer
            .iter()
            .map(Frame::sequence)
            .collect()
    }

    pub fn stats(&self) -> PipelineStats {
        self.shared.lock().stats
    }

    /// Stops the worker after its in-flight frame and returns the final
    /// counters. Queued frames are discarded.
    pub fn shutdown(mut self) -> PipelineStats {
        self.stop()
    }

    fn stop(&mut self) -> PipelineStats {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Frame pipeline worker panicked");
            }
            let stats = self.shared.lock().stats;
            log::info!("Frame pipeline stopped: {stats}");
        }
        self.shared.lock().stats
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Outcome {
    NoFace,
    Failed,
    Emitted,
}

fn run_worker(
    shared: &Shared,
    mirror: bool,
    mut detector: Box<dyn LandmarkDetector>,
    renderer: Box<dyn LandmarkRenderer>,
    on_output: OutputHandler,
) {
    loop {
        let frame = {
            let mut inner = shared.lock();
            loop {
                if inner.shutdown {
                    inner.processing = false;
                    let discarded = inner.buffer.clear() as u64;
                    inner.stats.discarded += discarded;
                    return;
                }
                if let Some(frame) = inner.buffer.pop() {
                    inner.processing = true;
                    inner.stats.processed += 1;
                    break frame;
                }
                inner.processing = false;
                inner = shared
                    .wake
                    .wait(inner)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        // A panic in the detector, renderer or handler fails only this frame.
        let sequence = frame.sequence();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            process_frame(
                frame,
                mirror,
                detector.as_mut(),
                renderer.as_ref(),
                &on_output,
            )
        }))
        .unwrap_or_else(|_| {
            log::error!("Frame {sequence}: processing panicked");
            Outcome::Failed
        });

        let mut inner = shared.lock();
        match outcome {
            Outcome::NoFace => inner.stats.without_face += 1,
            Outcome::Failed => inner.stats.failed += 1,
            Outcome::Emitted => inner.stats.emitted += 1,
        }
    }
}

fn process_frame(
    frame: Frame,
    mirror: bool,
    detector: &mut dyn LandmarkDetector,
    renderer: &dyn LandmarkRenderer,
    on_output: &OutputHandler,
) -> Outcome {
    let frame = if mirror { frame.mirrored() } else { frame };
    let sequence = frame.sequence();

    let observation = match detector.detect(&frame) {
        Ok(Some(observation)) => observation,
        Ok(None) => {
            log::trace!("Frame {sequence}: no face");
            return Outcome::NoFace;
        }
        Err(e) => {
            log::debug!("Frame {sequence}: detection failed: {e}");
            return Outcome::Failed;
        }
    };

    match renderer.render(&frame, &observation) {
        Ok(rendered) => {
            on_output(PipelineOutput {
                frame: rendered,
                observation,
            });
            Outcome::Emitted
        }
        Err(e) => {
            log::debug!("Frame {sequence}: rendering failed: {e}");
            Outcome::Failed
        }
    }
}
