use crate::capture::domain::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// Camera access permission as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Authorized,
    /// The user has not been asked yet.
    NotDetermined,
    Denied,
    /// Access is blocked by policy and cannot be requested.
    Restricted,
}

/// Called on the capture thread for every delivered frame.
pub type FrameCallback = Box<dyn Fn(Frame) + Send>;

/// Called once with whether access was granted. May run on any thread.
pub type AccessCallback = Box<dyn FnOnce(bool) + Send>;

/// Domain interface for a live frame source.
///
/// Lifecycle: `open` once after access is authorized, then any number of
/// `start`/`stop` pairs. Frames are delivered on a thread owned by the source.
pub trait CaptureSource: Send {
    fn authorization(&self) -> AuthorizationStatus;

    /// Asks the user for access; `on_result` runs exactly once.
    fn request_access(&mut self, on_result: AccessCallback);

    fn open(&mut self) -> Result<(), CaptureError>;

    fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
