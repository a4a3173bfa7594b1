use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::capture_source::{AuthorizationStatus, CaptureSource, FrameCallback};

/// Drives a capture source through authorization, opening and start/stop.
///
/// `setup` must succeed before `start` has any effect. `start` and `stop`
/// are idempotent.
pub struct CaptureManager {
    source: Box<dyn CaptureSource>,
    opened: bool,
}

impl CaptureManager {
    pub fn new(source: Box<dyn CaptureSource>) -> Self {
        Self {
            source,
            opened: false,
        }
    }

    pub fn authorization(&self) -> AuthorizationStatus {
        self.source.authorization()
    }

    /// Ensures access and opens the capture session.
    ///
    /// When access has not been decided yet the user is asked and this call
    /// blocks until they answer. Calling it again after success is a no-op.
    pub fn setup(&mut self) -> Result<(), CaptureError> {
        if self.opened {
            return Ok(());
        }

        match self.source.authorization() {
            AuthorizationStatus::Authorized => {}
            AuthorizationStatus::NotDetermined => {
                log::info!("Requesting camera access");
                if !self.request_access() {
                    log::warn!("Camera access denied by user");
                    return Err(CaptureError::AuthorizationFailure);
                }
            }
            status @ (AuthorizationStatus::Denied | AuthorizationStatus::Restricted) => {
                log::warn!("Camera access unavailable: {status:?}");
                return Err(CaptureError::AuthorizationFailure);
            }
        }

        self.source.open()?;
        self.opened = true;
        log::info!("Capture session ready");
        Ok(())
    }

    /// Bridges the asynchronous access prompt into a blocking answer.
    /// A source that drops the callback without answering counts as denied.
    fn request_access(&mut self) -> bool {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.source.request_access(Box::new(move |granted| {
            let _ = tx.send(granted);
        }));
        rx.recv().unwrap_or(false)
    }

    pub fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError> {
        if !self.opened {
            log::debug!("Capture not set up, ignoring start");
            return Ok(());
        }
        if self.source.is_running() {
            return Ok(());
        }
        self.source.start(on_frame)?;
        log::info!("Capture started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.opened || !self.source.is_running() {
            return;
        }
        self.source.stop();
        log::info!("Capture stopped");
    }

    pub fn is_set_up(&self) -> bool {
        self.opened
    }

    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_source::AccessCallback;
    use crate::shared::frame::Frame;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        requests: usize,
        opens: usize,
        starts: usize,
        stops: usize,
    }

    enum AccessAnswer {
        Grant,
        Deny,
        Drop,
    }

    struct FakeCaptureSource {
        status: AuthorizationStatus,
        answer: AccessAnswer,
        open_error: Option<CaptureError>,
        running: bool,
        calls: Arc<Mutex<Calls>>,
    }

    impl FakeCaptureSource {
        fn new(status: AuthorizationStatus) -> (Self, Arc<Mutex<Calls>>) {
            let calls = Arc::new(Mutex::new(Calls::default()));
            (
                Self {
                    status,
                    answer: AccessAnswer::Grant,
                    open_error: None,
                    running: false,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl CaptureSource for FakeCaptureSource {
        fn authorization(&self) -> AuthorizationStatus {
            self.status
        }

        fn request_access(&mut self, on_result: AccessCallback) {
            self.calls.lock().unwrap().requests += 1;
            let granted = match self.answer {
                AccessAnswer::Grant => true,
                AccessAnswer::Deny => false,
                AccessAnswer::Drop => return,
            };
            // Answer from another thread, as a system prompt would.
            std::thread::spawn(move || on_result(granted));
        }

        fn open(&mut self) -> Result<(), CaptureError> {
            self.calls.lock().unwrap().opens += 1;
            match &self.open_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError> {
            self.calls.lock().unwrap().starts += 1;
            on_frame(Frame::filled(2, 2, &[0, 0, 0], 0));
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.calls.lock().unwrap().stops += 1;
            self.running = false;
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    fn noop() -> FrameCallback {
        Box::new(|_| {})
    }

    #[test]
    fn test_authorized_opens_without_prompt() {
        let (source, calls) = FakeCaptureSource::new(AuthorizationStatus::Authorized);
        let mut manager = CaptureManager::new(Box::new(source));
        assert_eq!(manager.setup(), Ok(()));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.requests, 0);
        assert_eq!(calls.opens, 1);
    }

    #[test]
    fn test_not_determined_granted_opens() {
        let (source, calls) = FakeCaptureSource::new(AuthorizationStatus::NotDetermined);
        let mut manager = CaptureManager::new(Box::new(source));
        assert_eq!(manager.setup(), Ok(()));
        assert!(manager.is_set_up());
        let calls = calls.lock().unwrap();
        assert_eq!(calls.requests, 1);
        assert_eq!(calls.opens, 1);
    }

    #[rstest]
    #[case::user_denied(AccessAnswer::Deny)]
    #[case::prompt_dropped(AccessAnswer::Drop)]
    fn test_not_determined_refused_fails(#[case] answer: AccessAnswer) {
        let (mut source, calls) = FakeCaptureSource::new(AuthorizationStatus::NotDetermined);
        source.answer = answer;
        let mut manager = CaptureManager::new(Box::new(source));
        assert_eq!(manager.setup(), Err(CaptureError::AuthorizationFailure));
        assert_eq!(calls.lock().unwrap().opens, 0);
    }

    #[rstest]
    #[case::denied(AuthorizationStatus::Denied)]
    #[case::restricted(AuthorizationStatus::Restricted)]
    fn test_blocked_access_fails_without_prompt(#[case] status: AuthorizationStatus) {
        let (source, calls) = FakeCaptureSource::new(status);
        let mut manager = CaptureManager::new(Box::new(source));
        assert_eq!(manager.setup(), Err(CaptureError::AuthorizationFailure));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.requests, 0);
        assert_eq!(calls.opens, 0);
    }

    #[test]
    fn test_open_failure_reported_once() {
        let (mut source, _calls) = FakeCaptureSource::new(AuthorizationStatus::Authorized);
        source.open_error = Some(CaptureError::FailedToOpen("no camera".into()));
        let mut manager = CaptureManager::new(Box::new(source));
        assert_eq!(
            manager.setup(),
            Err(CaptureError::FailedToOpen("no camera".into()))
        );
        assert!(!manager.is_set_up());
    }

    #[test]
    fn test_start_before_setup_is_noop() {
        let (source, calls) = FakeCaptureSource::new(AuthorizationStatus::Authorized);
        let mut manager = CaptureManager::new(Box::new(source));
        assert_eq!(manager.start(noop()), Ok(()));
        assert!(!manager.is_running());
        assert_eq!(calls.lock().unwrap().starts, 0);
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let (source, calls) = FakeCaptureSource::new(AuthorizationStatus::Authorized);
        let mut manager = CaptureManager::new(Box::new(source));
        manager.setup().unwrap();

        manager.start(noop()).unwrap();
        manager.start(noop()).unwrap();
        assert!(manager.is_running());
        manager.stop();
        manager.stop();
        assert!(!manager.is_running());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.starts, 1);
        assert_eq!(calls.stops, 1);
    }

    #[test]
    fn test_setup_twice_opens_once() {
        let (source, calls) = FakeCaptureSource::new(AuthorizationStatus::Authorized);
        let mut manager = CaptureManager::new(Box::new(source));
        manager.setup().unwrap();
        manager.setup().unwrap();
        assert_eq!(calls.lock().unwrap().opens, 1);
    }

    #[test]
    fn test_drop_stops_running_source() {
        let (source, calls) = FakeCaptureSource::new(AuthorizationStatus::Authorized);
        let mut manager = CaptureManager::new(Box::new(source));
        manager.setup().unwrap();
        manager.start(noop()).unwrap();
        drop(manager);
        assert_eq!(calls.lock().unwrap().stops, 1);
    }
}
