use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera access was not authorized")]
    AuthorizationFailure,
    #[error("failed to open capture session: {0}")]
    FailedToOpen(String),
}
