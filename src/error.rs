use thiserror::Error;

/// Failures surfaced across the engine boundary.
///
/// `InvalidState` and `InvalidArgument` are returned to the caller as-is.
/// `Gateway` and `Classifier` failures are logged by the engine and never
/// change the outcome of a transition or verdict; they exist so adapters have a
/// typed channel to report through.
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("monitoring gateway failed: {0}")]
    Gateway(#[source] anyhow::Error),

    #[error("safety lookup failed: {0}")]
    Classifier(#[source] anyhow::Error),

    #[error("persistent state failed: {0}")]
    Storage(#[source] anyhow::Error),
}

pub type FocusResult<T> = Result<T, FocusError>;

impl FocusError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        FocusError::InvalidState(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        FocusError::InvalidArgument(message.into())
    }

    /// True for failures the engine recovers from on its own.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FocusError::Gateway(_) | FocusError::Classifier(_))
    }
}
