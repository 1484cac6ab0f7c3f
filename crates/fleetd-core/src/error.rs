use thiserror::Error;

/// Error taxonomy for operations on a [`crate::supervisor::ProcessSupervisor`]
/// or [`crate::registry::Registry`]. Transport-layer concerns (status codes)
/// live one layer up; this enum only carries intent.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("process is already started")]
    AlreadyStarted,
    #[error("failed to spawn child process: {0}")]
    SpawnFailed(#[source] std::io::Error),
    #[error("failed to write to child stdin: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("child stdin is not open")]
    StdinClosed,
    #[error("child process is not running")]
    NotRunning,
    #[error("n must be non-negative")]
    NegativeTail,
    #[error("process is still running")]
    StillRunning,
    #[error("a process named {0:?} already exists")]
    AlreadyExists(String),
    #[error("no process named {0:?}")]
    NotFound(String),
    #[error("invalid process name {0:?}: must match ^[A-Za-z0-9_-]+$")]
    InvalidName(String),
    #[error("command must not be empty")]
    EmptyCommand,
}

impl From<crate::ring_buffer::NegativeTail> for SupervisorError {
    fn from(_: crate::ring_buffer::NegativeTail) -> Self {
        SupervisorError::NegativeTail
    }
}
