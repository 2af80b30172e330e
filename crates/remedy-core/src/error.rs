use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemedyError {
    #[error("invalid JSON payload: {0}")]
    BadRequest(String),
    #[error("{0}")]
    Validation(String),
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("restart of container {container} failed: {reason}")]
    RestartFailed { container: String, reason: String },
    #[error("Service {0} not found")]
    ServiceNotFound(String),
    #[error("process invocation failed: {0}")]
    ProcessInvocationFailed(String),
    #[error("upstream request failed: {0}")]
    UpstreamRequestFailed(String),
}

impl RemedyError {
    /// Errors the restart batch is repeated on.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemedyError::RuntimeUnavailable(_) | RemedyError::RestartFailed { .. }
        )
    }
}
