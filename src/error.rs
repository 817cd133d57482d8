#[cfg(test)]
mod tests;

use thiserror::Error;

/// Failures surfaced to the host.
///
/// Configuration problems are reported as [`ResampleError::InvalidArgument`]
/// before any frame is processed. The two other variants are per-frame and
/// only withhold the frame they were raised for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResampleError {
    #[error("resample: {0}")]
    InvalidArgument(String),
    #[error("resample: {0}")]
    RuntimeFailure(String),
    #[error("resample: {0}")]
    ProcessingException(String),
}

impl ResampleError {
    pub fn invalid_arg(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::RuntimeFailure(msg.into())
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::ProcessingException(msg.into())
    }
}

/// Renders an error chain as the single line handed back to the host.
#[must_use]
pub fn error_message(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
