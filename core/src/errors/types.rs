//! Flow-specific error types and the closed failure classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed classification of verification failures
///
/// Produced by an [`ErrorAdapter`](crate::errors::ErrorAdapter) from the
/// provider's native error shape. The set is deliberately closed: callers
/// match on it exhaustively instead of inspecting provider codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The entered code was rejected; the session stays open for re-entry
    InvalidCode,
    /// The provider refused the request (quota, network, bad number, ...)
    ProviderRejected,
    /// A flow precondition was not met (wrong state, missing principal, ...)
    PreconditionViolation,
}

impl ErrorKind {
    /// Whether a failure of this kind permits a fresh phone submission
    /// within the same session
    ///
    /// Every kind currently ends the session; a caller that wants to try
    /// again starts a new flow. `InvalidCode` never reaches the failed state
    /// in the first place, since it returns the session to code entry.
    pub fn allows_retry(&self) -> bool {
        match self {
            ErrorKind::InvalidCode
            | ErrorKind::ProviderRejected
            | ErrorKind::PreconditionViolation => false,
        }
    }
}

/// Errors surfaced by the verification flow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Precondition violation: {message}")]
    PreconditionViolation { message: String },

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Provider rejected the request: {message}")]
    ProviderRejected { message: String },
}

impl FlowError {
    /// Builds the surfaced error for a classified provider failure
    pub fn classified(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::InvalidCode => FlowError::InvalidCode,
            ErrorKind::ProviderRejected => FlowError::ProviderRejected { message },
            ErrorKind::PreconditionViolation => FlowError::PreconditionViolation { message },
        }
    }

    /// The classification this error surfaces
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::InvalidCode => ErrorKind::InvalidCode,
            FlowError::ProviderRejected { .. } => ErrorKind::ProviderRejected,
            FlowError::PreconditionViolation { .. } => ErrorKind::PreconditionViolation,
        }
    }
}
