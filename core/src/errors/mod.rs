//! Domain-specific error types and error handling.

mod adapter;
mod types;

// Re-export all error types and utilities
pub use adapter::{DefaultErrorAdapter, ErrorAdapter};
pub use types::{ErrorKind, FlowError};

use thiserror::Error;

/// Core domain errors (general purpose)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to flow-specific errors
    #[error(transparent)]
    Flow(#[from] FlowError),
}

pub type DomainResult<T> = Result<T, DomainError>;
