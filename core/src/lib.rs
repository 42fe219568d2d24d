//! # PhoneFlow Core
//!
//! Core domain layer for the PhoneFlow verification flow.
//! This crate contains the verification session entity, the flow controller
//! driving phone submission and code entry, the auth provider seam, and the
//! error taxonomy shared across the workspace.

pub mod domain;
pub mod errors;
pub mod flow;
pub mod provider;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use flow::*;
pub use provider::*;
