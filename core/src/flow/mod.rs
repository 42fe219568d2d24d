//! Verification flow module
//!
//! This module provides the phone verification flow:
//! - The controller driving phone submission, code dispatch, and the
//!   credential exchange
//! - Six-cell code entry with focus handling
//! - Push-based state snapshots for presenters
//! - Phone number plausibility checks and log masking

mod code_entry;
mod config;
mod controller;
mod phone_utils;
mod types;

#[cfg(test)]
mod tests;

pub use code_entry::{CodeEntry, CodeEntryView};
pub use config::FlowConfig;
pub use controller::PhoneVerificationController;
pub use types::FlowUpdate;

// Export selected phone utilities for public use
pub use phone_utils::{is_plausible_e164, mask_phone};
