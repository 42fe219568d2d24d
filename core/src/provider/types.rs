//! Outcome types returned by auth provider implementations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::{PhoneCredential, ResendToken, VerificationId};

/// Provider-native error: an identifier plus whatever detail the backend gave
///
/// The `code` is the provider's stable identifier (dashed form, e.g.
/// `invalid-verification-code`); classification into the flow taxonomy is the
/// error adapter's job, not the provider's.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Stable provider error identifier
    pub code: String,
    /// Detail message from the backend, possibly empty
    pub message: String,
}

impl ProviderError {
    /// Creates a provider error from an identifier and a detail message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Confirmation that a verification code is on its way to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeDelivery {
    /// Handle identifying the pending verification at the provider
    pub verification_id: VerificationId,
    /// Token to pass back when requesting a resend, if the provider issues one
    pub resend_token: Option<ResendToken>,
}

/// Tagged outcome of a begin-verification call
///
/// A single awaited call resolves to exactly one of these; there are no
/// further callbacks for the same attempt.
#[derive(Debug, Clone)]
pub enum VerificationDispatch {
    /// The device retrieved the code itself; the credential is ready to use
    AutoCompleted(PhoneCredential),
    /// Code dispatched; the user must enter it manually
    CodeSent(CodeDelivery),
    /// Code dispatched, but the auto-retrieval window elapsed without a
    /// match; manual entry remains possible
    AutoRetrievalTimedOut(CodeDelivery),
    /// The provider refused to start the verification
    Failed(ProviderError),
}
