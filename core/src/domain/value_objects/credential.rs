//! Credential value objects exchanged with the auth provider.

use serde::{Deserialize, Serialize};

/// Opaque resend token handed out by the provider alongside a code delivery
///
/// Passed back verbatim on resend so the provider can correlate the request
/// with the earlier delivery.
pub type ResendToken = u64;

/// Opaque handle identifying a pending verification at the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationId(String);

impl VerificationId {
    /// Creates a verification id from the provider's handle
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the handle as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VerificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Phone credential ready for the sign-in or link exchange
///
/// Either assembled locally from a verification handle and a user-entered
/// code, or produced whole by the provider when code retrieval auto-completed
/// on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhoneCredential {
    /// Verification handle plus the six-digit code the user entered
    Code {
        verification_id: VerificationId,
        code: String,
    },
    /// Opaque provider assertion from an auto-completed verification
    Assertion(String),
}

impl PhoneCredential {
    /// Creates a credential from a verification handle and an entered code
    pub fn from_code(verification_id: VerificationId, code: impl Into<String>) -> Self {
        Self::Code {
            verification_id,
            code: code.into(),
        }
    }

    /// The verification handle this credential was built from, if any
    ///
    /// Assertions carry no handle; they exist only as a whole.
    pub fn verification_id(&self) -> Option<&VerificationId> {
        match self {
            Self::Code {
                verification_id, ..
            } => Some(verification_id),
            Self::Assertion(_) => None,
        }
    }
}
