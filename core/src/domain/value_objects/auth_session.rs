//! Authenticated session value object returned by a successful exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an authenticated principal at the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Creates a principal id from the provider's identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated session produced by a successful credential exchange
///
/// Contains the principal, the provider's bearer token, and metadata the
/// caller needs to decide follow-up steps (e.g. onboarding a new account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// The authenticated principal
    pub principal: PrincipalId,

    /// Bearer token issued by the provider
    pub token: String,

    /// Whether the exchange created a new account
    pub is_new_principal: bool,

    /// Timestamp when the session was issued
    pub issued_at: DateTime<Utc>,
}

impl AuthSession {
    /// Creates a new authenticated session issued now
    pub fn new(principal: PrincipalId, token: impl Into<String>, is_new_principal: bool) -> Self {
        Self {
            principal,
            token: token.into(),
            is_new_principal,
            issued_at: Utc::now(),
        }
    }
}
