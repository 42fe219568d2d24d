//! Auth provider trait for phone verification backends.

use async_trait::async_trait;

use crate::domain::value_objects::{AuthSession, PhoneCredential, PrincipalId, ResendToken};

use super::types::{ProviderError, VerificationDispatch};

/// Trait for auth provider integration
///
/// The provider owns the verification backend protocol: dispatching codes,
/// exchanging credentials, and tracking the signed-in principal. The flow
/// controller receives an implementation explicitly at construction.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Begin a phone verification attempt
    ///
    /// Resolves once with the tagged outcome. `resend_token` carries the
    /// token from an earlier delivery when the caller is requesting a
    /// resend; `None` starts a fresh attempt.
    async fn begin_verification(
        &self,
        phone: &str,
        resend_token: Option<ResendToken>,
    ) -> VerificationDispatch;

    /// Exchange a phone credential for a new authenticated session
    async fn sign_in(&self, credential: PhoneCredential) -> Result<AuthSession, ProviderError>;

    /// Link a phone credential to the currently authenticated principal
    ///
    /// Valid only while a principal is signed in.
    async fn link_credential(
        &self,
        credential: PhoneCredential,
    ) -> Result<AuthSession, ProviderError>;

    /// The currently authenticated principal, if any
    fn current_principal(&self) -> Option<PrincipalId>;

    /// Short name of the provider backend, for logs and diagnostics
    fn provider_name(&self) -> &str;
}
