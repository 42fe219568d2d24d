//! Adapter from provider-native errors to the closed flow classification.

use crate::provider::ProviderError;

use super::types::ErrorKind;

/// Translates provider-native errors into the flow's closed taxonomy
///
/// The adapter is the single seam between the provider's error vocabulary
/// and the flow: `classify` decides how the state machine reacts, `format`
/// produces the human-readable message stored on the session.
pub trait ErrorAdapter: Send + Sync {
    /// Classifies a provider error into the closed `ErrorKind` set
    fn classify(&self, error: &ProviderError) -> ErrorKind;

    /// Formats a provider error as a human-readable message
    fn format(&self, error: &ProviderError) -> String;
}

/// Default adapter for providers using dashed error identifiers
///
/// Maps the identifiers emitted by identity-toolkit-style backends
/// (e.g. `invalid-verification-code`, `quota-exceeded`). Unrecognized codes
/// classify as `ProviderRejected` and format as a generic message carrying
/// whatever detail the provider supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorAdapter;

impl DefaultErrorAdapter {
    /// Creates the default adapter
    pub fn new() -> Self {
        Self
    }
}

impl ErrorAdapter for DefaultErrorAdapter {
    fn classify(&self, error: &ProviderError) -> ErrorKind {
        match error.code.as_str() {
            "invalid-verification-code"
            | "invalid-verification-id"
            | "session-expired"
            | "code-expired" => ErrorKind::InvalidCode,

            "operation-not-allowed"
            | "credential-already-in-use"
            | "provider-already-linked"
            | "requires-recent-login"
            | "user-disabled" => ErrorKind::PreconditionViolation,

            _ => ErrorKind::ProviderRejected,
        }
    }

    fn format(&self, error: &ProviderError) -> String {
        match error.code.as_str() {
            "invalid-verification-code" => {
                "The verification code is invalid. Check the code and try again.".to_string()
            }
            "invalid-verification-id" => {
                "The verification session is no longer valid. Request a new code.".to_string()
            }
            "session-expired" | "code-expired" => {
                "The verification code has expired. Request a new code.".to_string()
            }
            "invalid-phone-number" => "The phone number has an invalid format.".to_string(),
            "quota-exceeded" => "The verification quota has been exceeded. Try again later.".to_string(),
            "too-many-requests" => "Too many verification attempts. Try again later.".to_string(),
            "network-request-failed" => {
                "A network error interrupted verification. Check the connection and try again."
                    .to_string()
            }
            "app-not-authorized" => {
                "This application is not authorized to use phone verification.".to_string()
            }
            "missing-client-identifier" => {
                "The request is missing a valid client identifier.".to_string()
            }
            "operation-not-allowed" => {
                "Phone verification is not enabled for this project.".to_string()
            }
            "credential-already-in-use" => {
                "This phone number is already linked to another account.".to_string()
            }
            "provider-already-linked" => {
                "A phone number is already linked to this account.".to_string()
            }
            "requires-recent-login" => {
                "Linking requires a recent sign-in. Sign in again and retry.".to_string()
            }
            "user-disabled" => "This account has been disabled.".to_string(),
            _ => {
                if error.message.is_empty() {
                    format!("Verification failed: {}", error.code)
                } else {
                    format!("Verification failed: {}", error.message)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(code: &str, message: &str) -> ProviderError {
        ProviderError::new(code, message)
    }

    #[test]
    fn test_classify_invalid_code_family() {
        let adapter = DefaultErrorAdapter::new();

        assert_eq!(
            adapter.classify(&err("invalid-verification-code", "")),
            ErrorKind::InvalidCode
        );
        assert_eq!(
            adapter.classify(&err("session-expired", "")),
            ErrorKind::InvalidCode
        );
        assert_eq!(
            adapter.classify(&err("code-expired", "")),
            ErrorKind::InvalidCode
        );
    }

    #[test]
    fn test_classify_precondition_family() {
        let adapter = DefaultErrorAdapter::new();

        assert_eq!(
            adapter.classify(&err("operation-not-allowed", "")),
            ErrorKind::PreconditionViolation
        );
        assert_eq!(
            adapter.classify(&err("credential-already-in-use", "")),
            ErrorKind::PreconditionViolation
        );
        assert_eq!(
            adapter.classify(&err("requires-recent-login", "")),
            ErrorKind::PreconditionViolation
        );
    }

    #[test]
    fn test_classify_rejection_family() {
        let adapter = DefaultErrorAdapter::new();

        assert_eq!(
            adapter.classify(&err("quota-exceeded", "")),
            ErrorKind::ProviderRejected
        );
        assert_eq!(
            adapter.classify(&err("network-request-failed", "")),
            ErrorKind::ProviderRejected
        );
        assert_eq!(
            adapter.classify(&err("invalid-phone-number", "")),
            ErrorKind::ProviderRejected
        );
    }

    #[test]
    fn test_unknown_code_classifies_as_rejection() {
        let adapter = DefaultErrorAdapter::new();

        assert_eq!(
            adapter.classify(&err("some-future-code", "detail")),
            ErrorKind::ProviderRejected
        );
    }

    #[test]
    fn test_format_known_code() {
        let adapter = DefaultErrorAdapter::new();

        let text = adapter.format(&err("invalid-verification-code", "ignored"));
        assert_eq!(
            text,
            "The verification code is invalid. Check the code and try again."
        );
    }

    #[test]
    fn test_format_unknown_code_uses_provider_message() {
        let adapter = DefaultErrorAdapter::new();

        let text = adapter.format(&err("some-future-code", "backend exploded"));
        assert_eq!(text, "Verification failed: backend exploded");
    }

    #[test]
    fn test_format_unknown_code_falls_back_to_code() {
        let adapter = DefaultErrorAdapter::new();

        let text = adapter.format(&err("some-future-code", ""));
        assert_eq!(text, "Verification failed: some-future-code");
    }
}
