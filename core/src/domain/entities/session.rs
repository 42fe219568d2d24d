//! Verification session entity for phone-based authentication flows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{ResendToken, VerificationId};
use crate::errors::ErrorKind;

/// Length of the verification code
pub const CODE_LENGTH: usize = 6;

/// Authentication mode fixed at session creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Sign in as a new principal; requires no authenticated principal
    SignIn,
    /// Link the phone credential to the current principal; requires one
    Link,
}

impl AuthMode {
    /// Whether this mode requires an authenticated principal at session start
    pub fn requires_principal(&self) -> bool {
        matches!(self, AuthMode::Link)
    }
}

/// Lifecycle status of a verification session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// No phone number submitted yet
    Idle,
    /// Begin-verification call in flight
    Sending,
    /// Code delivered; waiting for manual entry
    AwaitingCode,
    /// Credential exchange in flight
    Verifying,
    /// Credential exchange succeeded
    Succeeded,
    /// Unrecoverable failure recorded
    Failed,
    /// Cancelled by the caller
    Cancelled,
}

/// Verification session entity
///
/// One live instance per flow invocation. Tracks the submitted phone number,
/// the provider's verification handle and resend token, the lifecycle status,
/// and the last recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    /// Unique identifier for log correlation
    pub id: Uuid,

    /// Phone number in E.164 format; set once, immutable after dispatch
    pub phone: Option<String>,

    /// Authentication mode (sign-in or link)
    pub mode: AuthMode,

    /// Provider handle for the pending verification; required to submit a code
    pub verification_id: Option<VerificationId>,

    /// Opaque provider token passed back on resend
    pub resend_token: Option<ResendToken>,

    /// Current lifecycle status
    pub status: VerificationStatus,

    /// Human-readable message for the last failure
    pub last_error: Option<String>,

    /// Classification of the last failure
    pub last_error_kind: Option<ErrorKind>,

    /// Timestamp when the session was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the provider last confirmed code delivery
    pub code_sent_at: Option<DateTime<Utc>>,
}

impl VerificationSession {
    /// Creates a new idle session for the given mode
    pub fn new(mode: AuthMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone: None,
            mode,
            verification_id: None,
            resend_token: None,
            status: VerificationStatus::Idle,
            last_error: None,
            last_error_kind: None,
            created_at: Utc::now(),
            code_sent_at: None,
        }
    }

    /// Whether the session has reached a state it cannot leave
    ///
    /// `Succeeded` and `Cancelled` are always terminal. `Failed` is terminal
    /// unless the recorded error kind allows a retry from `Idle`.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            VerificationStatus::Succeeded | VerificationStatus::Cancelled => true,
            VerificationStatus::Failed => !self
                .last_error_kind
                .map_or(false, |kind| kind.allows_retry()),
            _ => false,
        }
    }

    /// Whether a phone number submission is currently accepted
    pub fn accepts_phone_submission(&self) -> bool {
        match self.status {
            VerificationStatus::Idle => true,
            VerificationStatus::Failed => self
                .last_error_kind
                .map_or(false, |kind| kind.allows_retry()),
            _ => false,
        }
    }

    /// Records the provider's code delivery and moves to `AwaitingCode`
    pub fn record_code_delivery(
        &mut self,
        verification_id: VerificationId,
        resend_token: Option<ResendToken>,
    ) {
        self.verification_id = Some(verification_id);
        if resend_token.is_some() {
            self.resend_token = resend_token;
        }
        self.code_sent_at = Some(Utc::now());
        self.status = VerificationStatus::AwaitingCode;
    }

    /// Records an invalid-code rejection and returns to `AwaitingCode`
    ///
    /// The verification handle is kept so the user can re-enter the code.
    pub fn record_invalid_code(&mut self, message: String) {
        self.last_error = Some(message);
        self.last_error_kind = Some(ErrorKind::InvalidCode);
        self.status = VerificationStatus::AwaitingCode;
    }

    /// Records an unrecoverable failure and moves to `Failed`
    pub fn record_failure(&mut self, kind: ErrorKind, message: String) {
        self.last_error = Some(message);
        self.last_error_kind = Some(kind);
        self.status = VerificationStatus::Failed;
    }

    /// Earliest instant a resend is allowed, if a code has been sent
    pub fn next_resend_at(&self, cooldown_seconds: i64) -> Option<DateTime<Utc>> {
        self.code_sent_at
            .map(|sent| sent + Duration::seconds(cooldown_seconds))
    }

    /// Whether a resend request is currently allowed
    ///
    /// Requires `AwaitingCode` status and an elapsed cooldown since the last
    /// confirmed delivery.
    pub fn can_resend(&self, cooldown_seconds: i64) -> bool {
        if self.status != VerificationStatus::AwaitingCode {
            return false;
        }
        match self.next_resend_at(cooldown_seconds) {
            Some(at) => Utc::now() >= at,
            None => false,
        }
    }
}
