//! Snapshot types pushed to flow subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::VerificationStatus;

/// State snapshot pushed through the watch channel on every transition
///
/// Carries what a presenter needs to render the flow; the full session
/// entity stays inside the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowUpdate {
    /// Current lifecycle status
    pub status: VerificationStatus,
    /// Human-readable message for the last failure, if any
    pub last_error: Option<String>,
    /// Whether the flow is waiting for manual code entry
    pub awaiting_code: bool,
    /// Whether the auto-retrieval window elapsed without a match
    pub auto_retrieval_timed_out: bool,
    /// Earliest instant a resend is allowed, once a code has been sent
    pub next_resend_at: Option<DateTime<Utc>>,
}

impl FlowUpdate {
    /// Snapshot for a freshly created, idle flow
    pub fn idle() -> Self {
        Self {
            status: VerificationStatus::Idle,
            last_error: None,
            awaiting_code: false,
            auto_retrieval_timed_out: false,
            next_resend_at: None,
        }
    }
}
