//! Configuration for the verification flow controller.

use std::time::Duration;

/// Configuration for the verification flow controller
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Minimum seconds between code resend requests
    pub resend_cooldown_seconds: i64,
    /// Delay before exchanging an auto-completed credential
    ///
    /// Gives the caller a moment to show the retrieved code before the
    /// exchange fires. Cancellation during the delay discards the exchange.
    pub auto_exchange_delay: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            resend_cooldown_seconds: 60,
            auto_exchange_delay: Duration::ZERO,
        }
    }
}
