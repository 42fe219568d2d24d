//! Domain entities representing core business objects.

pub mod session;

// Re-export commonly used types
pub use session::{AuthMode, VerificationSession, VerificationStatus, CODE_LENGTH};
