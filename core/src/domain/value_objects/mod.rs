//! Value objects representing immutable domain concepts.

pub mod auth_session;
pub mod credential;

// Re-export commonly used types
pub use auth_session::{AuthSession, PrincipalId};
pub use credential::{PhoneCredential, ResendToken, VerificationId};
