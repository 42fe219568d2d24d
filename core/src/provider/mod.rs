//! Auth provider seam: the trait and outcome types backends implement.

mod traits;
mod types;

// Re-export the provider surface
pub use traits::AuthProvider;
pub use types::{CodeDelivery, ProviderError, VerificationDispatch};
