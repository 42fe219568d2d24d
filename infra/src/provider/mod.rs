//! Auth Provider Module
//!
//! This module provides auth provider implementations for the verification
//! flow. It includes a REST-backed provider for production use and a mock
//! implementation for development.
//!
//! ## Features
//!
//! - **REST provider**: code delivery and credential exchange over HTTPS
//! - **Mock provider**: in-memory codes with console delivery
//! - **Provider factory**: wiring based on configuration
//! - **Security**: phone number masking in logs

use std::sync::Arc;

use pf_core::provider::AuthProvider;

pub mod mock;
pub mod rest;

// Re-export commonly used types
pub use mock::{MockAuthProvider, MockDelivery};
pub use rest::{RestAuthProvider, RestAuthProviderConfig};

#[cfg(test)]
mod tests;

/// Create an auth provider based on configuration
///
/// Returns the provider implementation named by the settings, falling back
/// to the mock provider when the configured backend cannot be constructed.
pub fn create_auth_provider(settings: &crate::config::ProviderSettings) -> Arc<dyn AuthProvider> {
    match settings.provider.as_str() {
        "mock" => Arc::new(MockAuthProvider::new()),
        "rest" => {
            let config = RestAuthProviderConfig {
                api_key: settings.api_key.clone(),
                endpoint: settings.endpoint.clone(),
                request_timeout_secs: settings.request_timeout_secs,
            };

            match RestAuthProvider::new(config) {
                Ok(provider) => Arc::new(provider),
                Err(e) => {
                    tracing::error!("Failed to initialize REST auth provider: {}", e);
                    tracing::warn!("Falling back to mock auth provider");
                    Arc::new(MockAuthProvider::new())
                }
            }
        }
        other => {
            tracing::warn!(
                "Unknown auth provider '{}', using mock implementation",
                other
            );
            Arc::new(MockAuthProvider::new())
        }
    }
}
