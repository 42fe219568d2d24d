//! # Infrastructure Layer
//!
//! This crate implements the infrastructure layer for PhoneFlow. It provides
//! concrete auth provider implementations behind the `pf_core` provider seam.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **REST provider**: phone verification against an HTTP identity service
//! - **Mock provider**: in-process provider for development, demos, and tests
//! - **Provider factory**: configuration-driven wiring
//!
//! Providers are selected through [`create_auth_provider`] or constructed
//! directly and handed to `pf_core::flow::PhoneVerificationController`.

// Re-export core types for convenience
pub use pf_core::errors::*;

/// Provider module - auth provider implementations
pub mod provider;

pub use provider::create_auth_provider;

/// Configuration module for provider wiring
pub mod config {
    //! Configuration for provider selection and REST endpoints

    use serde::{Deserialize, Serialize};

    /// Provider wiring settings
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProviderSettings {
        /// Provider backend ("rest", "mock")
        pub provider: String,
        /// API key for the REST identity service
        pub api_key: String,
        /// Base URL of the REST identity service
        pub endpoint: String,
        /// Timeout for API requests in seconds
        pub request_timeout_secs: u64,
    }

    impl Default for ProviderSettings {
        fn default() -> Self {
            Self {
                provider: "mock".to_string(),
                api_key: String::new(),
                endpoint: crate::provider::rest::DEFAULT_ENDPOINT.to_string(),
                request_timeout_secs: 30,
            }
        }
    }
}

/// Load provider settings from the environment
///
/// Unset variables fall back to defaults, ending at the mock provider, so a
/// bare environment still yields a working development setup.
pub fn load_settings() -> config::ProviderSettings {
    dotenvy::dotenv().ok(); // Load .env file if present

    config::ProviderSettings {
        provider: std::env::var("PHONEFLOW_PROVIDER").unwrap_or_else(|_| "mock".to_string()),
        api_key: std::env::var("PHONEFLOW_API_KEY").unwrap_or_default(),
        endpoint: std::env::var("PHONEFLOW_AUTH_ENDPOINT")
            .unwrap_or_else(|_| provider::rest::DEFAULT_ENDPOINT.to_string()),
        request_timeout_secs: std::env::var("PHONEFLOW_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
    }
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfraError {
    /// HTTP client error for the REST provider
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
