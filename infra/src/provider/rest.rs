//! REST Auth Provider Implementation
//!
//! This module implements the `AuthProvider` seam against an HTTP identity
//! service speaking the Identity Toolkit protocol: a verification code is
//! requested with `accounts:sendVerificationCode` and the resulting session
//! handle plus user-entered code are exchanged for tokens with
//! `accounts:signInWithPhoneNumber`.
//!
//! ## Features
//!
//! - Code delivery and credential exchange over HTTPS
//! - Provider error normalization into dashed error codes
//! - Signed-in session tracking for credential linking
//! - Security: phone number masking in logs

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pf_core::domain::value_objects::{
    AuthSession, PhoneCredential, PrincipalId, ResendToken, VerificationId,
};
use pf_core::flow::mask_phone;
use pf_core::provider::{AuthProvider, CodeDelivery, ProviderError, VerificationDispatch};

use crate::InfraError;

/// Default base URL of the identity service
pub const DEFAULT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

/// REST auth provider configuration
#[derive(Debug, Clone)]
pub struct RestAuthProviderConfig {
    /// API key identifying the project at the identity service
    pub api_key: String,
    /// Base URL of the identity service
    pub endpoint: String,
    /// Timeout for API requests in seconds
    pub request_timeout_secs: u64,
}

impl RestAuthProviderConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, InfraError> {
        let api_key = std::env::var("PHONEFLOW_API_KEY")
            .map_err(|_| InfraError::Config("PHONEFLOW_API_KEY not set".to_string()))?;

        Ok(Self {
            api_key,
            endpoint: std::env::var("PHONEFLOW_AUTH_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            request_timeout_secs: std::env::var("PHONEFLOW_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeRequest<'a> {
    phone_number: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeResponse {
    session_info: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_info: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_verification_proof: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    local_id: String,
    #[serde(default)]
    is_new_user: bool,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Map the identity service's SCREAMING_SNAKE error messages onto the dashed
/// codes the flow's error adapter classifies
///
/// Messages sometimes carry a trailing explanation ("SESSION_EXPIRED : The
/// sms code has expired."); only the leading token identifies the error.
fn normalize_error_code(raw: &str) -> String {
    let head = raw
        .split(|c: char| c == ':' || c.is_whitespace())
        .next()
        .unwrap_or("");

    match head {
        "INVALID_CODE" => "invalid-verification-code".to_string(),
        "INVALID_SESSION_INFO" | "MISSING_SESSION_INFO" => "invalid-verification-id".to_string(),
        "SESSION_EXPIRED" => "session-expired".to_string(),
        "CODE_EXPIRED" => "code-expired".to_string(),
        "INVALID_PHONE_NUMBER" | "MISSING_PHONE_NUMBER" => "invalid-phone-number".to_string(),
        "QUOTA_EXCEEDED" | "TOO_MANY_ATTEMPTS_TRY_LATER" => "quota-exceeded".to_string(),
        "OPERATION_NOT_ALLOWED" => "operation-not-allowed".to_string(),
        "USER_DISABLED" => "user-disabled".to_string(),
        "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => "requires-recent-login".to_string(),
        "PHONE_EXISTS" | "FEDERATED_USER_ID_ALREADY_LINKED" => {
            "credential-already-in-use".to_string()
        }
        "" => "unknown-error".to_string(),
        other => other.to_lowercase().replace('_', "-"),
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    ProviderError::new("network-request-failed", e.to_string())
}

fn api_error(status: reqwest::StatusCode, raw: &str) -> ProviderError {
    match serde_json::from_str::<ApiErrorEnvelope>(raw) {
        Ok(envelope) => ProviderError::new(
            normalize_error_code(&envelope.error.message),
            envelope.error.message,
        ),
        Err(_) => ProviderError::new(
            "network-request-failed",
            format!("HTTP {} from identity service", status),
        ),
    }
}

/// REST auth provider
///
/// Holds the session from the most recent successful exchange so that
/// linking can attach a credential to the current principal, the way
/// provider SDKs track their current user.
pub struct RestAuthProvider {
    client: reqwest::Client,
    config: RestAuthProviderConfig,
    session: Mutex<Option<AuthSession>>,
}

impl RestAuthProvider {
    /// Create a new REST auth provider
    pub fn new(config: RestAuthProviderConfig) -> Result<Self, InfraError> {
        if config.api_key.is_empty() {
            return Err(InfraError::Config("API key must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        info!(
            "REST auth provider initialized against {}",
            config.endpoint
        );

        Ok(Self {
            client,
            config,
            session: Mutex::new(None),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self, InfraError> {
        let config = RestAuthProviderConfig::from_env()?;
        Self::new(config)
    }

    /// The session from the most recent successful exchange, if any
    pub fn current_session(&self) -> Option<AuthSession> {
        self.lock_session().clone()
    }

    /// Seed the signed-in session, e.g. restored from persisted credentials
    pub fn restore_session(&self, session: AuthSession) {
        *self.lock_session() = Some(session);
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.config.endpoint, method, self.config.api_key
        )
    }

    async fn post<Req, Resp>(&self, method: &str, body: &Req) -> Result<Resp, ProviderError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(method))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            response.json::<Resp>().await.map_err(transport_error)
        } else {
            let raw = response.text().await.map_err(transport_error)?;
            Err(api_error(status, &raw))
        }
    }

    async fn exchange(
        &self,
        credential: &PhoneCredential,
        id_token: Option<&str>,
    ) -> Result<SignInResponse, ProviderError> {
        let request = match credential {
            PhoneCredential::Code {
                verification_id,
                code,
            } => SignInRequest {
                session_info: Some(verification_id.as_str()),
                code: Some(code),
                phone_verification_proof: None,
                id_token,
            },
            PhoneCredential::Assertion(proof) => SignInRequest {
                session_info: None,
                code: None,
                phone_verification_proof: Some(proof),
                id_token,
            },
        };

        self.post("signInWithPhoneNumber", &request).await
    }
}

#[async_trait]
impl AuthProvider for RestAuthProvider {
    async fn begin_verification(
        &self,
        phone: &str,
        resend_token: Option<ResendToken>,
    ) -> VerificationDispatch {
        if resend_token.is_some() {
            // The REST transport has no resend correlation; every request is
            // a fresh delivery.
            debug!("Resend token ignored by the REST transport");
        }

        info!(
            event = "code_delivery_requested",
            phone = %mask_phone(phone),
            "Requesting verification code delivery"
        );

        let request = SendCodeRequest {
            phone_number: phone,
        };
        match self
            .post::<_, SendCodeResponse>("sendVerificationCode", &request)
            .await
        {
            Ok(response) => VerificationDispatch::CodeSent(CodeDelivery {
                verification_id: VerificationId::new(response.session_info),
                resend_token: None,
            }),
            Err(e) => {
                warn!(
                    event = "code_delivery_failed",
                    code = %e.code,
                    "Verification code delivery failed"
                );
                VerificationDispatch::Failed(e)
            }
        }
    }

    async fn sign_in(&self, credential: PhoneCredential) -> Result<AuthSession, ProviderError> {
        let response = self.exchange(&credential, None).await?;
        let session = AuthSession::new(
            PrincipalId::new(response.local_id),
            response.id_token,
            response.is_new_user,
        );
        *self.lock_session() = Some(session.clone());

        info!(
            event = "sign_in_completed",
            principal = %session.principal,
            new_principal = session.is_new_principal,
            "Signed in with phone credential"
        );
        Ok(session)
    }

    async fn link_credential(
        &self,
        credential: PhoneCredential,
    ) -> Result<AuthSession, ProviderError> {
        let current = self.current_session().ok_or_else(|| {
            ProviderError::new(
                "requires-recent-login",
                "no signed-in session to link against",
            )
        })?;

        let response = self.exchange(&credential, Some(&current.token)).await?;
        let session = AuthSession::new(PrincipalId::new(response.local_id), response.id_token, false);
        *self.lock_session() = Some(session.clone());

        info!(
            event = "link_completed",
            principal = %session.principal,
            "Linked phone credential to the signed-in principal"
        );
        Ok(session)
    }

    fn current_principal(&self) -> Option<PrincipalId> {
        self.lock_session().as_ref().map(|s| s.principal.clone())
    }

    fn provider_name(&self) -> &str {
        "rest"
    }
}
