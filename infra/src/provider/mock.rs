//! Mock Auth Provider Implementation
//!
//! This module provides an in-process auth provider for development, demos,
//! and tests. Verification codes are issued locally and written to the log
//! instead of being delivered over SMS, and credential exchanges are checked
//! against the issued codes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use rand::Rng;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use pf_core::domain::value_objects::{
    AuthSession, PhoneCredential, PrincipalId, ResendToken, VerificationId,
};
use pf_core::flow::mask_phone;
use pf_core::provider::{AuthProvider, CodeDelivery, ProviderError, VerificationDispatch};

/// Delivery behavior for [`MockAuthProvider::begin_verification`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockDelivery {
    /// Deliver a code and wait for manual entry
    CodeSent,
    /// Complete the verification on-device without manual entry
    AutoComplete,
    /// Deliver a code after the auto-retrieval window elapses
    AutoRetrievalTimedOut,
}

struct IssuedCode {
    code: String,
    issued_at: DateTime<Utc>,
}

/// Mock auth provider with console code delivery
pub struct MockAuthProvider {
    delivery: MockDelivery,
    fixed_code: Option<String>,
    code_ttl: Duration,
    codes: Mutex<HashMap<String, IssuedCode>>,
    assertions: Mutex<Vec<String>>,
    next_failure: Mutex<Option<String>>,
    hold: Mutex<Option<Arc<Semaphore>>>,
    session: Mutex<Option<AuthSession>>,
    deliveries: Mutex<u64>,
    last_code: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

impl MockAuthProvider {
    /// Create a mock provider that delivers random codes for manual entry
    pub fn new() -> Self {
        Self {
            delivery: MockDelivery::CodeSent,
            fixed_code: None,
            code_ttl: Duration::minutes(10),
            codes: Mutex::new(HashMap::new()),
            assertions: Mutex::new(Vec::new()),
            next_failure: Mutex::new(None),
            hold: Mutex::new(None),
            session: Mutex::new(None),
            deliveries: Mutex::new(0),
            last_code: Mutex::new(None),
        }
    }

    /// Configure how the provider resolves verification attempts
    pub fn with_delivery(mut self, delivery: MockDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Issue a known code instead of a random one, e.g. for demos
    pub fn with_fixed_code(mut self, code: impl Into<String>) -> Self {
        self.fixed_code = Some(code.into());
        self
    }

    /// Change how long issued codes stay valid
    pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    /// Seed a signed-in principal so that credential linking is possible
    pub fn with_principal(mut self, principal: PrincipalId) -> Self {
        self.session = Mutex::new(Some(AuthSession::new(principal, "mock-token", false)));
        self
    }

    /// Make the next delivery fail with the given provider error code
    pub fn fail_next_delivery(&self, code: impl Into<String>) {
        *lock(&self.next_failure) = Some(code.into());
    }

    /// Hold the next delivery until the returned gate receives a permit
    ///
    /// The call blocks until the test releases the gate with `add_permits(1)`,
    /// which lets a flow be cancelled while the dispatch is still in flight.
    pub fn hold_next_delivery(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *lock(&self.hold) = Some(gate.clone());
        gate
    }

    /// The most recently issued code, for demos and tests
    pub fn last_issued_code(&self) -> Option<String> {
        lock(&self.last_code).clone()
    }

    fn verify(&self, credential: &PhoneCredential) -> Result<(), ProviderError> {
        match credential {
            PhoneCredential::Code {
                verification_id,
                code,
            } => {
                let mut codes = lock(&self.codes);
                let issued = codes.get(verification_id.as_str()).ok_or_else(|| {
                    ProviderError::new("invalid-verification-id", "unknown verification session")
                })?;

                if Utc::now() - issued.issued_at >= self.code_ttl {
                    codes.remove(verification_id.as_str());
                    return Err(ProviderError::new(
                        "session-expired",
                        "the verification code has expired",
                    ));
                }

                if !constant_time_eq(issued.code.as_bytes(), code.as_bytes()) {
                    return Err(ProviderError::new(
                        "invalid-verification-code",
                        "the code does not match",
                    ));
                }

                // Codes are single-use
                codes.remove(verification_id.as_str());
                Ok(())
            }
            PhoneCredential::Assertion(proof) => {
                let mut assertions = lock(&self.assertions);
                match assertions.iter().position(|issued| issued == proof) {
                    Some(index) => {
                        assertions.remove(index);
                        Ok(())
                    }
                    None => Err(ProviderError::new(
                        "invalid-verification-code",
                        "unknown verification assertion",
                    )),
                }
            }
        }
    }
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn begin_verification(
        &self,
        phone: &str,
        resend_token: Option<ResendToken>,
    ) -> VerificationDispatch {
        let gate = lock(&self.hold).take();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if let Some(code) = lock(&self.next_failure).take() {
            warn!(
                event = "mock_delivery_failed",
                code = %code,
                "Scripted delivery failure"
            );
            return VerificationDispatch::Failed(ProviderError::new(
                code,
                "scripted delivery failure",
            ));
        }

        let delivery_number = {
            let mut deliveries = lock(&self.deliveries);
            *deliveries += 1;
            *deliveries
        };

        if self.delivery == MockDelivery::AutoComplete {
            let proof = format!("mock-proof-{}", Uuid::new_v4());
            lock(&self.assertions).push(proof.clone());

            info!(
                event = "mock_auto_completed",
                phone = %mask_phone(phone),
                "Verification auto-completed on device"
            );
            return VerificationDispatch::AutoCompleted(PhoneCredential::Assertion(proof));
        }

        let verification_id = VerificationId::new(format!("mock-session-{}", Uuid::new_v4()));
        let code = match &self.fixed_code {
            Some(code) => code.clone(),
            None => generate_code(),
        };
        lock(&self.codes).insert(
            verification_id.as_str().to_string(),
            IssuedCode {
                code: code.clone(),
                issued_at: Utc::now(),
            },
        );
        *lock(&self.last_code) = Some(code.clone());

        info!(
            event = "mock_code_delivered",
            phone = %mask_phone(phone),
            resend = resend_token.is_some(),
            code = %code,
            "Mock verification code issued (console delivery)"
        );

        let delivery = CodeDelivery {
            verification_id,
            resend_token: Some(delivery_number),
        };
        match self.delivery {
            MockDelivery::AutoRetrievalTimedOut => {
                VerificationDispatch::AutoRetrievalTimedOut(delivery)
            }
            _ => VerificationDispatch::CodeSent(delivery),
        }
    }

    async fn sign_in(&self, credential: PhoneCredential) -> Result<AuthSession, ProviderError> {
        self.verify(&credential)?;

        let session = AuthSession::new(
            PrincipalId::new(format!("mock-user-{}", Uuid::new_v4().simple())),
            format!("mock-token-{}", Uuid::new_v4().simple()),
            true,
        );
        *lock(&self.session) = Some(session.clone());

        info!(
            event = "mock_sign_in_completed",
            principal = %session.principal,
            "Signed in against the mock provider"
        );
        Ok(session)
    }

    async fn link_credential(
        &self,
        credential: PhoneCredential,
    ) -> Result<AuthSession, ProviderError> {
        let current = lock(&self.session).clone().ok_or_else(|| {
            ProviderError::new(
                "requires-recent-login",
                "no signed-in session to link against",
            )
        })?;

        self.verify(&credential)?;

        let session = AuthSession::new(
            current.principal,
            format!("mock-token-{}", Uuid::new_v4().simple()),
            false,
        );
        *lock(&self.session) = Some(session.clone());

        info!(
            event = "mock_link_completed",
            principal = %session.principal,
            "Linked phone credential against the mock provider"
        );
        Ok(session)
    }

    fn current_principal(&self) -> Option<PrincipalId> {
        lock(&self.session).as_ref().map(|s| s.principal.clone())
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
