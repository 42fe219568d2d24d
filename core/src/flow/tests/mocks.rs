//! Mock implementations for testing the flow controller

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::domain::value_objects::{AuthSession, PhoneCredential, PrincipalId, ResendToken};
use crate::provider::{AuthProvider, ProviderError, VerificationDispatch};

/// Scriptable auth provider recording every call
///
/// Outcomes are queued up front; each provider call pops the next one.
/// A call can be gated on a zero-permit semaphore so tests control when the
/// outcome is released.
pub struct MockProvider {
    dispatches: Mutex<VecDeque<VerificationDispatch>>,
    exchanges: Mutex<VecDeque<Result<AuthSession, ProviderError>>>,
    principal: Mutex<Option<PrincipalId>>,
    begin_gate: Mutex<Option<Arc<Semaphore>>>,
    exchange_gate: Mutex<Option<Arc<Semaphore>>>,
    pub begin_calls: Mutex<Vec<(String, Option<ResendToken>)>>,
    pub sign_in_calls: Mutex<Vec<PhoneCredential>>,
    pub link_calls: Mutex<Vec<PhoneCredential>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            dispatches: Mutex::new(VecDeque::new()),
            exchanges: Mutex::new(VecDeque::new()),
            principal: Mutex::new(None),
            begin_gate: Mutex::new(None),
            exchange_gate: Mutex::new(None),
            begin_calls: Mutex::new(Vec::new()),
            sign_in_calls: Mutex::new(Vec::new()),
            link_calls: Mutex::new(Vec::new()),
        }
    }

    /// Queues the outcome for the next begin-verification call
    pub fn push_dispatch(&self, dispatch: VerificationDispatch) {
        self.dispatches.lock().unwrap().push_back(dispatch);
    }

    /// Queues the outcome for the next sign-in or link call
    pub fn push_exchange(&self, result: Result<AuthSession, ProviderError>) {
        self.exchanges.lock().unwrap().push_back(result);
    }

    pub fn set_principal(&self, principal: Option<PrincipalId>) {
        *self.principal.lock().unwrap() = principal;
    }

    /// Gates begin-verification calls on the returned semaphore
    ///
    /// Each call records itself, then waits for one permit before resolving.
    pub fn gate_begin(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.begin_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Gates sign-in and link calls on the returned semaphore
    pub fn gate_exchange(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.exchange_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn begin_call_count(&self) -> usize {
        self.begin_calls.lock().unwrap().len()
    }

    pub fn exchange_call_count(&self) -> usize {
        self.sign_in_calls.lock().unwrap().len() + self.link_calls.lock().unwrap().len()
    }

    async fn wait_gate(gate: Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            let permit = gate.acquire().await.unwrap();
            permit.forget();
        }
    }
}

#[async_trait]
impl AuthProvider for MockProvider {
    async fn begin_verification(
        &self,
        phone: &str,
        resend_token: Option<ResendToken>,
    ) -> VerificationDispatch {
        self.begin_calls
            .lock()
            .unwrap()
            .push((phone.to_string(), resend_token));

        let gate = self.begin_gate.lock().unwrap().clone();
        Self::wait_gate(gate).await;

        self.dispatches.lock().unwrap().pop_front().unwrap_or_else(|| {
            VerificationDispatch::Failed(ProviderError::new(
                "internal-error",
                "no scripted dispatch",
            ))
        })
    }

    async fn sign_in(&self, credential: PhoneCredential) -> Result<AuthSession, ProviderError> {
        self.sign_in_calls.lock().unwrap().push(credential);

        let gate = self.exchange_gate.lock().unwrap().clone();
        Self::wait_gate(gate).await;

        self.exchanges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::new("internal-error", "no scripted exchange")))
    }

    async fn link_credential(
        &self,
        credential: PhoneCredential,
    ) -> Result<AuthSession, ProviderError> {
        self.link_calls.lock().unwrap().push(credential);

        let gate = self.exchange_gate.lock().unwrap().clone();
        Self::wait_gate(gate).await;

        self.exchanges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::new("internal-error", "no scripted exchange")))
    }

    fn current_principal(&self) -> Option<PrincipalId> {
        self.principal.lock().unwrap().clone()
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

/// Builds a session the mock hands out on success
pub fn test_session(principal: &str) -> AuthSession {
    AuthSession::new(PrincipalId::new(principal), "token-abc", false)
}
