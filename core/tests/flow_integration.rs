//! Integration tests driving the verification flow through the public API

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use pf_core::domain::entities::{AuthMode, VerificationStatus};
    use pf_core::domain::value_objects::{
        AuthSession, PhoneCredential, PrincipalId, ResendToken, VerificationId,
    };
    use pf_core::errors::{DomainError, FlowError};
    use pf_core::flow::{FlowConfig, PhoneVerificationController};
    use pf_core::provider::{AuthProvider, CodeDelivery, ProviderError, VerificationDispatch};

    // Provider that issues numbered verification handles and checks the
    // submitted code against a fixed expected one
    struct ScriptedPhoneProvider {
        expected_code: String,
        principal: Option<PrincipalId>,
        calls: RwLock<ProviderCalls>,
    }

    #[derive(Default)]
    struct ProviderCalls {
        deliveries: u32,
        delivery_tokens: Vec<Option<ResendToken>>,
        sign_ins: Vec<PhoneCredential>,
        links: Vec<PhoneCredential>,
    }

    impl ScriptedPhoneProvider {
        fn new(expected_code: &str, principal: Option<PrincipalId>) -> Self {
            Self {
                expected_code: expected_code.to_string(),
                principal,
                calls: RwLock::new(ProviderCalls::default()),
            }
        }

        fn check_code(&self, credential: &PhoneCredential) -> Result<(), ProviderError> {
            match credential {
                PhoneCredential::Code { code, .. } if *code == self.expected_code => Ok(()),
                PhoneCredential::Code { .. } => Err(ProviderError::new(
                    "invalid-verification-code",
                    "the code does not match",
                )),
                PhoneCredential::Assertion(_) => Ok(()),
            }
        }
    }

    #[async_trait]
    impl AuthProvider for ScriptedPhoneProvider {
        async fn begin_verification(
            &self,
            _phone: &str,
            resend_token: Option<ResendToken>,
        ) -> VerificationDispatch {
            let mut calls = self.calls.write().await;
            calls.deliveries += 1;
            calls.delivery_tokens.push(resend_token);
            VerificationDispatch::CodeSent(CodeDelivery {
                verification_id: VerificationId::new(format!("session-info-{}", calls.deliveries)),
                resend_token: Some(calls.deliveries as u64),
            })
        }

        async fn sign_in(
            &self,
            credential: PhoneCredential,
        ) -> Result<AuthSession, ProviderError> {
            self.calls.write().await.sign_ins.push(credential.clone());
            self.check_code(&credential)?;
            Ok(AuthSession::new(
                PrincipalId::new("new-user-1"),
                "id-token",
                true,
            ))
        }

        async fn link_credential(
            &self,
            credential: PhoneCredential,
        ) -> Result<AuthSession, ProviderError> {
            self.calls.write().await.links.push(credential.clone());
            self.check_code(&credential)?;
            match &self.principal {
                Some(principal) => Ok(AuthSession::new(principal.clone(), "id-token", false)),
                None => Err(ProviderError::new(
                    "requires-recent-login",
                    "no signed-in user to link against",
                )),
            }
        }

        fn current_principal(&self) -> Option<PrincipalId> {
            self.principal.clone()
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_manual_sign_in_journey() {
        let provider = Arc::new(ScriptedPhoneProvider::new("428671", None));
        let controller = Arc::new(PhoneVerificationController::new(
            provider.clone(),
            AuthMode::SignIn,
            FlowConfig::default(),
        ));

        let mut updates = controller.subscribe();
        assert_eq!(updates.borrow().status, VerificationStatus::Idle);

        let flow = tokio::spawn({
            let controller = controller.clone();
            async move { controller.start("+14155550123").await }
        });

        // Step 1: the provider delivers a code and the flow waits for entry
        updates
            .wait_for(|update| update.status == VerificationStatus::AwaitingCode)
            .await
            .unwrap();
        assert!(updates.borrow().awaiting_code);
        assert_eq!(
            controller.session().verification_id,
            Some(VerificationId::new("session-info-1"))
        );

        // Step 2: a mistyped code sends the flow back to entry
        let mut results = Vec::new();
        for ch in "428670".chars() {
            results.push(controller.enter_code_char(ch).await);
        }
        assert!(matches!(
            results.pop(),
            Some(Err(DomainError::Flow(FlowError::InvalidCode)))
        ));
        assert_eq!(controller.status(), VerificationStatus::AwaitingCode);
        assert!(controller
            .code_cells()
            .cells
            .iter()
            .all(|cell| cell.is_none()));

        // Step 3: the corrected code completes the journey
        for ch in "428671".chars() {
            controller.enter_code_char(ch).await.unwrap();
        }

        let session = flow
            .await
            .unwrap()
            .unwrap()
            .expect("expected an authenticated session");
        assert_eq!(session.principal.as_str(), "new-user-1");
        assert!(session.is_new_principal);
        assert_eq!(updates.borrow().status, VerificationStatus::Succeeded);

        // Both attempts went through the same verification handle
        let calls = provider.calls.read().await;
        assert_eq!(calls.deliveries, 1);
        assert_eq!(calls.sign_ins.len(), 2);
        assert!(calls.sign_ins.iter().all(|credential| {
            credential.verification_id() == Some(&VerificationId::new("session-info-1"))
        }));
    }

    #[tokio::test]
    async fn test_cancellation_journey_yields_no_session() {
        let provider = Arc::new(ScriptedPhoneProvider::new("428671", None));
        let controller = Arc::new(PhoneVerificationController::new(
            provider.clone(),
            AuthMode::SignIn,
            FlowConfig::default(),
        ));

        let mut updates = controller.subscribe();
        let flow = tokio::spawn({
            let controller = controller.clone();
            async move { controller.start("+14155550123").await }
        });

        updates
            .wait_for(|update| update.status == VerificationStatus::AwaitingCode)
            .await
            .unwrap();

        // The user types a few cells, then abandons the flow
        for ch in "428".chars() {
            controller.enter_code_char(ch).await.unwrap();
        }
        controller.cancel();

        assert_eq!(flow.await.unwrap().unwrap(), None);
        assert_eq!(controller.status(), VerificationStatus::Cancelled);
        assert!(provider.calls.read().await.sign_ins.is_empty());
    }

    #[tokio::test]
    async fn test_link_journey_uses_existing_principal() {
        let provider = Arc::new(ScriptedPhoneProvider::new(
            "428671",
            Some(PrincipalId::new("existing-user")),
        ));
        let controller = Arc::new(PhoneVerificationController::new(
            provider.clone(),
            AuthMode::Link,
            FlowConfig::default(),
        ));

        let mut updates = controller.subscribe();
        let flow = tokio::spawn({
            let controller = controller.clone();
            async move { controller.start("+14155550123").await }
        });

        updates
            .wait_for(|update| update.status == VerificationStatus::AwaitingCode)
            .await
            .unwrap();
        controller.submit_code("428671").await.unwrap();

        let session = flow
            .await
            .unwrap()
            .unwrap()
            .expect("expected an authenticated session");
        assert_eq!(session.principal.as_str(), "existing-user");
        assert!(!session.is_new_principal);

        // The linking path was taken, not sign-in
        let calls = provider.calls.read().await;
        assert_eq!(calls.links.len(), 1);
        assert!(calls.sign_ins.is_empty());
    }

    #[tokio::test]
    async fn test_resend_journey_issues_fresh_handle() {
        let provider = Arc::new(ScriptedPhoneProvider::new("428671", None));
        let config = FlowConfig {
            resend_cooldown_seconds: 0,
            ..FlowConfig::default()
        };
        let controller = Arc::new(PhoneVerificationController::new(
            provider.clone(),
            AuthMode::SignIn,
            config,
        ));

        let mut updates = controller.subscribe();
        let flow = tokio::spawn({
            let controller = controller.clone();
            async move { controller.start("+14155550123").await }
        });

        updates
            .wait_for(|update| update.status == VerificationStatus::AwaitingCode)
            .await
            .unwrap();

        // Step 1: the user asks for another code
        controller.resend_code().await.unwrap();
        assert_eq!(
            controller.session().verification_id,
            Some(VerificationId::new("session-info-2"))
        );

        // Step 2: entry proceeds against the fresh handle
        controller.submit_code("428671").await.unwrap();
        assert!(flow.await.unwrap().unwrap().is_some());

        let calls = provider.calls.read().await;
        assert_eq!(calls.deliveries, 2);
        // The second delivery carried the token from the first
        assert_eq!(calls.delivery_tokens, vec![None, Some(1)]);
        assert_eq!(
            calls.sign_ins.last().and_then(|c| c.verification_id()),
            Some(&VerificationId::new("session-info-2"))
        );
    }
}
