//! Phone verification flow controller.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{watch, Notify};
use tracing;

use crate::domain::entities::{AuthMode, VerificationSession, VerificationStatus, CODE_LENGTH};
use crate::domain::value_objects::{AuthSession, PhoneCredential};
use crate::errors::{
    DefaultErrorAdapter, DomainError, DomainResult, ErrorAdapter, ErrorKind, FlowError,
};
use crate::provider::{AuthProvider, CodeDelivery, ProviderError, VerificationDispatch};

use super::code_entry::{CodeEntry, CodeEntryView};
use super::config::FlowConfig;
use super::phone_utils::{is_plausible_e164, mask_phone};
use super::types::FlowUpdate;

/// Terminal result of a flow, held until `start` collects it
#[derive(Debug, Clone)]
enum FlowOutcome {
    Succeeded(AuthSession),
    Cancelled,
    Failed(DomainError),
}

/// Interior state guarded by the controller mutex
struct FlowState {
    session: VerificationSession,
    code_entry: CodeEntry,
    /// Validity epoch; bumped by cancel and by every new dispatch so that
    /// results of superseded awaits are discarded
    epoch: u64,
    auto_retrieval_timed_out: bool,
    outcome: Option<FlowOutcome>,
}

/// Controller for the phone verification flow
///
/// Owns the state machine from phone submission through code dispatch and
/// entry to the credential exchange. The provider is injected explicitly;
/// state snapshots are pushed through a watch channel and the overall result
/// is delivered by [`start`](PhoneVerificationController::start).
///
/// All methods take `&self`; the controller is designed to be shared behind
/// an `Arc` between the task awaiting `start` and the task feeding user
/// input. The interior mutex is never held across an await.
pub struct PhoneVerificationController<P, E = DefaultErrorAdapter>
where
    P: AuthProvider + ?Sized,
    E: ErrorAdapter,
{
    /// Auth provider the flow talks to
    provider: Arc<P>,
    /// Adapter translating provider errors into the flow taxonomy
    errors: Arc<E>,
    /// Authentication mode, fixed at construction
    mode: AuthMode,
    /// Controller configuration
    config: FlowConfig,
    /// Interior state
    state: Mutex<FlowState>,
    /// Push channel for state snapshots
    updates: watch::Sender<FlowUpdate>,
    /// Completion signal for `start`
    done: Notify,
}

impl<P> PhoneVerificationController<P, DefaultErrorAdapter>
where
    P: AuthProvider + ?Sized,
{
    /// Creates a controller with the default error adapter
    ///
    /// # Arguments
    ///
    /// * `provider` - Auth provider implementation
    /// * `mode` - Whether the flow signs in or links a credential
    /// * `config` - Controller configuration
    pub fn new(provider: Arc<P>, mode: AuthMode, config: FlowConfig) -> Self {
        Self::with_error_adapter(provider, Arc::new(DefaultErrorAdapter::new()), mode, config)
    }
}

impl<P, E> PhoneVerificationController<P, E>
where
    P: AuthProvider + ?Sized,
    E: ErrorAdapter,
{
    /// Creates a controller with a custom error adapter
    ///
    /// # Arguments
    ///
    /// * `provider` - Auth provider implementation
    /// * `errors` - Adapter classifying and formatting provider errors
    /// * `mode` - Whether the flow signs in or links a credential
    /// * `config` - Controller configuration
    pub fn with_error_adapter(
        provider: Arc<P>,
        errors: Arc<E>,
        mode: AuthMode,
        config: FlowConfig,
    ) -> Self {
        tracing::debug!(
            event = "flow_created",
            provider = provider.provider_name(),
            mode = ?mode,
            "Verification flow controller created"
        );
        let (updates, _) = watch::channel(FlowUpdate::idle());
        Self {
            provider,
            errors,
            mode,
            config,
            state: Mutex::new(FlowState {
                session: VerificationSession::new(mode),
                code_entry: CodeEntry::new(),
                epoch: 0,
                auto_retrieval_timed_out: false,
                outcome: None,
            }),
            updates,
            done: Notify::new(),
        }
    }

    /// Runs the flow to completion for the given phone number
    ///
    /// Checks the mode precondition, submits the number, then waits for the
    /// flow to finish. Code entry, resend, and cancellation happen through
    /// the other methods while this future is pending.
    ///
    /// # Arguments
    ///
    /// * `phone` - Phone number in E.164 format
    ///
    /// # Returns
    ///
    /// * `Ok(Some(session))` - Credential exchange succeeded
    /// * `Ok(None)` - The flow was cancelled
    /// * `Err(DomainError)` - The flow failed, or the input was rejected
    ///   before it started (in which case the flow stays idle)
    pub async fn start(&self, phone: &str) -> DomainResult<Option<AuthSession>> {
        self.check_mode_precondition()?;

        // Drive the submission and watch for a terminal outcome at the same
        // time: cancellation must resolve the flow even while the dispatch
        // is still in flight, in which case the abandoned call is dropped.
        // The outcome arm is polled first so a flow that is already resolved
        // (cancelled before this call, for instance) wins over whatever the
        // submission would have returned.
        let submit = self.submit_phone_number(phone);
        tokio::pin!(submit);
        let mut submitted = false;

        let outcome = loop {
            tokio::select! {
                biased;

                outcome = self.wait_for_outcome() => break outcome,
                result = submit.as_mut(), if !submitted => {
                    result?;
                    submitted = true;
                }
            }
        };

        match outcome {
            FlowOutcome::Succeeded(session) => Ok(Some(session)),
            FlowOutcome::Cancelled => Ok(None),
            FlowOutcome::Failed(error) => Err(error),
        }
    }

    /// Submits the phone number and awaits the provider's dispatch outcome
    ///
    /// Valid while idle; a call while a dispatch is already in flight is a
    /// silent no-op. The number must be non-empty, must look like E.164, and
    /// cannot change once set. A syntactically invalid number fails the flow
    /// without any provider traffic.
    pub async fn submit_phone_number(&self, phone: &str) -> DomainResult<()> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(DomainError::Validation {
                message: "Phone number must not be empty".to_string(),
            });
        }

        let (session_id, resend_token, epoch);
        {
            let mut state = self.state();
            // The number is immutable once set, whatever the state
            if let Some(existing) = &state.session.phone {
                if existing != phone {
                    return Err(DomainError::Validation {
                        message: "The phone number cannot change within a session".to_string(),
                    });
                }
            }
            if state.session.status == VerificationStatus::Sending {
                tracing::debug!(
                    session_id = %state.session.id,
                    event = "phone_submission_ignored",
                    "Phone submission ignored while a dispatch is in flight"
                );
                return Ok(());
            }
            if !state.session.accepts_phone_submission() {
                tracing::warn!(
                    session_id = %state.session.id,
                    status = ?state.session.status,
                    event = "phone_submission_rejected",
                    "Phone submission rejected by the current flow state"
                );
                return Err(DomainError::Flow(FlowError::PreconditionViolation {
                    message: "The flow does not accept a phone number in its current state"
                        .to_string(),
                }));
            }
            if !is_plausible_e164(phone) {
                tracing::warn!(
                    session_id = %state.session.id,
                    phone = %mask_phone(phone),
                    event = "phone_rejected",
                    "Rejected syntactically invalid phone number"
                );
                let message = "The phone number has an invalid format.".to_string();
                return Err(self.fail_locked(&mut state, ErrorKind::ProviderRejected, message));
            }

            state.session.phone = Some(phone.to_string());
            state.session.status = VerificationStatus::Sending;
            state.epoch += 1;
            session_id = state.session.id;
            resend_token = state.session.resend_token;
            epoch = state.epoch;
            self.publish(&state);
        }

        tracing::info!(
            session_id = %session_id,
            phone = %mask_phone(phone),
            event = "verification_dispatch_started",
            "Requesting phone verification from the provider"
        );

        let dispatch = self.provider.begin_verification(phone, resend_token).await;
        self.handle_dispatch(dispatch, epoch).await
    }

    /// Submits a complete six-digit code for the credential exchange
    ///
    /// Valid while waiting for code entry. An invalid-code rejection returns
    /// the flow to code entry with the cells cleared; any other rejection
    /// fails the flow.
    ///
    /// # Arguments
    ///
    /// * `code` - The six ASCII digits the user entered
    pub async fn submit_code(&self, code: &str) -> DomainResult<()> {
        let (session_id, verification_id, epoch);
        {
            let mut state = self.state();
            if state.session.status != VerificationStatus::AwaitingCode {
                return Err(DomainError::Flow(FlowError::PreconditionViolation {
                    message: "No verification code is currently expected".to_string(),
                }));
            }
            if code.len() != CODE_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
                return Err(DomainError::Validation {
                    message: format!("The verification code must be {} digits", CODE_LENGTH),
                });
            }
            verification_id =
                state
                    .session
                    .verification_id
                    .clone()
                    .ok_or_else(|| DomainError::Internal {
                        message: "Awaiting a code without a verification id".to_string(),
                    })?;
            state.session.status = VerificationStatus::Verifying;
            state.epoch += 1;
            session_id = state.session.id;
            epoch = state.epoch;
            self.publish(&state);
        }

        tracing::info!(
            session_id = %session_id,
            event = "code_submitted",
            "Submitting entered verification code"
        );

        self.exchange(PhoneCredential::from_code(verification_id, code), true, epoch)
            .await
    }

    /// Feeds one character into the focused code cell
    ///
    /// Filling the last cell submits the collected code exactly once.
    /// Outside of code entry the character is ignored.
    pub async fn enter_code_char(&self, ch: char) -> DomainResult<()> {
        let completed = {
            let mut state = self.state();
            if state.session.status != VerificationStatus::AwaitingCode {
                tracing::debug!(
                    session_id = %state.session.id,
                    event = "code_char_ignored",
                    "Ignoring code input outside of code entry"
                );
                return Ok(());
            }
            state.code_entry.enter(ch)
        };

        match completed {
            Some(code) => self.submit_code(&code).await,
            None => Ok(()),
        }
    }

    /// Moves focus back to an earlier code cell, clearing it and everything
    /// after it
    ///
    /// Ignored outside of code entry.
    pub fn focus_code_cell(&self, index: usize) {
        let mut state = self.state();
        if state.session.status != VerificationStatus::AwaitingCode {
            return;
        }
        state.code_entry.focus_cell(index);
    }

    /// Clears the cell behind the focus and steps back to it
    ///
    /// Ignored outside of code entry.
    pub fn code_backspace(&self) {
        let mut state = self.state();
        if state.session.status != VerificationStatus::AwaitingCode {
            return;
        }
        state.code_entry.backspace();
    }

    /// Requests a fresh code for the already-submitted phone number
    ///
    /// Valid while waiting for code entry, once the resend cooldown has
    /// elapsed. Passes the provider's resend token from the previous
    /// delivery back to it. The flow is back in `Sending` until the new
    /// dispatch resolves, so code entry is closed meanwhile.
    pub async fn resend_code(&self) -> DomainResult<()> {
        let (session_id, phone, resend_token, epoch);
        {
            let mut state = self.state();
            if state.session.status != VerificationStatus::AwaitingCode {
                return Err(DomainError::Flow(FlowError::PreconditionViolation {
                    message: "A code can only be resent while waiting for code entry".to_string(),
                }));
            }
            if !state.session.can_resend(self.config.resend_cooldown_seconds) {
                return Err(DomainError::Flow(FlowError::PreconditionViolation {
                    message: "The resend cooldown has not elapsed".to_string(),
                }));
            }
            phone = state
                .session
                .phone
                .clone()
                .ok_or_else(|| DomainError::Internal {
                    message: "Awaiting a code without a phone number".to_string(),
                })?;
            // Code entry closes while the new dispatch is in flight
            state.session.status = VerificationStatus::Sending;
            state.epoch += 1;
            session_id = state.session.id;
            resend_token = state.session.resend_token;
            epoch = state.epoch;
            self.publish(&state);
        }

        tracing::info!(
            session_id = %session_id,
            phone = %mask_phone(&phone),
            event = "code_resend_requested",
            "Requesting verification code resend"
        );

        let dispatch = self.provider.begin_verification(&phone, resend_token).await;
        self.handle_dispatch(dispatch, epoch).await
    }

    /// Cancels the flow
    ///
    /// From any non-terminal state this resolves `start` with `Ok(None)` and
    /// invalidates in-flight provider calls, whose results are then
    /// discarded. On a finished flow this is a no-op. Cancellation is not an
    /// error.
    pub fn cancel(&self) {
        let mut state = self.state();
        if state.session.is_terminal() {
            tracing::debug!(
                session_id = %state.session.id,
                event = "cancel_ignored",
                "Cancel called on a finished flow"
            );
            return;
        }
        state.epoch += 1;
        state.session.status = VerificationStatus::Cancelled;
        tracing::info!(
            session_id = %state.session.id,
            event = "flow_cancelled",
            "Verification flow cancelled"
        );
        self.resolve(&mut state, FlowOutcome::Cancelled);
        self.publish(&state);
    }

    /// Subscribes to state snapshots, starting with the current one
    pub fn subscribe(&self) -> watch::Receiver<FlowUpdate> {
        self.updates.subscribe()
    }

    /// Snapshot of the code entry cells and focus for rendering
    pub fn code_cells(&self) -> CodeEntryView {
        self.state().code_entry.view()
    }

    /// Copy of the current session entity
    pub fn session(&self) -> VerificationSession {
        self.state().session.clone()
    }

    /// Current lifecycle status
    pub fn status(&self) -> VerificationStatus {
        self.state().session.status
    }

    /// Checks the mode precondition against the provider's current principal
    ///
    /// Linking requires an authenticated principal, signing in requires
    /// none. Runs before any verification traffic.
    fn check_mode_precondition(&self) -> DomainResult<()> {
        let principal = self.provider.current_principal();
        let message = match (self.mode, principal) {
            (AuthMode::Link, None) => "Linking a phone number requires an authenticated principal",
            (AuthMode::SignIn, Some(_)) => "Signing in requires no authenticated principal",
            _ => return Ok(()),
        };

        let mut state = self.state();
        tracing::warn!(
            session_id = %state.session.id,
            mode = ?self.mode,
            event = "mode_precondition_failed",
            "Mode precondition failed before any provider call"
        );
        Err(self.fail_locked(&mut state, ErrorKind::PreconditionViolation, message.to_string()))
    }

    /// Routes a begin-verification outcome into the state machine
    async fn handle_dispatch(
        &self,
        dispatch: VerificationDispatch,
        epoch: u64,
    ) -> DomainResult<()> {
        match dispatch {
            VerificationDispatch::CodeSent(delivery) => {
                self.apply_code_delivery(delivery, false, epoch)
            }
            VerificationDispatch::AutoRetrievalTimedOut(delivery) => {
                self.apply_code_delivery(delivery, true, epoch)
            }
            VerificationDispatch::AutoCompleted(credential) => {
                self.auto_exchange(credential, epoch).await
            }
            VerificationDispatch::Failed(error) => self.apply_dispatch_failure(error, epoch),
        }
    }

    /// Records a code delivery and enters code entry
    fn apply_code_delivery(
        &self,
        delivery: CodeDelivery,
        timed_out: bool,
        epoch: u64,
    ) -> DomainResult<()> {
        let mut state = self.state();
        if state.epoch != epoch {
            tracing::debug!(
                session_id = %state.session.id,
                event = "stale_dispatch_discarded",
                "Discarding code delivery from a superseded attempt"
            );
            return Ok(());
        }

        let verification_id = delivery.verification_id.clone();
        state
            .session
            .record_code_delivery(delivery.verification_id, delivery.resend_token);
        if timed_out {
            state.auto_retrieval_timed_out = true;
            tracing::info!(
                session_id = %state.session.id,
                verification_id = %verification_id,
                event = "auto_retrieval_timed_out",
                "Code auto-retrieval timed out; waiting for manual entry"
            );
        } else {
            tracing::info!(
                session_id = %state.session.id,
                verification_id = %verification_id,
                event = "code_sent",
                "Verification code dispatched; waiting for manual entry"
            );
        }
        self.publish(&state);
        Ok(())
    }

    /// Fails the flow for a refused begin-verification call
    fn apply_dispatch_failure(&self, error: ProviderError, epoch: u64) -> DomainResult<()> {
        let mut state = self.state();
        if state.epoch != epoch {
            tracing::debug!(
                session_id = %state.session.id,
                event = "stale_dispatch_discarded",
                "Discarding dispatch failure from a superseded attempt"
            );
            return Ok(());
        }

        let kind = self.errors.classify(&error);
        let message = self.errors.format(&error);
        tracing::warn!(
            session_id = %state.session.id,
            code = %error.code,
            kind = ?kind,
            event = "verification_dispatch_failed",
            "Provider refused to start verification"
        );
        Err(self.fail_locked(&mut state, kind, message))
    }

    /// Exchanges an auto-completed credential after the configured delay
    async fn auto_exchange(&self, credential: PhoneCredential, epoch: u64) -> DomainResult<()> {
        {
            let mut state = self.state();
            if state.epoch != epoch {
                tracing::debug!(
                    session_id = %state.session.id,
                    event = "stale_dispatch_discarded",
                    "Discarding auto-completed credential from a superseded attempt"
                );
                return Ok(());
            }
            state.session.status = VerificationStatus::Verifying;
            tracing::info!(
                session_id = %state.session.id,
                event = "auto_completed",
                "Code retrieval auto-completed; exchanging credential"
            );
            self.publish(&state);
        }

        if !self.config.auto_exchange_delay.is_zero() {
            tokio::time::sleep(self.config.auto_exchange_delay).await;
            let state = self.state();
            if state.epoch != epoch {
                tracing::debug!(
                    session_id = %state.session.id,
                    event = "stale_exchange_discarded",
                    "Exchange discarded during the pacing delay"
                );
                return Ok(());
            }
        }

        self.exchange(credential, false, epoch).await
    }

    /// Runs the credential exchange for the session's mode
    ///
    /// `manual_entry` marks an exchange built from a user-entered code; only
    /// those can return to code entry on an invalid-code rejection.
    async fn exchange(
        &self,
        credential: PhoneCredential,
        manual_entry: bool,
        epoch: u64,
    ) -> DomainResult<()> {
        let result = match self.mode {
            AuthMode::SignIn => self.provider.sign_in(credential).await,
            AuthMode::Link => self.provider.link_credential(credential).await,
        };

        let mut state = self.state();
        if state.epoch != epoch {
            tracing::debug!(
                session_id = %state.session.id,
                event = "stale_exchange_discarded",
                "Discarding credential exchange outcome from a superseded attempt"
            );
            return Ok(());
        }

        match result {
            Ok(auth) => {
                state.session.status = VerificationStatus::Succeeded;
                tracing::info!(
                    session_id = %state.session.id,
                    principal = %auth.principal,
                    event = "verification_succeeded",
                    "Credential exchange succeeded"
                );
                self.resolve(&mut state, FlowOutcome::Succeeded(auth));
                self.publish(&state);
                Ok(())
            }
            Err(error) => {
                let kind = self.errors.classify(&error);
                let message = self.errors.format(&error);
                if kind == ErrorKind::InvalidCode && manual_entry {
                    tracing::warn!(
                        session_id = %state.session.id,
                        code = %error.code,
                        event = "invalid_code",
                        "Provider rejected the entered code; awaiting re-entry"
                    );
                    state.session.record_invalid_code(message);
                    state.code_entry.clear();
                    self.publish(&state);
                    return Err(DomainError::Flow(FlowError::InvalidCode));
                }

                // An auto-completed exchange never opened code entry, so
                // there is nothing to return to and the rejection is
                // terminal.
                let kind = if kind == ErrorKind::InvalidCode {
                    ErrorKind::ProviderRejected
                } else {
                    kind
                };
                tracing::warn!(
                    session_id = %state.session.id,
                    code = %error.code,
                    kind = ?kind,
                    event = "credential_exchange_failed",
                    "Credential exchange failed"
                );
                Err(self.fail_locked(&mut state, kind, message))
            }
        }
    }

    /// Waits until a terminal outcome is available
    async fn wait_for_outcome(&self) -> FlowOutcome {
        loop {
            let notified = self.done.notified();
            tokio::pin!(notified);
            // Register before checking so a signal between the check and the
            // await is not lost
            notified.as_mut().enable();

            let outcome = self.state().outcome.clone();
            if let Some(outcome) = outcome {
                return outcome;
            }
            notified.await;
        }
    }

    /// Records a terminal outcome and wakes `start`
    ///
    /// The first outcome wins; later attempts keep the original.
    fn resolve(&self, state: &mut FlowState, outcome: FlowOutcome) {
        if state.outcome.is_none() {
            state.outcome = Some(outcome);
        }
        self.done.notify_waiters();
    }

    /// Fails the session and resolves the flow with the classified error
    fn fail_locked(
        &self,
        state: &mut FlowState,
        kind: ErrorKind,
        message: String,
    ) -> DomainError {
        state.session.record_failure(kind, message.clone());
        let error = DomainError::Flow(FlowError::classified(kind, message));
        self.resolve(state, FlowOutcome::Failed(error.clone()));
        self.publish(state);
        error
    }

    /// Pushes a snapshot of the current state to subscribers
    fn publish(&self, state: &FlowState) {
        self.updates.send_replace(FlowUpdate {
            status: state.session.status,
            last_error: state.session.last_error.clone(),
            awaiting_code: state.session.status == VerificationStatus::AwaitingCode,
            auto_retrieval_timed_out: state.auto_retrieval_timed_out,
            next_resend_at: state
                .session
                .next_resend_at(self.config.resend_cooldown_seconds),
        });
    }

    /// Locks the interior state, recovering the guard if a writer panicked
    fn state(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
