//! The OTP verification workflow.
//!
//! One state machine backs every "we emailed you a code" screen. It sends
//! the code, collects it (and, for password resets, a new password), and
//! submits everything through an injected [`OtpBackend`].
//!
//! State lives behind a mutex that is never held across an `.await`. Each
//! backend call captures the current cancellation token while holding that
//! mutex and re-checks it under the mutex when the call returns, so a result
//! that arrives after [`OtpWorkflow::cancel`] never touches the fresh state.

use bikego_core::{ClientError, ConfirmPayload, OtpBackend};
use bikego_otp_utils::{validate_code, validate_reset, ResendThrottle, ThrottleState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{WorkflowConfig, WorkflowKind, RESEND_FAILED, SEND_FAILED};
use crate::state::{StepOutcome, WorkflowSnapshot, WorkflowState, WorkflowStep};

/// Callback run once when the workflow reaches `Succeeded`.
pub type SuccessContinuation = Arc<dyn Fn(&WorkflowSnapshot) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Inner {
    id: Uuid,
    kind: WorkflowKind,
    identity: String,
    config: WorkflowConfig,
    backend: Arc<dyn OtpBackend>,
    state: Mutex<WorkflowState>,
    throttle: ResendThrottle,
    epoch: Mutex<CancellationToken>,
    started: AtomicBool,
    succeeded_fired: AtomicBool,
    on_success: Option<SuccessContinuation>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        lock(&self.epoch).cancel();
    }
}

/// An email OTP verification workflow.
///
/// Cloning yields another handle to the same workflow.
#[derive(Clone)]
pub struct OtpWorkflow {
    inner: Arc<Inner>,
}

/// Builder for [`OtpWorkflow`].
pub struct OtpWorkflowBuilder {
    kind: WorkflowKind,
    identity: String,
    backend: Arc<dyn OtpBackend>,
    config: WorkflowConfig,
    on_success: Option<SuccessContinuation>,
}

impl OtpWorkflowBuilder {
    /// Sets the workflow configuration.
    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the continuation fired when the workflow succeeds.
    pub fn on_success<F>(mut self, continuation: F) -> Self
    where
        F: Fn(&WorkflowSnapshot) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(continuation));
        self
    }

    /// Builds the workflow in its initial `Dispatching` step.
    pub fn build(self) -> OtpWorkflow {
        let throttle = ResendThrottle::new(self.config.throttle());
        OtpWorkflow {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                kind: self.kind,
                identity: self.identity,
                state: Mutex::new(WorkflowState::new(self.config.code_length)),
                config: self.config,
                backend: self.backend,
                throttle,
                epoch: Mutex::new(CancellationToken::new()),
                started: AtomicBool::new(false),
                succeeded_fired: AtomicBool::new(false),
                on_success: self.on_success,
            }),
        }
    }
}

impl OtpWorkflow {
    /// Starts building a workflow for `identity`.
    pub fn builder(
        kind: WorkflowKind,
        identity: impl Into<String>,
        backend: Arc<dyn OtpBackend>,
    ) -> OtpWorkflowBuilder {
        OtpWorkflowBuilder {
            kind,
            identity: identity.into(),
            backend,
            config: WorkflowConfig::default(),
            on_success: None,
        }
    }

    /// Creates a workflow with the default configuration and no continuation.
    pub fn new(kind: WorkflowKind, identity: impl Into<String>, backend: Arc<dyn OtpBackend>) -> Self {
        Self::builder(kind, identity, backend).build()
    }

    /// Unique id of this workflow instance (used in logs).
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// The workflow shape.
    pub fn kind(&self) -> WorkflowKind {
        self.inner.kind
    }

    /// The email address codes are sent to.
    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    /// The workflow configuration.
    pub fn config(&self) -> &WorkflowConfig {
        &self.inner.config
    }

    /// Current step.
    pub fn step(&self) -> WorkflowStep {
        lock(&self.inner.state).step
    }

    /// Message shown on the current step, if any.
    pub fn error_message(&self) -> Option<String> {
        lock(&self.inner.state).error_message.clone()
    }

    /// Resend countdown and in-flight flag.
    pub fn resend_state(&self) -> ThrottleState {
        self.inner.throttle.state()
    }

    /// True while the resend countdown task is alive.
    pub fn is_countdown_running(&self) -> bool {
        self.inner.throttle.is_ticking()
    }

    /// Copy of the full observable state.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = lock(&self.inner.state);
        WorkflowSnapshot::capture(&self.inner.identity, &state, self.inner.throttle.state())
    }

    // ==================== Input ====================

    /// Types into code cell `index`. See [`bikego_otp_utils::CodeEntry::set_digit`].
    pub fn set_digit(&self, index: usize, raw: &str) -> bool {
        self.edit(|state| state.code.set_digit(index, raw))
    }

    /// Backspace on code cell `index`. Returns the focused cell.
    pub fn handle_backspace(&self, index: usize) -> usize {
        lock(&self.inner.state).code.handle_backspace(index)
    }

    /// Paste into the first code cell.
    pub fn handle_paste(&self, text: &str) -> bool {
        self.edit(|state| state.code.handle_paste(text))
    }

    /// Updates the new password field.
    pub fn set_new_secret(&self, value: impl Into<String>) -> bool {
        let value = value.into();
        self.edit(move |state| {
            state.new_secret = value;
            true
        })
    }

    /// Updates the confirm password field.
    pub fn set_confirm_secret(&self, value: impl Into<String>) -> bool {
        let value = value.into();
        self.edit(move |state| {
            state.confirm_secret = value;
            true
        })
    }

    fn edit(&self, apply: impl FnOnce(&mut WorkflowState) -> bool) -> bool {
        let mut state = lock(&self.inner.state);
        if state.step.is_terminal() {
            return false;
        }
        let accepted = apply(&mut state);
        if accepted {
            state.error_message = None;
        }
        accepted
    }

    // ==================== Dispatch ====================

    /// Sends the first code. Runs once per open; later calls are ignored
    /// until [`OtpWorkflow::cancel`] re-arms it.
    pub async fn start(&self) -> StepOutcome {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!(workflow_id = %self.inner.id, "auto dispatch already ran");
            return StepOutcome::Ignored;
        }
        self.dispatch().await
    }

    /// Retries sending the code while still in `Dispatching`.
    pub async fn dispatch(&self) -> StepOutcome {
        if self.step() != WorkflowStep::Dispatching {
            return StepOutcome::Ignored;
        }
        self.send_code(SEND_FAILED).await
    }

    /// Requests a fresh code once the cooldown is over.
    ///
    /// A no-op while the countdown runs or a dispatch is in flight. On success
    /// the code cells are emptied and the countdown restarts; on failure the
    /// cells are kept.
    pub async fn resend(&self) -> StepOutcome {
        let fallback = match self.step() {
            WorkflowStep::Dispatching => SEND_FAILED,
            WorkflowStep::AwaitingCode => RESEND_FAILED,
            _ => return StepOutcome::Ignored,
        };
        let throttle = &self.inner.throttle;
        if !throttle.is_idle() || throttle.is_dispatching() {
            debug!(
                workflow_id = %self.inner.id,
                remaining = throttle.remaining(),
                "resend blocked"
            );
            return StepOutcome::Ignored;
        }
        self.send_code(fallback).await
    }

    async fn send_code(&self, fallback: &'static str) -> StepOutcome {
        let inner = &self.inner;

        let token = {
            let mut state = lock(&inner.state);
            if inner.identity.trim().is_empty() {
                let message = ClientError::MissingIdentity.to_string();
                state.error_message = Some(message.clone());
                return StepOutcome::Rejected(message);
            }
            if !inner.throttle.begin_dispatch() {
                return StepOutcome::Ignored;
            }
            state.error_message = None;
            lock(&inner.epoch).clone()
        };

        let result = inner
            .backend
            .request_code(&inner.identity)
            .instrument(info_span!("otp_request_code", workflow_id = %inner.id))
            .await;

        let mut state = lock(&inner.state);
        if token.is_cancelled() {
            debug!(workflow_id = %inner.id, "dropping dispatch result after cancel");
            return StepOutcome::Discarded;
        }
        if state.step.is_terminal() {
            debug!(workflow_id = %inner.id, "dropping dispatch result after success");
            inner.throttle.end_dispatch();
            return StepOutcome::Discarded;
        }
        inner.throttle.end_dispatch();

        match result {
            Ok(()) => {
                state.code.clear();
                if state.step == WorkflowStep::Dispatching {
                    state.enter(WorkflowStep::AwaitingCode);
                } else {
                    state.error_message = None;
                }
                inner.throttle.on_dispatch_succeed();
                info!(workflow_id = %inner.id, step = %state.step, "code dispatched");
                StepOutcome::Accepted(state.step)
            }
            Err(err) => {
                warn!(workflow_id = %inner.id, error = %err, "code dispatch failed");
                let message = err.user_message().unwrap_or_else(|| fallback.to_string());
                state.error_message = Some(message.clone());
                StepOutcome::Rejected(message)
            }
        }
    }

    // ==================== Confirmation ====================

    /// Submits the typed code.
    ///
    /// Verify-only workflows confirm with the backend right away. Reset
    /// workflows move on to `AwaitingNewSecret`; the code is checked by the
    /// backend together with the new password. Ignored while a code dispatch
    /// is in flight.
    pub async fn submit_code(&self) -> StepOutcome {
        let (code, token) = {
            let mut state = lock(&self.inner.state);
            if state.step != WorkflowStep::AwaitingCode
                || state.confirming
                || self.inner.throttle.is_dispatching()
            {
                return StepOutcome::Ignored;
            }
            if let Err(err) = validate_code(&state.code) {
                debug!(workflow_id = %self.inner.id, rule = err.code(), "code rejected locally");
                let message = err.to_string();
                state.error_message = Some(message.clone());
                return StepOutcome::Rejected(message);
            }
            if self.inner.kind.sets_secret() {
                state.enter(WorkflowStep::AwaitingNewSecret);
                return StepOutcome::Accepted(WorkflowStep::AwaitingNewSecret);
            }
            state.confirming = true;
            state.error_message = None;
            (state.code.assembled_code(), lock(&self.inner.epoch).clone())
        };

        self.confirm(code, None, token).await
    }

    /// Submits the new password together with the code.
    pub async fn submit_new_secret(&self) -> StepOutcome {
        let (code, secret, token) = {
            let mut state = lock(&self.inner.state);
            if state.step != WorkflowStep::AwaitingNewSecret
                || state.confirming
                || self.inner.throttle.is_dispatching()
            {
                return StepOutcome::Ignored;
            }
            if let Err(err) = validate_reset(
                &state.code,
                &state.new_secret,
                &state.confirm_secret,
                self.inner.config.min_secret_len,
            ) {
                debug!(workflow_id = %self.inner.id, rule = err.code(), "new password rejected locally");
                let message = err.to_string();
                state.error_message = Some(message.clone());
                return StepOutcome::Rejected(message);
            }
            state.confirming = true;
            state.error_message = None;
            (
                state.code.assembled_code(),
                state.new_secret.clone(),
                lock(&self.inner.epoch).clone(),
            )
        };

        self.confirm(code, Some(ConfirmPayload::new_password(secret)), token)
            .await
    }

    async fn confirm(
        &self,
        code: String,
        payload: Option<ConfirmPayload>,
        token: CancellationToken,
    ) -> StepOutcome {
        let inner = &self.inner;
        let result = inner
            .backend
            .confirm_action(&inner.identity, &code, payload)
            .instrument(info_span!("otp_confirm", workflow_id = %inner.id))
            .await;

        {
            let mut state = lock(&inner.state);
            if token.is_cancelled() {
                debug!(workflow_id = %inner.id, "dropping confirmation result after cancel");
                return StepOutcome::Discarded;
            }
            state.confirming = false;

            if let Err(err) = result {
                warn!(workflow_id = %inner.id, error = %err, "confirmation failed");
                let message = err
                    .user_message()
                    .unwrap_or_else(|| inner.kind.confirm_failed_message().to_string());
                state.error_message = Some(message.clone());
                return StepOutcome::Rejected(message);
            }

            state.enter(WorkflowStep::Succeeded);
            inner.throttle.stop();
            info!(workflow_id = %inner.id, "workflow succeeded");
        }

        self.fire_success();
        StepOutcome::Accepted(WorkflowStep::Succeeded)
    }

    fn fire_success(&self) {
        if self.inner.succeeded_fired.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(continuation) = &self.inner.on_success {
            continuation(&self.snapshot());
        }
    }

    // ==================== Navigation ====================

    /// Goes back from the new-password step to the code step, keeping the code.
    pub fn back_to_code(&self) -> StepOutcome {
        let mut state = lock(&self.inner.state);
        if state.step != WorkflowStep::AwaitingNewSecret || state.confirming {
            return StepOutcome::Ignored;
        }
        state.enter(WorkflowStep::AwaitingCode);
        StepOutcome::Accepted(WorkflowStep::AwaitingCode)
    }

    /// Resets everything to the just-built state.
    ///
    /// Stops the countdown, invalidates in-flight calls and re-arms
    /// [`OtpWorkflow::start`]. Valid from any step.
    pub fn cancel(&self) {
        let inner = &self.inner;
        let mut state = lock(&inner.state);
        {
            let mut epoch = lock(&inner.epoch);
            epoch.cancel();
            *epoch = CancellationToken::new();
        }
        *state = WorkflowState::new(inner.config.code_length);
        inner.throttle.stop();
        inner.started.store(false, Ordering::SeqCst);
        inner.succeeded_fired.store(false, Ordering::SeqCst);
        debug!(workflow_id = %inner.id, "workflow reset");
    }
}

impl std::fmt::Debug for OtpWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpWorkflow")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("step", &self.step())
            .finish_non_exhaustive()
    }
}
