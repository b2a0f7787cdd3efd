//! Hosts that bind an [`OtpWorkflow`] to a concrete use case.
//!
//! A host owns at most one live workflow. Opening it builds a fresh workflow
//! and sends the first code; closing it cancels the workflow and drops it,
//! so nothing from one attempt leaks into the next.

use async_trait::async_trait;
use bikego_core::{ClientError, ClientResult, ConfirmPayload, OtpBackend, SessionContext};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{AuthApi, RegistrationRequest};
use crate::config::{OtpPurpose, WorkflowConfig};
use crate::state::{StepOutcome, WorkflowSnapshot};
use crate::workflow::OtpWorkflow;

/// Where the browser is sent after a successful registration or reset.
pub const LOGIN_ROUTE: &str = "/login";

/// Errors raised by a [`WorkflowHost`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host has no open workflow.
    #[error("No verification is in progress")]
    NotOpen,

    /// Looking up the identity failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// What the host shows once its workflow succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Success banner text.
    pub message: String,
    /// Route to navigate to, if any.
    pub redirect: Option<String>,
    /// Delay before the host closes itself, if it does.
    pub close_after: Option<Duration>,
}

/// [`OtpBackend`] for account activation.
///
/// Every dispatch re-submits the registration form; the backend answers by
/// emailing a fresh code.
#[derive(Clone)]
pub struct RegistrationBackend {
    api: Arc<dyn AuthApi>,
    request: RegistrationRequest,
}

impl RegistrationBackend {
    pub fn new(api: Arc<dyn AuthApi>, request: RegistrationRequest) -> Self {
        Self { api, request }
    }
}

#[async_trait]
impl OtpBackend for RegistrationBackend {
    async fn request_code(&self, _identity: &str) -> ClientResult<()> {
        self.api.register(&self.request).await.map(|_| ())
    }

    async fn confirm_action(
        &self,
        identity: &str,
        code: &str,
        _payload: Option<ConfirmPayload>,
    ) -> ClientResult<()> {
        self.api.verify_registration(identity, code).await.map(|_| ())
    }
}

/// [`OtpBackend`] for the forgot-password and change-password flows.
#[derive(Clone)]
pub struct PasswordResetBackend {
    api: Arc<dyn AuthApi>,
}

impl PasswordResetBackend {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl OtpBackend for PasswordResetBackend {
    async fn request_code(&self, identity: &str) -> ClientResult<()> {
        self.api.forgot_password(identity).await.map(|_| ())
    }

    async fn confirm_action(
        &self,
        identity: &str,
        code: &str,
        payload: Option<ConfirmPayload>,
    ) -> ClientResult<()> {
        let payload =
            payload.ok_or_else(|| ClientError::internal("password reset without a new password"))?;
        self.api
            .reset_password(identity, code, &payload.new_password)
            .await
            .map(|_| ())
    }
}

enum Target {
    Registration(RegistrationRequest),
    PasswordReset(String),
    ChangePassword(SessionContext),
}

struct CloseTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    workflow: Option<OtpWorkflow>,
    confirmation: Option<Confirmation>,
    close_task: Option<CloseTask>,
    generation: u64,
}

struct HostInner {
    purpose: OtpPurpose,
    target: Target,
    api: Arc<dyn AuthApi>,
    config: WorkflowConfig,
    slot: Mutex<Slot>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Binds an OTP workflow to one of the storefront's three call sites.
#[derive(Clone)]
pub struct WorkflowHost {
    inner: Arc<HostInner>,
}

impl WorkflowHost {
    fn with_target(
        purpose: OtpPurpose,
        target: Target,
        api: Arc<dyn AuthApi>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            inner: Arc::new(HostInner {
                purpose,
                target,
                api,
                config,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Account activation after the registration form.
    pub fn registration(
        api: Arc<dyn AuthApi>,
        request: RegistrationRequest,
        config: WorkflowConfig,
    ) -> Self {
        Self::with_target(
            OtpPurpose::Registration,
            Target::Registration(request),
            api,
            config,
        )
    }

    /// "Forgot password" from the login page.
    pub fn password_reset(
        api: Arc<dyn AuthApi>,
        email: impl Into<String>,
        config: WorkflowConfig,
    ) -> Self {
        Self::with_target(
            OtpPurpose::PasswordReset,
            Target::PasswordReset(email.into()),
            api,
            config,
        )
    }

    /// "Change password" dialog for the signed-in user.
    pub fn change_password(
        api: Arc<dyn AuthApi>,
        session: SessionContext,
        config: WorkflowConfig,
    ) -> Self {
        Self::with_target(
            OtpPurpose::ChangePassword,
            Target::ChangePassword(session),
            api,
            config,
        )
    }

    pub fn purpose(&self) -> OtpPurpose {
        self.inner.purpose
    }

    /// True while a workflow is live.
    pub fn is_open(&self) -> bool {
        lock(&self.inner.slot).workflow.is_some()
    }

    /// The live workflow.
    pub fn workflow(&self) -> Result<OtpWorkflow, HostError> {
        lock(&self.inner.slot)
            .workflow
            .clone()
            .ok_or(HostError::NotOpen)
    }

    /// The success state, once the workflow has succeeded.
    pub fn confirmation(&self) -> Option<Confirmation> {
        lock(&self.inner.slot).confirmation.clone()
    }

    /// Opens the host and sends the first code.
    ///
    /// Calling this while already open does nothing and returns
    /// [`StepOutcome::Ignored`].
    pub async fn open(&self) -> Result<StepOutcome, HostError> {
        if self.is_open() {
            return Ok(StepOutcome::Ignored);
        }

        let identity = self.resolve_identity().await?;
        let backend = self.backend();
        let weak = Arc::downgrade(&self.inner);

        let workflow = {
            let mut slot = lock(&self.inner.slot);
            if slot.workflow.is_some() {
                return Ok(StepOutcome::Ignored);
            }
            slot.generation += 1;
            let generation = slot.generation;
            let workflow = OtpWorkflow::builder(self.inner.purpose.kind(), identity, backend)
                .config(self.inner.config.clone())
                .on_success(move |snapshot| on_workflow_success(&weak, generation, snapshot))
                .build();
            slot.workflow = Some(workflow.clone());
            slot.confirmation = None;
            workflow
        };

        info!(
            purpose = self.inner.purpose.as_str(),
            workflow_id = %workflow.id(),
            "verification opened"
        );
        Ok(workflow.start().await)
    }

    /// Closes the host: cancels the workflow and any pending auto-close.
    ///
    /// Returns false if nothing was open.
    pub fn close(&self) -> bool {
        close_slot(&mut lock(&self.inner.slot))
    }

    async fn resolve_identity(&self) -> Result<String, HostError> {
        match &self.inner.target {
            Target::Registration(request) => Ok(request.email.clone()),
            Target::PasswordReset(email) => Ok(email.clone()),
            Target::ChangePassword(session) => Ok(session.identity().await?),
        }
    }

    fn backend(&self) -> Arc<dyn OtpBackend> {
        let api = Arc::clone(&self.inner.api);
        match &self.inner.target {
            Target::Registration(request) => {
                Arc::new(RegistrationBackend::new(api, request.clone()))
            }
            Target::PasswordReset(_) | Target::ChangePassword(_) => {
                Arc::new(PasswordResetBackend::new(api))
            }
        }
    }
}

impl std::fmt::Debug for WorkflowHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowHost")
            .field("purpose", &self.inner.purpose)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Drop for HostInner {
    fn drop(&mut self) {
        let slot = self
            .slot
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        close_slot(slot);
    }
}

fn close_slot(slot: &mut Slot) -> bool {
    if let Some(task) = slot.close_task.take() {
        task.token.cancel();
        task.handle.abort();
    }
    slot.confirmation = None;
    slot.generation += 1;
    match slot.workflow.take() {
        Some(workflow) => {
            workflow.cancel();
            debug!(workflow_id = %workflow.id(), "verification closed");
            true
        }
        None => false,
    }
}

fn confirmation_for(purpose: OtpPurpose, config: &WorkflowConfig) -> Confirmation {
    match purpose {
        OtpPurpose::Registration => Confirmation {
            message: "Account verified successfully".to_string(),
            redirect: Some(LOGIN_ROUTE.to_string()),
            close_after: None,
        },
        OtpPurpose::PasswordReset => Confirmation {
            message: "Password reset successfully".to_string(),
            redirect: Some(LOGIN_ROUTE.to_string()),
            close_after: None,
        },
        OtpPurpose::ChangePassword => Confirmation {
            message: "Password changed successfully".to_string(),
            redirect: None,
            close_after: Some(config.success_display_delay()),
        },
    }
}

fn on_workflow_success(host: &Weak<HostInner>, generation: u64, snapshot: &WorkflowSnapshot) {
    let Some(inner) = host.upgrade() else {
        return;
    };
    let mut slot = lock(&inner.slot);
    if slot.generation != generation {
        return;
    }

    let confirmation = confirmation_for(inner.purpose, &inner.config);
    info!(
        purpose = inner.purpose.as_str(),
        step = %snapshot.step,
        "verification succeeded"
    );

    if let Some(delay) = confirmation.close_after {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let token = CancellationToken::new();
                let child = token.clone();
                let weak = Arc::downgrade(&inner);
                let handle = runtime.spawn(async move {
                    tokio::select! {
                        _ = child.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {
                            if let Some(inner) = weak.upgrade() {
                                let mut slot = lock(&inner.slot);
                                if slot.generation == generation {
                                    slot.close_task = None;
                                    close_slot(&mut slot);
                                }
                            }
                        }
                    }
                });
                if let Some(previous) = slot.close_task.replace(CloseTask { token, handle }) {
                    previous.token.cancel();
                }
            }
            Err(_) => warn!("no tokio runtime; dialog will not close by itself"),
        }
    }

    slot.confirmation = Some(confirmation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockAuthApi;

    #[tokio::test]
    async fn test_reset_backend_requires_payload() {
        let mut api = MockAuthApi::new();
        api.expect_reset_password().never();
        let backend = PasswordResetBackend::new(Arc::new(api));
        let err = backend
            .confirm_action("a@b.com", "123456", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InternalError { .. }));
    }

    #[tokio::test]
    async fn test_registration_backend_resubmits_form() {
        let mut api = MockAuthApi::new();
        api.expect_register()
            .withf(|request| request.email == "an@example.com")
            .times(2)
            .returning(|_| Ok("OTP sent".to_string()));
        api.expect_verify_registration()
            .withf(|email, otp| email == "an@example.com" && otp == "123456")
            .returning(|_, _| Ok("verified".to_string()));

        let backend = RegistrationBackend::new(
            Arc::new(api),
            RegistrationRequest {
                first_name: "An".into(),
                last_name: "Nguyen".into(),
                email: "an@example.com".into(),
                phone: "0900000000".into(),
                password: "secret1".into(),
            },
        );
        backend.request_code("an@example.com").await.unwrap();
        backend.request_code("an@example.com").await.unwrap();
        backend
            .confirm_action("an@example.com", "123456", None)
            .await
            .unwrap();
    }

    #[test]
    fn test_confirmations() {
        let config = WorkflowConfig::default();
        let registration = confirmation_for(OtpPurpose::Registration, &config);
        assert_eq!(registration.message, "Account verified successfully");
        assert_eq!(registration.redirect.as_deref(), Some("/login"));

        let change = confirmation_for(OtpPurpose::ChangePassword, &config);
        assert_eq!(change.redirect, None);
        assert_eq!(change.close_after, Some(Duration::from_secs(2)));
    }
}
