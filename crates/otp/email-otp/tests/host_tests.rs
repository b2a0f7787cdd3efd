//! Integration tests for the workflow hosts
//!
//! This test suite covers:
//! - Registration confirmation
//! - Password reset from the login page
//! - Change password with the session identity and delayed close
//! - Open/close lifecycle

use async_trait::async_trait;
use bikego_adapter_memory::MemorySessionStore;
use bikego_core::{ClientError, ClientResult, Role, Session, SessionContext, SessionUser};
use bikego_email_otp::{
    AuthApi, HostError, LoginResponse, RegistrationRequest, StepOutcome, WorkflowConfig,
    WorkflowHost, WorkflowStep,
};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Api {}

    #[async_trait]
    impl AuthApi for Api {
        async fn register(&self, request: &RegistrationRequest) -> ClientResult<String>;
        async fn verify_registration(&self, email: &str, otp: &str) -> ClientResult<String>;
        async fn forgot_password(&self, email: &str) -> ClientResult<String>;
        async fn reset_password(
            &self,
            email: &str,
            otp: &str,
            new_password: &str,
        ) -> ClientResult<String>;
        async fn login(&self, identifier: &str, password: &str) -> ClientResult<LoginResponse>;
    }
}

fn registration_request() -> RegistrationRequest {
    RegistrationRequest {
        first_name: "An".into(),
        last_name: "Nguyen".into(),
        email: "an@example.com".into(),
        phone: "0900000000".into(),
        password: "secret1".into(),
    }
}

fn signed_in(email: Option<&str>) -> SessionContext {
    let mut user = SessionUser::new(3, "An", Role::Customer);
    if let Some(email) = email {
        user = user.with_email(email);
    }
    let store = MemorySessionStore::with_session(Session::new("tok", user));
    SessionContext::new(Arc::new(store))
}

mod registration_tests {
    use super::*;

    #[tokio::test]
    async fn test_registration_confirmation() {
        let mut api = MockApi::new();
        api.expect_register()
            .times(1)
            .returning(|_| Ok("Registration successful. Please check your email.".into()));
        api.expect_verify_registration()
            .withf(|email, otp| email == "an@example.com" && otp == "246810")
            .times(1)
            .returning(|_, _| Ok("Account verified".into()));

        let host = WorkflowHost::registration(
            Arc::new(api),
            registration_request(),
            WorkflowConfig::default(),
        );
        assert_eq!(
            host.open().await.unwrap(),
            StepOutcome::Accepted(WorkflowStep::AwaitingCode)
        );

        let workflow = host.workflow().unwrap();
        assert_eq!(workflow.identity(), "an@example.com");
        workflow.handle_paste("246810");
        assert_eq!(
            workflow.submit_code().await,
            StepOutcome::Accepted(WorkflowStep::Succeeded)
        );

        let confirmation = host.confirmation().unwrap();
        assert_eq!(confirmation.message, "Account verified successfully");
        assert_eq!(confirmation.redirect.as_deref(), Some("/login"));
        assert_eq!(confirmation.close_after, None);
        assert!(host.is_open());
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let mut api = MockApi::new();
        api.expect_register().times(1).returning(|_| Ok(String::new()));

        let host = WorkflowHost::registration(
            Arc::new(api),
            registration_request(),
            WorkflowConfig::default(),
        );
        host.open().await.unwrap();
        let first = host.workflow().unwrap().id();

        assert_eq!(host.open().await.unwrap(), StepOutcome::Ignored);
        assert_eq!(host.workflow().unwrap().id(), first);
    }
}

mod reset_tests {
    use super::*;

    #[tokio::test]
    async fn test_forgot_password_flow() {
        let mut api = MockApi::new();
        api.expect_forgot_password()
            .withf(|email| email == "an@example.com")
            .returning(|_| Ok("OTP sent".into()));
        api.expect_reset_password()
            .withf(|email, otp, new_password| {
                email == "an@example.com" && otp == "135790" && new_password == "newpass1"
            })
            .times(1)
            .returning(|_, _, _| Ok("Password reset".into()));

        let host =
            WorkflowHost::password_reset(Arc::new(api), "an@example.com", WorkflowConfig::default());
        host.open().await.unwrap();

        let workflow = host.workflow().unwrap();
        workflow.handle_paste("135790");
        workflow.submit_code().await;
        workflow.set_new_secret("newpass1");
        workflow.set_confirm_secret("newpass1");
        assert_eq!(
            workflow.submit_new_secret().await,
            StepOutcome::Accepted(WorkflowStep::Succeeded)
        );

        let confirmation = host.confirmation().unwrap();
        assert_eq!(confirmation.message, "Password reset successfully");
        assert_eq!(confirmation.redirect.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn test_unknown_email_shows_detail() {
        let mut api = MockApi::new();
        api.expect_forgot_password()
            .returning(|_| Err(ClientError::api(404, Some("Email not found".into()))));

        let host =
            WorkflowHost::password_reset(Arc::new(api), "nobody@example.com", WorkflowConfig::default());
        assert_eq!(
            host.open().await.unwrap(),
            StepOutcome::Rejected("Email not found".into())
        );
        assert_eq!(host.workflow().unwrap().step(), WorkflowStep::Dispatching);
    }
}

mod change_password_tests {
    use super::*;

    fn succeeding_api() -> MockApi {
        let mut api = MockApi::new();
        api.expect_forgot_password()
            .withf(|email| email == "an@example.com")
            .returning(|_| Ok("OTP sent".into()));
        api.expect_reset_password()
            .returning(|_, _, _| Ok("Password reset".into()));
        api
    }

    async fn complete(host: &WorkflowHost) {
        host.open().await.unwrap();
        let workflow = host.workflow().unwrap();
        workflow.handle_paste("112233");
        workflow.submit_code().await;
        workflow.set_new_secret("changed1");
        workflow.set_confirm_secret("changed1");
        assert_eq!(
            workflow.submit_new_secret().await,
            StepOutcome::Accepted(WorkflowStep::Succeeded)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dialog_closes_after_delay() {
        let host = WorkflowHost::change_password(
            Arc::new(succeeding_api()),
            signed_in(Some("an@example.com")),
            WorkflowConfig::default(),
        );
        complete(&host).await;

        let confirmation = host.confirmation().unwrap();
        assert_eq!(confirmation.message, "Password changed successfully");
        assert_eq!(confirmation.redirect, None);
        assert_eq!(confirmation.close_after, Some(Duration::from_secs(2)));

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(host.is_open());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!host.is_open());
        assert!(matches!(host.workflow(), Err(HostError::NotOpen)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_close() {
        let host = WorkflowHost::change_password(
            Arc::new(succeeding_api()),
            signed_in(Some("an@example.com")),
            WorkflowConfig::default(),
        );
        complete(&host).await;

        assert!(host.close());
        assert!(host.confirmation().is_none());
        host.open().await.unwrap();
        let reopened = host.workflow().unwrap();
        assert_eq!(reopened.step(), WorkflowStep::AwaitingCode);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(host.is_open());
        assert_eq!(host.workflow().unwrap().id(), reopened.id());
    }

    #[tokio::test]
    async fn test_requires_session() {
        let api = MockApi::new();
        let store = MemorySessionStore::new();
        let host = WorkflowHost::change_password(
            Arc::new(api),
            SessionContext::new(Arc::new(store)),
            WorkflowConfig::default(),
        );

        assert_eq!(
            host.open().await,
            Err(HostError::Client(ClientError::NotAuthenticated))
        );
        assert!(!host.is_open());
    }

    #[tokio::test]
    async fn test_session_without_email() {
        let host = WorkflowHost::change_password(
            Arc::new(MockApi::new()),
            signed_in(None),
            WorkflowConfig::default(),
        );
        assert_eq!(
            host.open().await,
            Err(HostError::Client(ClientError::MissingIdentity))
        );
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_close_discards_workflow() {
        let mut api = MockApi::new();
        api.expect_forgot_password()
            .times(2)
            .returning(|_| Ok(String::new()));

        let host =
            WorkflowHost::password_reset(Arc::new(api), "an@example.com", WorkflowConfig::default());
        assert!(!host.close());

        host.open().await.unwrap();
        let first = host.workflow().unwrap();
        first.handle_paste("12");

        assert!(host.close());
        assert_eq!(first.step(), WorkflowStep::Dispatching);
        assert!(!first.is_countdown_running());

        host.open().await.unwrap();
        let second = host.workflow().unwrap();
        assert_ne!(second.id(), first.id());
        assert_eq!(second.snapshot().code, vec![""; 6]);
    }
}
