//! Integration tests for the terminal driver
//!
//! Each test feeds scripted input through a [`Console`] and checks what the
//! backend received and what the user saw.

use async_trait::async_trait;
use bikego_adapter_memory::MemorySessionStore;
use bikego_core::{ClientError, ClientResult, SessionContext};
use bikego_email_otp::{AuthApi, LoginResponse, RegistrationRequest, WorkflowConfig};
use bikego_terminal::{App, CliError, Command, Console, TerminalConfig};
use mockall::mock;
use std::sync::Arc;

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

fn config() -> TerminalConfig {
    TerminalConfig {
        workflow: WorkflowConfig::default().success_display_delay_ms(10),
        ..TerminalConfig::default()
    }
}

fn app(api: MockApi, store: MemorySessionStore) -> App {
    App::new(config(), Arc::new(api), SessionContext::new(Arc::new(store)))
}

async fn run(app: &App, command: Command, input: &str) -> (Result<(), CliError>, String) {
    let mut console = Console::new(input.as_bytes(), Vec::new());
    let result = app.run(command, &mut console).await;
    let output = String::from_utf8(console.into_output()).unwrap();
    (result, output)
}

#[tokio::test]
async fn test_reset_with_retry_after_mismatch() {
    let mut api = MockApi::new();
    api.expect_forgot_password()
        .times(1)
        .returning(|_| Ok("OTP sent".into()));
    api.expect_reset_password()
        .withf(|email, otp, new_password| {
            email == "an@example.com" && otp == "123456" && new_password == "abcdef"
        })
        .times(1)
        .returning(|_, _, _| Ok("Password reset".into()));
    let app = app(api, MemorySessionStore::new());

    let (result, output) = run(
        &app,
        Command::Reset {
            email: "an@example.com".into(),
        },
        "12a\n123456\nabcdef\nabcdeg\nabcdef\nabcdef\n",
    )
    .await;

    result.unwrap();
    assert!(output.contains("Digits only, please."));
    assert!(output.contains("! Passwords do not match."));
    assert!(output.contains("Password reset successfully"));
    assert!(output.contains("Continue at /login."));
}

#[tokio::test]
async fn test_register_and_verify() {
    let mut api = MockApi::new();
    api.expect_register()
        .withf(|request| request.email == "an@example.com" && request.password == "secret1")
        .times(1)
        .returning(|_| Ok("OTP sent".into()));
    api.expect_verify_registration()
        .withf(|_, otp| otp == "000111")
        .returning(|_, _| Ok("verified".into()));
    let app = app(api, MemorySessionStore::new());

    let (result, output) = run(
        &app,
        Command::Register {
            first_name: "An".into(),
            last_name: "Nguyen".into(),
            email: "an@example.com".into(),
            phone: "0900000000".into(),
        },
        "secret1\nresend\n000111\n",
    )
    .await;

    result.unwrap();
    assert!(output.contains("You can request a new code in 00:"));
    assert!(output.contains("Account verified successfully"));
}

#[tokio::test]
async fn test_quit_cancels() {
    let mut api = MockApi::new();
    api.expect_forgot_password().returning(|_| Ok(String::new()));
    api.expect_reset_password().never();
    let app = app(api, MemorySessionStore::new());

    let (result, _) = run(
        &app,
        Command::Reset {
            email: "an@example.com".into(),
        },
        "quit\n",
    )
    .await;
    assert!(matches!(result, Err(CliError::Aborted)));
}

#[tokio::test]
async fn test_login_then_change_password() {
    let mut api = MockApi::new();
    api.expect_login()
        .withf(|identifier, password| identifier == "an@example.com" && password == "oldpass")
        .returning(|_, _| {
            Ok(LoginResponse {
                access_token: "tok".into(),
                token_type: "bearer".into(),
                role: "customer".into(),
                name: "An".into(),
                id: 3,
            })
        });
    api.expect_forgot_password()
        .withf(|email| email == "an@example.com")
        .returning(|_| Ok("OTP sent".into()));
    api.expect_reset_password()
        .withf(|_, _, new_password| new_password == "newpass1")
        .returning(|_, _, _| Ok("Password reset".into()));
    let store = MemorySessionStore::new();
    let app = app(api, store.clone());

    let (result, output) = run(
        &app,
        Command::Login {
            identifier: "an@example.com".into(),
        },
        "oldpass\n",
    )
    .await;
    result.unwrap();
    assert!(output.contains("Signed in as An."));
    assert_eq!(store.write_count(), 1);

    let (result, output) = run(
        &app,
        Command::ChangePassword,
        "654321\nnewpass1\nnewpass1\n",
    )
    .await;
    result.unwrap();
    assert!(output.contains("Password changed successfully"));
}

#[tokio::test]
async fn test_change_password_requires_login() {
    let app = app(MockApi::new(), MemorySessionStore::new());
    let (result, _) = run(&app, Command::ChangePassword, "").await;
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Please sign in to continue");
}

#[tokio::test]
async fn test_login_error_uses_detail() {
    let mut api = MockApi::new();
    api.expect_login()
        .returning(|_, _| Err(ClientError::api(401, Some("Incorrect email or password".into()))));
    let app = app(api, MemorySessionStore::new());

    let (result, _) = run(
        &app,
        Command::Login {
            identifier: "an@example.com".into(),
        },
        "wrong\n",
    )
    .await;
    assert_eq!(result.unwrap_err().to_string(), "Incorrect email or password");
}
