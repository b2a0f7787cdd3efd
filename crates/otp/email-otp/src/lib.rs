//! # BikeGo Email OTP
//!
//! The email verification workflow shared by registration, "forgot password"
//! and "change password". A [`WorkflowHost`] binds an [`OtpWorkflow`] to one
//! of those use cases and talks to the backend through [`AuthApi`].
//!
//! ```no_run
//! use bikego_email_otp::{HttpAuthApi, ClientConfig, WorkflowConfig, WorkflowHost};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Arc::new(HttpAuthApi::new(ClientConfig::default())?);
//! let host = WorkflowHost::password_reset(api, "an@example.com", WorkflowConfig::default());
//! host.open().await?;
//! let workflow = host.workflow()?;
//! workflow.handle_paste("123456");
//! workflow.submit_code().await;
//! # Ok(())
//! # }
//! ```

mod api;
mod callbacks;
mod config;
mod host;
mod state;
mod workflow;

pub use api::{
    parse_error_detail, AuthApi, ClientConfig, HttpAuthApi, LoginResponse, RegistrationRequest,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};
pub use callbacks::{ConfirmActionFn, OtpCallbacks, RequestCodeFn};
pub use config::{
    OtpPurpose, WorkflowConfig, WorkflowKind, RESEND_FAILED, RESET_FAILED, SEND_FAILED,
    VERIFY_FAILED,
};
pub use host::{
    Confirmation, HostError, PasswordResetBackend, RegistrationBackend, WorkflowHost, LOGIN_ROUTE,
};
pub use state::{StepOutcome, WorkflowSnapshot, WorkflowStep};
pub use workflow::{OtpWorkflow, OtpWorkflowBuilder, SuccessContinuation};
