//! # BikeGo Terminal
//!
//! Runs the storefront's email verification flows from a terminal:
//! registration, forgotten password, login and change password.

mod config;
mod console;
mod driver;
mod session_file;

pub use config::{ConfigError, TerminalConfig, DEFAULT_CONFIG_FILE};
pub use console::Console;
pub use driver::drive;
pub use session_file::FileSessionStore;

use bikego_core::{ClientError, SessionContext};
use bikego_email_otp::{AuthApi, HostError, HttpAuthApi, RegistrationRequest, WorkflowHost};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// bikego-otp - BikeGo account verification
#[derive(Parser, Debug)]
#[command(name = "bikego-otp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account and verify its email address
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
    },

    /// Reset a forgotten password
    Reset {
        /// Account email
        email: String,
    },

    /// Sign in and cache the session
    Login {
        /// Email or phone number
        identifier: String,
    },

    /// Change the signed-in user's password
    ChangePassword,

    /// Forget the cached session
    Logout,
}

/// Terminal errors.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}", client_message(.0))]
    Client(#[from] ClientError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cancelled")]
    Aborted,
}

fn client_message(err: &ClientError) -> String {
    err.user_message().unwrap_or_else(|| err.to_string())
}

/// Installs the tracing subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Everything a command needs.
pub struct App {
    config: TerminalConfig,
    api: Arc<dyn AuthApi>,
    session: SessionContext,
}

impl App {
    /// Wires the HTTP API and the file-backed session cache.
    pub fn from_config(config: TerminalConfig) -> Result<Self, CliError> {
        let store = FileSessionStore::new(config.session_path());
        let session = SessionContext::new(Arc::new(store));
        let api = HttpAuthApi::new(config.client.clone())?.with_session(session.clone());
        Ok(Self::new(config, Arc::new(api), session))
    }

    pub fn new(config: TerminalConfig, api: Arc<dyn AuthApi>, session: SessionContext) -> Self {
        Self {
            config,
            api,
            session,
        }
    }

    /// Runs one command against `console`.
    pub async fn run<R, W>(&self, command: Command, console: &mut Console<R, W>) -> Result<(), CliError>
    where
        R: AsyncRead + Unpin,
        W: Write,
    {
        match command {
            Command::Register {
                first_name,
                last_name,
                email,
                phone,
            } => {
                let password = required(console, "Password").await?;
                let request = RegistrationRequest {
                    first_name,
                    last_name,
                    email,
                    phone,
                    password,
                };
                let host = WorkflowHost::registration(
                    self.api.clone(),
                    request,
                    self.config.workflow.clone(),
                );
                self.verify(&host, console).await
            }
            Command::Reset { email } => {
                let host = WorkflowHost::password_reset(
                    self.api.clone(),
                    email,
                    self.config.workflow.clone(),
                );
                self.verify(&host, console).await
            }
            Command::Login { identifier } => {
                let password = required(console, "Password").await?;
                let response = self.api.login(&identifier, &password).await?;
                let session = response.into_session(&identifier);
                let name = session.user.name.clone();
                self.session.sign_in(session).await?;
                info!("signed in");
                console.say(&format!("Signed in as {name}."))?;
                Ok(())
            }
            Command::ChangePassword => {
                let host = WorkflowHost::change_password(
                    self.api.clone(),
                    self.session.clone(),
                    self.config.workflow.clone(),
                );
                self.verify(&host, console).await
            }
            Command::Logout => {
                self.session.sign_out().await?;
                console.say("Signed out.")?;
                Ok(())
            }
        }
    }

    async fn verify<R, W>(&self, host: &WorkflowHost, console: &mut Console<R, W>) -> Result<(), CliError>
    where
        R: AsyncRead + Unpin,
        W: Write,
    {
        host.open().await?;
        let workflow = host.workflow()?;
        let result = drive(&workflow, console).await;
        if result.is_err() {
            host.close();
            return result;
        }

        if let Some(confirmation) = host.confirmation() {
            console.say(&confirmation.message)?;
            if let Some(route) = &confirmation.redirect {
                console.say(&format!("Continue at {route}."))?;
            }
            if let Some(delay) = confirmation.close_after {
                tokio::time::sleep(delay).await;
            }
        }
        host.close();
        Ok(())
    }
}

async fn required<R, W>(console: &mut Console<R, W>, label: &str) -> Result<String, CliError>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    match console.ask(label).await? {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(CliError::Aborted),
    }
}
