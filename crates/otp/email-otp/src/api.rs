//! HTTP client for the storefront's `/auth` endpoints.

use async_trait::async_trait;
use bikego_core::{ClientError, ClientResult, Role, Session, SessionContext, SessionUser};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend root, without the `/auth` prefix.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Creates a config for the given backend root.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the request timeout.
    pub fn timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// Full URL of an auth endpoint, e.g. `endpoint("login")`.
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/auth/{}", self.base_url.trim_end_matches('/'), name)
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyBody<'a> {
    email: &'a str,
    otp: &'a str,
}

#[derive(Serialize)]
struct ResetBody<'a> {
    email: &'a str,
    otp: &'a str,
    new_password: &'a str,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub role: String,
    pub name: String,
    pub id: i64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl LoginResponse {
    /// Turns the response into a cached session.
    ///
    /// The backend does not echo the email back, so it is taken from the
    /// login identifier when that looks like an email address.
    pub fn into_session(self, identifier: &str) -> Session {
        let role = Role::parse(&self.role).unwrap_or(Role::Customer);
        let mut user = SessionUser::new(self.id, self.name, role);
        if identifier.contains('@') {
            user = user.with_email(identifier.trim());
        }
        let mut session = Session::new(self.access_token, user);
        session.token_type = self.token_type;
        session
    }
}

/// The auth endpoints the OTP hosts and the terminal driver use.
///
/// Success values are the backend's confirmation message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Creates a pending account and emails a verification code.
    async fn register(&self, request: &RegistrationRequest) -> ClientResult<String>;

    /// Activates a pending account.
    async fn verify_registration(&self, email: &str, otp: &str) -> ClientResult<String>;

    /// Emails a password reset code.
    async fn forgot_password(&self, email: &str) -> ClientResult<String>;

    /// Sets a new password using a reset code.
    async fn reset_password(&self, email: &str, otp: &str, new_password: &str)
    -> ClientResult<String>;

    /// Signs in with an email or phone number.
    async fn login(&self, identifier: &str, password: &str) -> ClientResult<LoginResponse>;
}

/// [`AuthApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    config: ClientConfig,
    session: Option<SessionContext>,
}

impl HttpAuthApi {
    /// Builds a client with the configured timeout.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ClientError::config(e.to_string()))?;
        Ok(Self {
            client,
            config,
            session: None,
        })
    }

    /// Sends the stored session token as a bearer token.
    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post<B, R>(&self, name: &str, body: &B) -> ClientResult<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.config.endpoint(name);
        let mut request = self.client.post(&url).json(body);
        if let Some(session) = &self.session {
            if let Some(token) = session.store().get_token().await? {
                request = request.bearer_auth(token);
            }
        }

        debug!(endpoint = name, "sending auth request");
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let detail = parse_error_detail(&bytes);
            warn!(endpoint = name, status = status.as_u16(), "auth request rejected");
            return Err(ClientError::api(status.as_u16(), detail));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn register(&self, request: &RegistrationRequest) -> ClientResult<String> {
        let response: MessageResponse = self.post("register", request).await?;
        Ok(response.message)
    }

    async fn verify_registration(&self, email: &str, otp: &str) -> ClientResult<String> {
        let response: MessageResponse = self
            .post("verify-registration", &VerifyBody { email, otp })
            .await?;
        Ok(response.message)
    }

    async fn forgot_password(&self, email: &str) -> ClientResult<String> {
        let response: MessageResponse = self.post("forgot-password", &EmailBody { email }).await?;
        Ok(response.message)
    }

    async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> ClientResult<String> {
        let body = ResetBody {
            email,
            otp,
            new_password,
        };
        let response: MessageResponse = self.post("reset-password", &body).await?;
        Ok(response.message)
    }

    async fn login(&self, identifier: &str, password: &str) -> ClientResult<LoginResponse> {
        self.post(
            "login",
            &LoginBody {
                identifier,
                password,
            },
        )
        .await
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::transport("The server took too long to respond. Please try again.")
    } else if err.is_connect() {
        ClientError::transport("Cannot reach the server. Please check your connection.")
    } else if err.is_decode() {
        ClientError::Decode {
            message: err.to_string(),
        }
    } else {
        ClientError::transport(err.to_string())
    }
}

/// Pulls the user-facing text out of an error body.
///
/// The backend sends `{"detail": "..."}` for handled errors and
/// `{"detail": [{"msg": "..."}]}` for request validation failures.
pub fn parse_error_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let detail = value.get("detail")?;
    let text = match detail {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Array(items) => items.first()?.get("msg")?.as_str()?.to_string(),
        _ => return None,
    };
    Some(text).filter(|t| !t.trim().is_empty())
}
