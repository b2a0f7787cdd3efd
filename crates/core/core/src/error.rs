//! Error types for the BikeGo client.
//!
//! This module defines the `ClientError` enum which represents every failure
//! a backend call or session lookup can produce on the client side.

use thiserror::Error;

/// The main error type for BikeGo client operations.
///
/// Backend rejections and transport failures both end up here; the OTP
/// workflow turns them into a display string with [`ClientError::user_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    // ==================== Transport Errors ====================
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("Network error: {message}")]
    Transport { message: String },

    /// The response body could not be decoded.
    #[error("Unexpected response: {message}")]
    Decode { message: String },

    // ==================== Backend Errors ====================
    /// The backend answered with a non-success status.
    #[error("Request failed with status {status}")]
    Api {
        status: u16,
        /// Human-readable `detail` from the response body, if any.
        detail: Option<String>,
    },

    /// An injected operation rejected the request with a message.
    #[error("{message}")]
    Rejected { message: String },

    // ==================== Session Errors ====================
    /// No session is stored, but the operation needs one.
    #[error("Please sign in to continue")]
    NotAuthenticated,

    /// The workflow was created without a usable email address.
    #[error("Email is required")]
    MissingIdentity,

    /// The session store failed.
    #[error("Session storage error: {message}")]
    Storage { message: String },

    // ==================== Configuration Errors ====================
    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// An internal error occurred.
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ClientError {
    /// Creates a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new API error.
    pub fn api(status: u16, detail: Option<String>) -> Self {
        Self::Api { status, detail }
    }

    /// Creates a new rejection with a user-facing message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates a new session storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Returns the message to show the user, if the error carries one.
    ///
    /// `None` means the caller should fall back to its own default text.
    pub fn user_message(&self) -> Option<String> {
        let message = match self {
            Self::Api { detail, .. } => detail.clone(),
            Self::Rejected { message } | Self::Transport { message } => Some(message.clone()),
            Self::NotAuthenticated | Self::MissingIdentity => Some(self.to_string()),
            Self::Decode { .. }
            | Self::Storage { .. }
            | Self::ConfigurationError { .. }
            | Self::InternalError { .. } => None,
        };
        message.filter(|m| !m.trim().is_empty())
    }

    /// Returns true if this is a user-facing error (vs internal).
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Api { status, .. } => (400..500).contains(status),
            Self::Rejected { .. } | Self::NotAuthenticated | Self::MissingIdentity => true,
            _ => false,
        }
    }

    /// Returns the HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::NotAuthenticated => 401,
            Self::Rejected { .. } | Self::MissingIdentity => 400,
            Self::Transport { .. } => 503,
            _ => 500,
        }
    }
}

/// A Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::rejected("Invalid OTP");
        assert_eq!(err.to_string(), "Invalid OTP");
        assert_eq!(
            ClientError::api(400, None).to_string(),
            "Request failed with status 400"
        );
    }

    #[test]
    fn test_user_message_prefers_detail() {
        let err = ClientError::api(400, Some("Invalid OTP".into()));
        assert_eq!(err.user_message().as_deref(), Some("Invalid OTP"));
    }

    #[test]
    fn test_user_message_falls_back() {
        assert_eq!(ClientError::api(500, None).user_message(), None);
        assert_eq!(ClientError::rejected("   ").user_message(), None);
        assert_eq!(
            ClientError::Decode {
                message: "eof".into()
            }
            .user_message(),
            None
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ClientError::NotAuthenticated.status_code(), 401);
        assert_eq!(ClientError::api(404, None).status_code(), 404);
        assert_eq!(ClientError::transport("refused").status_code(), 503);
    }

    #[test]
    fn test_is_user_error() {
        assert!(ClientError::api(400, None).is_user_error());
        assert!(!ClientError::api(502, None).is_user_error());
        assert!(!ClientError::internal("test").is_user_error());
    }
}
