//! Core data types for the BikeGo client.
//!
//! This module defines the cached `Session` and `SessionUser` that the
//! storefront keeps after login, plus the payload shared by every OTP
//! confirmation call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role attached to a signed-in account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Storefront customer.
    Customer,
    /// Shop staff member.
    Staff,
    /// Administrator.
    Admin,
}

impl Role {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    /// Parses from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Role::Customer),
            "staff" => Some(Role::Staff),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Returns true for roles that may open the admin console.
    pub fn is_console_role(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }
}

/// The user object cached next to the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Backend identifier (customer or employee id).
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Email address, when known. Login accepts a phone number too.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Account role.
    pub role: Role,
}

impl SessionUser {
    /// Creates a new session user.
    pub fn new(id: i64, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            role,
        }
    }

    /// Sets the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A signed-in session as cached by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token sent with authenticated requests.
    pub token: String,

    /// Token type reported by the backend (usually "bearer").
    pub token_type: String,

    /// The signed-in user.
    pub user: SessionUser,

    /// When the session was stored on this client.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new bearer session for the given user.
    pub fn new(token: impl Into<String>, user: SessionUser) -> Self {
        Self {
            token: token.into(),
            token_type: "bearer".to_string(),
            user,
            created_at: Utc::now(),
        }
    }

    /// Returns the value of the `Authorization` header for this session.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Extra data sent with an OTP confirmation.
///
/// Only the password-reset variants carry a payload; registration confirms
/// with the code alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPayload {
    /// The new password to set once the code is accepted.
    pub new_password: String,
}

impl ConfirmPayload {
    /// Creates a payload carrying a new password.
    pub fn new_password(password: impl Into<String>) -> Self {
        Self {
            new_password: password.into(),
        }
    }
}
