//! Core traits for the BikeGo client.
//!
//! This module defines the seams the OTP workflow and its hosts depend on:
//! the backend that dispatches and confirms codes, and the session store
//! that replaces direct access to browser storage.

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::types::{ConfirmPayload, Session, SessionUser};

/// The two backend operations an OTP workflow is driven by.
///
/// Each use case (registration, password reset) supplies its own
/// implementation; the workflow never knows which endpoint it talks to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpBackend: Send + Sync {
    /// Asks the backend to send a fresh code to `identity`.
    async fn request_code(&self, identity: &str) -> ClientResult<()>;

    /// Submits `code` (and the optional payload) for `identity`.
    async fn confirm_action(
        &self,
        identity: &str,
        code: &str,
        payload: Option<ConfirmPayload>,
    ) -> ClientResult<()>;
}

/// Trait for session storage.
///
/// Stands in for the token/user cache the storefront used to read straight
/// out of browser storage, so components receive it explicitly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Gets the stored bearer token.
    async fn get_token(&self) -> ClientResult<Option<String>>;

    /// Gets the cached user.
    async fn get_user(&self) -> ClientResult<Option<SessionUser>>;

    /// Stores a new session, replacing any previous one.
    async fn set_session(&self, session: Session) -> ClientResult<()>;

    /// Removes the stored session.
    async fn clear_session(&self) -> ClientResult<()>;
}
