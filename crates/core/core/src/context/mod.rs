//! Session context handed to hosts and API clients.

use crate::error::{ClientError, ClientResult};
use crate::traits::SessionStore;
use crate::types::{Session, SessionUser};
use std::sync::Arc;
use tracing::debug;

/// Explicit access to the signed-in session.
///
/// Cloning is cheap; every clone shares the same underlying store.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    /// Creates a new context over the given store.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Gets the signed-in user, if any.
    pub async fn user(&self) -> ClientResult<Option<SessionUser>> {
        self.store.get_user().await
    }

    /// Returns true if a token and a user are both cached.
    pub async fn is_authenticated(&self) -> bool {
        matches!(
            (self.store.get_token().await, self.store.get_user().await),
            (Ok(Some(_)), Ok(Some(_)))
        )
    }

    /// Returns the signed-in user's email, the identity OTP flows target.
    pub async fn identity(&self) -> ClientResult<String> {
        let user = self.store.get_user().await?.ok_or(ClientError::NotAuthenticated)?;
        match user.email {
            Some(email) if !email.trim().is_empty() => Ok(email),
            _ => Err(ClientError::MissingIdentity),
        }
    }

    /// Returns the `Authorization` header value for the stored token.
    pub async fn authorization(&self) -> ClientResult<Option<String>> {
        Ok(self
            .store
            .get_token()
            .await?
            .map(|token| format!("Bearer {token}")))
    }

    /// Stores a freshly issued session.
    pub async fn sign_in(&self, session: Session) -> ClientResult<()> {
        debug!(user_id = session.user.id, "storing session");
        self.store.set_session(session).await
    }

    /// Drops the stored session.
    pub async fn sign_out(&self) -> ClientResult<()> {
        debug!("clearing session");
        self.store.clear_session().await
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}
