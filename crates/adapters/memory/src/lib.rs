//! # BikeGo Memory Adapter
//!
//! An in-memory session store for the BikeGo client, primarily intended
//! for testing and development purposes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bikego_adapter_memory::MemorySessionStore;
//! use bikego_core::SessionContext;
//!
//! let session = SessionContext::new(Arc::new(MemorySessionStore::new()));
//! ```

use async_trait::async_trait;
use bikego_core::error::ClientResult;
use bikego_core::traits::SessionStore;
use bikego_core::types::{Session, SessionUser};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory session store.
///
/// Holds at most one session, the way the storefront's token/user cache
/// does. Data is lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    session: Arc<RwLock<Option<Session>>>,
    writes: Arc<AtomicUsize>,
}

impl MemorySessionStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a session.
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(Some(session))),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns a copy of the stored session.
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Returns how many times the session was set or cleared.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_token(&self) -> ClientResult<Option<String>> {
        let session = self.session.read().await;
        Ok(session.as_ref().map(|s| s.token.clone()))
    }

    async fn get_user(&self) -> ClientResult<Option<SessionUser>> {
        let session = self.session.read().await;
        Ok(session.as_ref().map(|s| s.user.clone()))
    }

    async fn set_session(&self, session: Session) -> ClientResult<()> {
        *self.session.write().await = Some(session);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear_session(&self) -> ClientResult<()> {
        self.session.write().await.take();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
