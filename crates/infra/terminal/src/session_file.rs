//! A [`SessionStore`] persisted as a JSON file, so `login` and
//! `change-password` can run as separate invocations.

use async_trait::async_trait;
use bikego_core::{ClientError, ClientResult, Session, SessionStore, SessionUser};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Session cache stored in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> ClientResult<Option<Session>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::storage(e.to_string())),
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get_token(&self) -> ClientResult<Option<String>> {
        Ok(self.load().await?.map(|session| session.token))
    }

    async fn get_user(&self) -> ClientResult<Option<SessionUser>> {
        Ok(self.load().await?.map(|session| session.user))
    }

    async fn set_session(&self, session: Session) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::storage(e.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(&session)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| ClientError::storage(e.to_string()))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    async fn clear_session(&self) -> ClientResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::storage(e.to_string())),
        }
    }
}
