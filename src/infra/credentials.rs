//! Bearer credential persistence.
//!
//! The gateway reads the token through the [`CredentialStore`] trait on
//! every request and clears it when the server answers 401. Two stores are
//! provided: a file-backed one for long-lived CLI/desktop use, and an
//! in-memory one for embedding applications that manage tokens themselves
//! (and for tests).

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::cache::lock::{rw_read, rw_write};

use super::error::CredentialError;

const SOURCE: &str = "infra::credentials";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current bearer token, if any.
    async fn token(&self) -> Result<Option<String>, CredentialError>;
    /// Persist a new bearer token, replacing any previous one.
    async fn store(&self, token: &str) -> Result<(), CredentialError>;
    /// Remove the stored token.
    async fn clear(&self) -> Result<(), CredentialError>;
}

/// Default location for the token file, under the platform configuration
/// directory.
pub fn default_token_path() -> Result<PathBuf, CredentialError> {
    dirs::config_dir()
        .map(|dir| dir.join("piazza").join("token"))
        .ok_or_else(|| CredentialError::path("no configuration directory on this platform"))
}

/// Token persisted as a single file, read once and cached.
///
/// Writes go through a temporary file in the same directory so a crash
/// mid-write never leaves a truncated token behind.
pub struct FileCredentialStore {
    path: PathBuf,
    // Outer None: not read from disk yet. Inner None: known absent.
    cached: RwLock<Option<Option<String>>>,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_token_file(path: &Path, token: &str) -> Result<(), CredentialError> {
    let parent = path
        .parent()
        .ok_or_else(|| CredentialError::path("token path has no parent directory"))?;
    std::fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(token.as_bytes())?;
    file.persist(path)
        .map_err(|err| CredentialError::Io(err.error))?;
    Ok(())
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn token(&self) -> Result<Option<String>, CredentialError> {
        if let Some(cached) = rw_read(&self.cached, SOURCE, "token").clone() {
            return Ok(cached);
        }

        let loaded = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let trimmed = contents.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        *rw_write(&self.cached, SOURCE, "token") = Some(loaded.clone());
        Ok(loaded)
    }

    async fn store(&self, token: &str) -> Result<(), CredentialError> {
        let path = self.path.clone();
        let value = token.trim().to_string();
        let written = value.clone();
        tokio::task::spawn_blocking(move || write_token_file(&path, &value))
            .await
            .map_err(|err| CredentialError::Io(std::io::Error::other(err)))??;

        *rw_write(&self.cached, SOURCE, "store") = Some(Some(written));
        debug!(path = %self.path.display(), "credential stored");
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        *rw_write(&self.cached, SOURCE, "clear") = Some(None);
        debug!(path = %self.path.display(), "credential cleared");
        Ok(())
    }
}

/// Token held in memory only.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn token(&self) -> Result<Option<String>, CredentialError> {
        Ok(rw_read(&self.token, SOURCE, "memory_token").clone())
    }

    async fn store(&self, token: &str) -> Result<(), CredentialError> {
        *rw_write(&self.token, SOURCE, "memory_store") = Some(token.trim().to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        *rw_write(&self.token, SOURCE, "memory_clear") = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_roundtrip() -> Result<(), CredentialError> {
        let dir = tempfile::tempdir()?;
        let store = FileCredentialStore::new(dir.path().join("nested").join("token"));

        assert!(store.token().await?.is_none());

        store.store("secret-token\n").await?;
        assert_eq!(store.token().await?.as_deref(), Some("secret-token"));

        // A fresh store against the same path sees the persisted value.
        let reopened = FileCredentialStore::new(store.path().to_path_buf());
        assert_eq!(reopened.token().await?.as_deref(), Some("secret-token"));

        store.clear().await?;
        assert!(store.token().await?.is_none());
        let reopened = FileCredentialStore::new(store.path().to_path_buf());
        assert!(reopened.token().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn clear_tolerates_missing_file() -> Result<(), CredentialError> {
        let dir = tempfile::tempdir()?;
        let store = FileCredentialStore::new(dir.path().join("token"));
        store.clear().await?;
        assert!(store.token().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn memory_store_roundtrip() -> Result<(), CredentialError> {
        let store = MemoryCredentialStore::new();
        assert!(store.token().await?.is_none());
        store.store("abc").await?;
        assert_eq!(store.token().await?.as_deref(), Some("abc"));
        store.clear().await?;
        assert!(store.token().await?.is_none());
        Ok(())
    }
}
