//! File-based credential storage
//!
//! Keeps the token as JSON in a single file on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::{CredentialStore, OAuthToken};
use crate::error::CredentialError;

/// Credential store backed by a JSON file
pub struct FileCredentialStore {
    /// Path to the JSON file
    path: PathBuf,
    /// Serializes writers against each other
    lock: RwLock<()>,
}

impl FileCredentialStore {
    /// Create a store for `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn retrieve(&self) -> Result<OAuthToken, CredentialError> {
        let _guard = self.lock.read().await;
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::NotFound)
            }
            Err(e) => return Err(e.into()),
        };

        let token: OAuthToken = serde_json::from_str(&content)
            .map_err(|e| CredentialError::Invalid(format!("unreadable token file: {}", e)))?;
        token.validate()?;
        Ok(token)
    }

    async fn save(&self, token: &OAuthToken) -> Result<(), CredentialError> {
        let _guard = self.lock.write().await;
        let content = serde_json::to_string_pretty(token)?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        debug!("Saved credentials to {:?}", self.path);
        Ok(())
    }

    async fn delete(&self) -> Result<(), CredentialError> {
        let _guard = self.lock.write().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Removed credentials at {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn create_test_store() -> (FileCredentialStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp.path().join("nested").join("credentials.json"));
        (store, temp)
    }

    #[tokio::test]
    async fn test_retrieve_missing_file() {
        let (store, _temp) = create_test_store();
        assert!(matches!(
            store.retrieve().await,
            Err(CredentialError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_save_and_retrieve() {
        let (store, _temp) = create_test_store();
        let token = OAuthToken::from_device_flow("gho_saved", Utc::now());

        store.save(&token).await.unwrap();
        assert!(store.path().exists());

        let loaded = store.retrieve().await.unwrap();
        assert_eq!(loaded, token);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_invalid() {
        let (store, _temp) = create_test_store();
        tokio::fs::create_dir_all(store.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(store.path(), "not json").await.unwrap();

        assert!(matches!(
            store.retrieve().await,
            Err(CredentialError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_is_invalid() {
        let (store, _temp) = create_test_store();
        let token = OAuthToken::new("gho_old", Utc::now() - Duration::seconds(5));
        store.save(&token).await.unwrap();

        assert!(matches!(
            store.retrieve().await,
            Err(CredentialError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, _temp) = create_test_store();
        store.delete().await.unwrap();

        store
            .save(&OAuthToken::from_device_flow("gho_del", Utc::now()))
            .await
            .unwrap();
        store.delete().await.unwrap();
        assert!(!store.path().exists());
    }
}
