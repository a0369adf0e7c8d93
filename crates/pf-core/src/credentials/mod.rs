//! Credential storage
//!
//! The workflow only ever talks to the [`CredentialStore`] trait; how the
//! token is kept at rest is up to the implementation.

mod file_store;
mod token;

pub use file_store::FileCredentialStore;
pub use token::OAuthToken;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CredentialError;

/// Storage interface for the GitHub OAuth token
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored token, rejecting empty or expired ones
    async fn retrieve(&self) -> Result<OAuthToken, CredentialError>;

    /// Replace the stored token
    async fn save(&self, token: &OAuthToken) -> Result<(), CredentialError>;

    /// Forget the stored token. Deleting when nothing is stored succeeds.
    async fn delete(&self) -> Result<(), CredentialError>;
}

/// In-process credential store, used for tests and one-shot sessions
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<OAuthToken>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a token
    pub fn with_token(token: OAuthToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn retrieve(&self) -> Result<OAuthToken, CredentialError> {
        let token = self.token.read().await;
        let token = token.as_ref().ok_or(CredentialError::NotFound)?;
        token.validate()?;
        Ok(token.clone())
    }

    async fn save(&self, token: &OAuthToken) -> Result<(), CredentialError> {
        *self.token.write().await = Some(token.clone());
        Ok(())
    }

    async fn delete(&self) -> Result<(), CredentialError> {
        self.token.write().await.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert!(matches!(
            store.retrieve().await,
            Err(CredentialError::NotFound)
        ));

        let token = OAuthToken::new("gho_abc", Utc::now() + Duration::hours(8));
        store.save(&token).await.unwrap();
        assert_eq!(store.retrieve().await.unwrap().access_token, "gho_abc");

        store.delete().await.unwrap();
        assert!(matches!(
            store.retrieve().await,
            Err(CredentialError::NotFound)
        ));
        // Deleting again is fine
        store.delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_rejects_expired_token() {
        let expired = OAuthToken::new("gho_old", Utc::now() - Duration::minutes(1));
        let store = MemoryCredentialStore::with_token(expired);
        assert!(matches!(
            store.retrieve().await,
            Err(CredentialError::Invalid(_))
        ));
    }
}
