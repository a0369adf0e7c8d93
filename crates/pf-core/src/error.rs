//! Error types for the core library

use thiserror::Error;

/// Errors raised by a [`CredentialStore`](crate::CredentialStore).
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No stored credentials found")]
    NotFound,

    #[error("Stored credentials are invalid: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
