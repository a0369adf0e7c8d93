//! Core library for private-fork
//!
//! This crate contains the pieces shared by every other crate:
//! - Environment-driven configuration
//! - The OAuth token model
//! - The credential store seam and its implementations

pub mod config;
pub mod credentials;
pub mod error;

pub use config::ForkConfig;
pub use credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, OAuthToken,
};
pub use error::CredentialError;
