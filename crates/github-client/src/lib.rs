//! GitHub client for private-fork
//!
//! Wraps the handful of REST endpoints the fork workflow needs and the
//! OAuth 2.0 Device Authorization Flow used to obtain a token.

mod client;
mod config;
mod device_flow;
mod error;
mod types;
mod validate;

pub use client::GitHubClient;
pub use config::GitHubConfig;
pub use device_flow::{
    classify_token_response, PollResponse, DEVICE_FLOW_SCOPE, SLOW_DOWN_INCREMENT,
};
pub use error::{
    map_error_response, ApiErrorBody, ApiErrorDetail, DeviceFlowError, GitHubError, Result,
};
pub use types::{DeviceFlowSession, GitHubUser, RepositoryRef};
pub use validate::{validate_repository_name, MAX_REPOSITORY_NAME_LENGTH};
