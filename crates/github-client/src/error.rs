//! Error types and HTTP status mapping for the GitHub client

use chrono::Utc;
use pf_core::CredentialError;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for REST operations
pub type Result<T> = std::result::Result<T, GitHubError>;

/// Structured error body returned by the GitHub API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
    pub documentation_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub resource: Option<String>,
    pub field: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Message plus any per-field messages, joined for display
    fn summary(&self) -> String {
        let details: Vec<&str> = self
            .errors
            .iter()
            .filter_map(|detail| detail.message.as_deref().or(detail.code.as_deref()))
            .collect();
        if details.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, details.join("; "))
        }
    }
}

/// Errors from GitHub REST operations
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("No GitHub credentials stored; log in first")]
    CredentialsNotFound,

    #[error("Stored GitHub credentials are invalid: {0}")]
    InvalidCredentials(String),

    #[error("GitHub authentication failed (401)")]
    AuthenticationFailed,

    #[error("Insufficient permissions for this GitHub operation (403)")]
    InsufficientPermissions,

    #[error("GitHub rate limit exceeded{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("GitHub repository not found (404)")]
    RepositoryNotFound,

    #[error("Invalid repository name: {0}")]
    InvalidRepositoryName(String),

    #[error("Repository '{0}' already exists")]
    RepositoryNameConflict(String),

    #[error("GitHub API error ({status}): {summary}")]
    Api {
        status: u16,
        summary: String,
        body: ApiErrorBody,
    },

    #[error("Unexpected GitHub response status {0}")]
    UnexpectedStatus(u16),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(delay) => format!(", retry after {}s", delay.as_secs()),
        None => String::new(),
    }
}

impl From<CredentialError> for GitHubError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::NotFound => Self::CredentialsNotFound,
            CredentialError::Invalid(reason) => Self::InvalidCredentials(reason),
            other => Self::InvalidCredentials(other.to_string()),
        }
    }
}

/// Errors from the OAuth device flow
#[derive(Debug, Error)]
pub enum DeviceFlowError {
    #[error("Failed to start device authorization: {0}")]
    InitiationFailed(String),

    #[error("The device code expired before it was authorized")]
    Expired,

    #[error("Authorization was denied by the user")]
    Denied,

    #[error("Unexpected response from the token endpoint: {0}")]
    UnexpectedResponse(String),

    #[error("Timed out waiting for device authorization")]
    Timeout,

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Map a non-2xx response onto [`GitHubError`]
pub fn map_error_response(status: StatusCode, headers: &HeaderMap, body: &str) -> GitHubError {
    match status.as_u16() {
        401 => GitHubError::AuthenticationFailed,
        403 if is_rate_limited(headers) => GitHubError::RateLimited {
            retry_after: retry_after(headers),
        },
        403 => GitHubError::InsufficientPermissions,
        404 => GitHubError::RepositoryNotFound,
        422 => parse_api_error(422, body)
            .unwrap_or_else(|| GitHubError::InvalidRepositoryName(body.trim().to_string())),
        429 => GitHubError::RateLimited {
            retry_after: retry_after(headers),
        },
        code => parse_api_error(code, body).unwrap_or(GitHubError::UnexpectedStatus(code)),
    }
}

fn parse_api_error(status: u16, body: &str) -> Option<GitHubError> {
    let body: ApiErrorBody = serde_json::from_str(body).ok()?;
    Some(GitHubError::Api {
        status,
        summary: body.summary(),
        body,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// A 403 counts as rate limiting when the quota is exhausted or the
/// server asks us to back off.
fn is_rate_limited(headers: &HeaderMap) -> bool {
    header_str(headers, "x-ratelimit-remaining") == Some("0")
        || headers.contains_key("retry-after")
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(secs) = header_str(headers, "retry-after").and_then(|v| v.parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }

    let reset = header_str(headers, "x-ratelimit-reset")?.parse::<i64>().ok()?;
    let now = Utc::now().timestamp();
    Some(Duration::from_secs(reset.saturating_sub(now).max(0) as u64))
}
