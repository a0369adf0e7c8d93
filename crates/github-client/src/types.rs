//! Payloads exchanged with GitHub

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The authenticated user, as returned by `GET /user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    pub name: Option<String>,
    pub html_url: Option<String>,
}

/// A repository created by this tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub clone_url: String,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryOwner {
    pub login: String,
}

/// Subset of the repository object returned by `POST /user/repos`
#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryPayload {
    pub name: String,
    pub owner: RepositoryOwner,
    pub clone_url: String,
    pub html_url: String,
}

impl From<RepositoryPayload> for RepositoryRef {
    fn from(payload: RepositoryPayload) -> Self {
        Self {
            owner: payload.owner.login,
            name: payload.name,
            clone_url: payload.clone_url,
            html_url: payload.html_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRepositoryRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub private: bool,
    pub has_issues: bool,
    pub has_projects: bool,
    pub has_wiki: bool,
    pub auto_init: bool,
}

impl<'a> CreateRepositoryRequest<'a> {
    pub fn private(name: &'a str, description: &'a str) -> Self {
        Self {
            name,
            description,
            private: true,
            has_issues: true,
            has_projects: false,
            has_wiki: false,
            auto_init: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DeviceCodeRequest<'a> {
    pub client_id: &'a str,
    pub scope: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    pub interval: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccessTokenRequest<'a> {
    pub client_id: &'a str,
    pub device_code: &'a str,
    pub grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessTokenSuccess {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessTokenError {
    pub error: String,
    pub error_description: Option<String>,
}

/// An issued device code, waiting for the user to authorize it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFlowSession {
    pub device_code: String,
    /// Code the user types at `verification_uri`
    pub user_code: String,
    pub verification_uri: String,
    /// Minimum delay between token polls
    pub interval: Duration,
    pub expires_in: Duration,
    /// Absolute deadline, fixed when the session was issued
    pub expires_at: DateTime<Utc>,
}

impl DeviceFlowSession {
    pub(crate) fn issued(response: DeviceCodeResponse, now: DateTime<Utc>) -> Self {
        Self {
            device_code: response.device_code,
            user_code: response.user_code,
            verification_uri: response.verification_uri,
            interval: Duration::from_secs(response.interval),
            expires_in: Duration::from_secs(response.expires_in),
            expires_at: now + ChronoDuration::seconds(response.expires_in as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_body() {
        let body = serde_json::to_value(CreateRepositoryRequest::private(
            "acme-widgets-private",
            "Private fork of acme/widgets",
        ))
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "name": "acme-widgets-private",
                "description": "Private fork of acme/widgets",
                "private": true,
                "has_issues": true,
                "has_projects": false,
                "has_wiki": false,
                "auto_init": false,
            })
        );
    }

    #[test]
    fn test_session_deadline_from_issue_time() {
        let now = Utc::now();
        let session = DeviceFlowSession::issued(
            DeviceCodeResponse {
                device_code: "dev".into(),
                user_code: "ABCD-1234".into(),
                verification_uri: "https://github.com/login/device".into(),
                expires_in: 900,
                interval: 5,
            },
            now,
        );
        assert_eq!(session.expires_at - now, ChronoDuration::seconds(900));
        assert_eq!(session.interval, Duration::from_secs(5));
    }
}
