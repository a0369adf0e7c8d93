//! OAuth 2.0 Device Authorization Flow
//!
//! `initiate_device_flow` asks GitHub for a device code; the user enters the
//! matching user code in a browser while `poll_for_access_token` polls the
//! token endpoint. The poll loop is the state machine
//!
//! ```text
//! Initiated -> Polling -> { Succeeded, Expired, Denied, UnexpectedResponse, Timeout }
//! ```
//!
//! where `authorization_pending` keeps polling at the same interval and
//! `slow_down` keeps polling with the interval raised by five seconds.

use chrono::Utc;
use pf_core::OAuthToken;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::GitHubClient;
use crate::error::DeviceFlowError;
use crate::types::{
    AccessTokenError, AccessTokenRequest, AccessTokenSuccess, DeviceCodeRequest,
    DeviceCodeResponse, DeviceFlowSession,
};

/// Scopes requested for the token
pub const DEVICE_FLOW_SCOPE: &str = "repo user";

/// Added to the polling interval on every `slow_down`
pub const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// What one token-endpoint response means for the poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResponse {
    Token(String),
    Pending,
    SlowDown,
    Expired,
    Denied,
    Unexpected(String),
}

/// Classify a token-endpoint body.
///
/// A success payload is tried first, then the known error payload.
pub fn classify_token_response(body: &str) -> PollResponse {
    if let Ok(success) = serde_json::from_str::<AccessTokenSuccess>(body) {
        if !success.access_token.is_empty() {
            return PollResponse::Token(success.access_token);
        }
    }

    match serde_json::from_str::<AccessTokenError>(body) {
        Ok(err) => match err.error.as_str() {
            "authorization_pending" => PollResponse::Pending,
            "slow_down" => PollResponse::SlowDown,
            "expired_token" => PollResponse::Expired,
            "access_denied" => PollResponse::Denied,
            other => PollResponse::Unexpected(match err.error_description {
                Some(description) => format!("{}: {}", other, description),
                None => other.to_string(),
            }),
        },
        Err(_) => PollResponse::Unexpected(format!(
            "unrecognized token response: {}",
            body.chars().take(200).collect::<String>()
        )),
    }
}

/// Poll until a terminal response or until `expires_in` has elapsed.
///
/// `attempt` performs one token request and returns the raw body.
pub(crate) async fn poll_until_terminal<F, Fut>(
    mut interval: Duration,
    expires_in: Duration,
    mut attempt: F,
) -> Result<String, DeviceFlowError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, DeviceFlowError>>,
{
    let deadline = Instant::now() + expires_in;

    while Instant::now() < deadline {
        tokio::time::sleep(interval).await;

        let body = attempt().await?;
        match classify_token_response(&body) {
            PollResponse::Token(token) => return Ok(token),
            PollResponse::Pending => debug!("Authorization pending"),
            PollResponse::SlowDown => {
                interval += SLOW_DOWN_INCREMENT;
                debug!("Asked to slow down, polling every {:?}", interval);
            }
            PollResponse::Expired => return Err(DeviceFlowError::Expired),
            PollResponse::Denied => return Err(DeviceFlowError::Denied),
            PollResponse::Unexpected(message) => {
                return Err(DeviceFlowError::UnexpectedResponse(message))
            }
        }
    }

    warn!("Device authorization not completed within {:?}", expires_in);
    Err(DeviceFlowError::Timeout)
}

impl GitHubClient {
    /// Request a device code and user code
    pub async fn initiate_device_flow(&self) -> Result<DeviceFlowSession, DeviceFlowError> {
        let request = DeviceCodeRequest {
            client_id: &self.config.client_id,
            scope: DEVICE_FLOW_SCOPE,
        };

        let response = self
            .http
            .post(&self.config.device_code_url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.config.user_agent.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| DeviceFlowError::InitiationFailed(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DeviceFlowError::InitiationFailed(format!(
                "{} - {}",
                status, text
            )));
        }

        let payload: DeviceCodeResponse = response
            .json()
            .await
            .map_err(|e| DeviceFlowError::InitiationFailed(format!("invalid response: {}", e)))?;

        let session = DeviceFlowSession::issued(payload, Utc::now());
        info!(
            "Device flow started, user code {} at {}",
            session.user_code, session.verification_uri
        );
        Ok(session)
    }

    /// Poll the token endpoint until the user authorizes `device_code`.
    ///
    /// On success the token is written to the credential store before it is
    /// returned; a failed write is an error.
    pub async fn poll_for_access_token(
        &self,
        device_code: &str,
        interval: Duration,
        expires_in: Duration,
    ) -> Result<OAuthToken, DeviceFlowError> {
        let access_token = poll_until_terminal(interval, expires_in, || {
            self.request_access_token(device_code)
        })
        .await?;

        let token = OAuthToken::from_device_flow(access_token, Utc::now());
        self.credentials.save(&token).await.map_err(|e| {
            DeviceFlowError::UnexpectedError(format!("failed to store access token: {}", e))
        })?;

        info!("Device flow completed, token stored");
        Ok(token)
    }

    async fn request_access_token(&self, device_code: &str) -> Result<String, DeviceFlowError> {
        let request = AccessTokenRequest {
            client_id: &self.config.client_id,
            device_code,
            grant_type: DEVICE_GRANT_TYPE,
        };

        let response = self
            .http
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.config.user_agent.as_str())
            .json(&request)
            .send()
            .await?;

        // GitHub reports pending/slow_down with 200 as well, so the body decides
        Ok(response.text().await?)
    }

    /// Run the whole device flow. `on_code` is called once with the session
    /// so the caller can show the user code and verification URL.
    pub async fn authenticate_with_device_flow<F>(
        &self,
        on_code: F,
    ) -> Result<OAuthToken, DeviceFlowError>
    where
        F: FnOnce(&DeviceFlowSession),
    {
        let session = self.initiate_device_flow().await?;
        on_code(&session);
        self.poll_for_access_token(&session.device_code, session.interval, session.expires_in)
            .await
    }

    /// Forget the stored token
    pub async fn logout(&self) -> Result<(), crate::error::GitHubError> {
        self.credentials.delete().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const PENDING: &str = r#"{"error":"authorization_pending","error_description":"pending"}"#;
    const SLOW_DOWN: &str = r#"{"error":"slow_down","error_description":"too fast","interval":10}"#;
    const TOKEN: &str = r#"{"access_token":"gho_granted","token_type":"bearer","scope":"repo,user"}"#;

    /// Replays `responses` in order and records when each attempt happened
    struct Script {
        responses: Mutex<VecDeque<&'static str>>,
        attempts: Mutex<Vec<Instant>>,
    }

    impl Script {
        fn new(responses: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().copied().collect()),
                attempts: Mutex::new(Vec::new()),
            })
        }

        fn next(self: &Arc<Self>) -> impl Future<Output = Result<String, DeviceFlowError>> {
            let script = Arc::clone(self);
            async move {
                script.attempts.lock().unwrap().push(Instant::now());
                let body = script.responses.lock().unwrap().pop_front().unwrap_or(PENDING);
                Ok(body.to_string())
            }
        }

        fn offsets_from(&self, start: Instant) -> Vec<u64> {
            self.attempts
                .lock()
                .unwrap()
                .iter()
                .map(|at| at.duration_since(start).as_secs())
                .collect()
        }
    }

    #[test]
    fn test_classify_token_response() {
        assert_eq!(
            classify_token_response(TOKEN),
            PollResponse::Token("gho_granted".into())
        );
        assert_eq!(classify_token_response(PENDING), PollResponse::Pending);
        assert_eq!(classify_token_response(SLOW_DOWN), PollResponse::SlowDown);
        assert_eq!(
            classify_token_response(r#"{"error":"expired_token"}"#),
            PollResponse::Expired
        );
        assert_eq!(
            classify_token_response(r#"{"error":"access_denied"}"#),
            PollResponse::Denied
        );
        assert!(matches!(
            classify_token_response(r#"{"error":"incorrect_client_credentials"}"#),
            PollResponse::Unexpected(m) if m.contains("incorrect_client_credentials")
        ));
        assert!(matches!(
            classify_token_response("<html>bad gateway</html>"),
            PollResponse::Unexpected(_)
        ));
        // An empty token is not a success
        assert!(matches!(
            classify_token_response(r#"{"access_token":""}"#),
            PollResponse::Unexpected(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_down_is_cumulative() {
        let script = Script::new(&[SLOW_DOWN, SLOW_DOWN, PENDING, TOKEN]);
        let start = Instant::now();

        let token = poll_until_terminal(Duration::from_secs(1), Duration::from_secs(900), || {
            script.next()
        })
        .await
        .unwrap();

        assert_eq!(token, "gho_granted");
        // 1s, then 6s after the first slow_down, then 11s twice
        assert_eq!(script.offsets_from(start), vec![1, 7, 18, 29]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_until_deadline_times_out() {
        let script = Script::new(&[]);
        let start = Instant::now();

        let err = poll_until_terminal(Duration::from_secs(1), Duration::from_secs(2), || {
            script.next()
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DeviceFlowError::Timeout));
        assert_eq!(script.offsets_from(start), vec![1, 2]);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_errors_stop_polling() {
        for (body, expected) in [
            (r#"{"error":"expired_token"}"#, "expired"),
            (r#"{"error":"access_denied"}"#, "denied"),
            (r#"{"error":"unsupported_grant_type"}"#, "unexpected"),
        ] {
            let script = Script::new(&[PENDING, body]);
            let err = poll_until_terminal(Duration::from_secs(1), Duration::from_secs(60), || {
                script.next()
            })
            .await
            .unwrap_err();
            let kind = match err {
                DeviceFlowError::Expired => "expired",
                DeviceFlowError::Denied => "denied",
                DeviceFlowError::UnexpectedResponse(_) => "unexpected",
                _ => "other",
            };
            assert_eq!(kind, expected, "for {body}");
            assert_eq!(script.attempts.lock().unwrap().len(), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_terminal() {
        let mut calls = 0;
        let err = poll_until_terminal(Duration::from_secs(1), Duration::from_secs(60), || {
            calls += 1;
            async { Err(DeviceFlowError::UnexpectedError("socket closed".into())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DeviceFlowError::UnexpectedError(_)));
        assert_eq!(calls, 1);
    }
}
