use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// Lifetime assigned to tokens obtained through the device flow
pub const DEVICE_FLOW_TOKEN_TTL_HOURS: i64 = 8;

/// OAuth access token as persisted by a credential store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl OAuthToken {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: String::new(),
            expires_at,
        }
    }

    /// Token issued by a successful device flow: no refresh token,
    /// valid for eight hours from `now`.
    pub fn from_device_flow(access_token: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::new(access_token, now + Duration::hours(DEVICE_FLOW_TOKEN_TTL_HOURS))
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Reject tokens that can't be presented as a bearer credential
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.access_token.trim().is_empty() {
            return Err(CredentialError::Invalid("access token is empty".into()));
        }
        if self.is_expired() {
            return Err(CredentialError::Invalid(format!(
                "access token expired at {}",
                self.expires_at
            )));
        }
        Ok(())
    }
}
