//! Environment-driven configuration

use std::path::PathBuf;
use std::time::Duration;

/// Default GitHub REST endpoint
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const DEFAULT_GIT_TIMEOUT_SECS: u64 = 120;

/// Runtime configuration shared by the CLI and the workflow
#[derive(Debug, Clone)]
pub struct ForkConfig {
    /// Directory holding the stored token
    pub data_dir: PathBuf,
    /// OAuth App client ID used for the device flow
    pub github_client_id: Option<String>,
    /// Base URL for REST calls
    pub github_api_url: String,
    /// Default timeout applied to git subprocesses
    pub git_timeout: Duration,
}

impl Default for ForkConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".private-fork"),
            github_client_id: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            git_timeout: Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS),
        }
    }
}

impl ForkConfig {
    /// Build the configuration from `PF_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let git_timeout = non_empty("PF_GIT_TIMEOUT_SECS")
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.git_timeout);

        Self {
            data_dir: non_empty("PF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            github_client_id: non_empty("PF_GITHUB_CLIENT_ID"),
            github_api_url: non_empty("PF_GITHUB_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.github_api_url),
            git_timeout,
        }
    }

    /// Path of the JSON file holding the OAuth token
    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join("credentials.json")
    }
}
