/// Endpoints and identity used by [`GitHubClient`](crate::GitHubClient)
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// REST API base URL
    pub api_url: String,
    /// Device code endpoint of the OAuth device flow
    pub device_code_url: String,
    /// Token endpoint of the OAuth device flow
    pub token_url: String,
    /// OAuth App client ID
    pub client_id: String,
    /// GitHub rejects requests without a User-Agent
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            device_code_url: "https://github.com/login/device/code".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            client_id: String::new(),
            user_agent: "private-fork".to_string(),
        }
    }
}

impl GitHubConfig {
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Use a different REST base URL (GitHub Enterprise, test servers)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        let mut url = api_url.into();
        // Remove trailing slash if present
        if url.ends_with('/') {
            url.pop();
        }
        self.api_url = url;
        self
    }
}
