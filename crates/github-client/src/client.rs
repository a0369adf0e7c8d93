//! GitHub REST operations

use pf_core::CredentialStore;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::GitHubConfig;
use crate::error::{map_error_response, GitHubError, Result};
use crate::types::{CreateRepositoryRequest, GitHubUser, RepositoryPayload, RepositoryRef};
use crate::validate::validate_repository_name;

const GITHUB_V3_ACCEPT: &str = "application/vnd.github.v3+json";

/// Client for the GitHub REST API and OAuth device flow
#[derive(Clone)]
pub struct GitHubClient {
    pub(crate) config: GitHubConfig,
    pub(crate) http: Client,
    pub(crate) credentials: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("config", &self.config)
            .field("http", &"<http_client>")
            .field("credentials", &"<credential_store>")
            .finish()
    }
}

impl GitHubClient {
    /// Create a new client. Tokens are read from and written to `credentials`.
    pub fn new(config: GitHubConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            http: Client::new(),
            credentials,
        }
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Headers for an authenticated REST call.
    ///
    /// Fails before any network traffic when no usable token is stored.
    async fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self.credentials.retrieve().await?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_V3_ACCEPT));
        let auth = HeaderValue::from_str(&format!("token {}", token.access_token))
            .map_err(|_| GitHubError::InvalidCredentials("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    async fn send<B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let headers = self.auth_headers().await?;
        let url = format!("{}{}", self.config.api_url, endpoint);
        debug!("GitHub {} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .headers(headers)
            .header(USER_AGENT, self.config.user_agent.as_str());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            debug!("GitHub returned {}: {}", status, text);
            return Err(map_error_response(status, &headers, &text));
        }

        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self.send::<()>(Method::GET, endpoint, None).await?;
        response
            .json()
            .await
            .map_err(|e| GitHubError::UnexpectedError(format!("Failed to parse response: {}", e)))
    }

    /// The user the stored token belongs to
    pub async fn get_current_user(&self) -> Result<GitHubUser> {
        self.get("/user").await
    }

    fn repo_endpoint(owner: &str, name: &str) -> String {
        format!(
            "/repos/{}/{}",
            urlencoding::encode(owner),
            urlencoding::encode(name.trim())
        )
    }

    /// Whether the current user owns a repository called `name`
    pub async fn repository_exists(&self, name: &str) -> Result<bool> {
        let owner = self.get_current_user().await?.login;
        let endpoint = Self::repo_endpoint(&owner, name);
        match self.send::<()>(Method::GET, &endpoint, None).await {
            Ok(_) => Ok(true),
            Err(GitHubError::RepositoryNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete the current user's repository called `name`
    pub async fn delete_repository(&self, name: &str) -> Result<()> {
        let owner = self.get_current_user().await?.login;
        let endpoint = Self::repo_endpoint(&owner, name);
        info!("Deleting repository {}/{}", owner, name);
        self.send::<()>(Method::DELETE, &endpoint, None).await?;
        Ok(())
    }

    /// Create a private repository owned by the current user.
    ///
    /// An existing repository with the same name is reported as
    /// [`GitHubError::RepositoryNameConflict`], whether it is caught by the
    /// up-front existence check or by GitHub rejecting the create.
    pub async fn create_private_repository(
        &self,
        name: &str,
        description: &str,
    ) -> Result<RepositoryRef> {
        validate_repository_name(name)?;
        let name = name.trim();

        match self.repository_exists(name).await {
            Ok(true) => return Err(GitHubError::RepositoryNameConflict(name.to_string())),
            Ok(false) | Err(GitHubError::RepositoryNotFound) => {}
            Err(e) => return Err(e),
        }

        info!("Creating private repository {}", name);
        let request = CreateRepositoryRequest::private(name, description);
        let response = match self.send(Method::POST, "/user/repos", Some(&request)).await {
            Ok(response) => response,
            Err(GitHubError::Api { status: 422, body, .. }) if reports_name_taken(&body) => {
                warn!("Repository {} was created concurrently", name);
                return Err(GitHubError::RepositoryNameConflict(name.to_string()));
            }
            Err(e) => return Err(e),
        };

        let payload: RepositoryPayload = response
            .json()
            .await
            .map_err(|e| GitHubError::UnexpectedError(format!("Failed to parse response: {}", e)))?;
        Ok(payload.into())
    }
}

fn reports_name_taken(body: &crate::error::ApiErrorBody) -> bool {
    let taken = |text: &str| text.to_lowercase().contains("already exists");
    taken(&body.message)
        || body
            .errors
            .iter()
            .any(|detail| detail.message.as_deref().is_some_and(taken))
}
