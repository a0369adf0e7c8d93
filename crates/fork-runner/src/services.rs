//! Capabilities the workflow needs from git and GitHub

use async_trait::async_trait;
use git_ops::{GitError, GitOperationsClient};
use github_client::{GitHubClient, GitHubError, GitHubUser, RepositoryRef};
use std::path::Path;

/// Git subcommands used by the fork workflow
#[async_trait]
pub trait GitService: Send + Sync {
    async fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), GitError>;

    async fn add_remote(&self, name: &str, url: &str, repo_path: &Path) -> Result<(), GitError>;

    /// Push `refspec` (`--all`, `--tags` or a ref) to `remote`
    async fn push(&self, remote: &str, refspec: &str, repo_path: &Path) -> Result<(), GitError>;
}

/// GitHub operations used by the fork workflow
#[async_trait]
pub trait GitHubService: Send + Sync {
    async fn get_current_user(&self) -> Result<GitHubUser, GitHubError>;

    async fn create_private_repository(
        &self,
        name: &str,
        description: &str,
    ) -> Result<RepositoryRef, GitHubError>;

    async fn delete_repository(&self, name: &str) -> Result<(), GitHubError>;
}

#[async_trait]
impl GitService for GitOperationsClient {
    async fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), GitError> {
        GitOperationsClient::clone(self, url, destination).await
    }

    async fn add_remote(&self, name: &str, url: &str, repo_path: &Path) -> Result<(), GitError> {
        GitOperationsClient::add_remote(self, name, url, repo_path).await
    }

    async fn push(&self, remote: &str, refspec: &str, repo_path: &Path) -> Result<(), GitError> {
        GitOperationsClient::push(self, remote, refspec, repo_path, false).await
    }
}

#[async_trait]
impl GitHubService for GitHubClient {
    async fn get_current_user(&self) -> Result<GitHubUser, GitHubError> {
        GitHubClient::get_current_user(self).await
    }

    async fn create_private_repository(
        &self,
        name: &str,
        description: &str,
    ) -> Result<RepositoryRef, GitHubError> {
        GitHubClient::create_private_repository(self, name, description).await
    }

    async fn delete_repository(&self, name: &str) -> Result<(), GitHubError> {
        GitHubClient::delete_repository(self, name).await
    }
}
