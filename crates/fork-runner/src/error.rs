//! Error types for fork-runner

use git_ops::GitError;
use github_client::GitHubError;
use std::path::PathBuf;
use thiserror::Error;

use crate::event::ForkStep;

/// Result type alias for the fork workflow
pub type Result<T> = std::result::Result<T, ForkError>;

/// Why a workflow step failed
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The source URL does not name an owner and a repository
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    /// The clone destination can't be used
    #[error("Invalid local path {}: {reason}", path.display())]
    InvalidLocalPath { path: PathBuf, reason: String },

    /// No usable token, or GitHub rejected it
    #[error("GitHub credential validation failed: {0}")]
    CredentialValidationFailed(#[source] GitHubError),

    /// Creating the private repository failed
    #[error("Failed to create private repository: {0}")]
    RepositoryCreationFailed(#[source] GitHubError),

    /// A git subcommand failed
    #[error("git {operation} failed: {source}")]
    GitOperationFailed {
        operation: &'static str,
        #[source]
        source: GitError,
    },
}

impl WorkflowError {
    pub fn git(operation: &'static str, source: GitError) -> Self {
        Self::GitOperationFailed { operation, source }
    }
}

/// What happened to the created repository after a failure
#[derive(Debug)]
pub enum CleanupOutcome {
    Deleted { name: String },
    Failed { name: String, error: GitHubError },
}

impl CleanupOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }
}

/// A failed workflow: the step, its cause and, when a repository had
/// already been created, the result of deleting it again
#[derive(Debug, Error)]
#[error("{error}{}", cleanup_note(.cleanup))]
pub struct ForkError {
    pub step: ForkStep,
    #[source]
    pub error: WorkflowError,
    pub cleanup: Option<CleanupOutcome>,
}

fn cleanup_note(cleanup: &Option<CleanupOutcome>) -> String {
    match cleanup {
        None => String::new(),
        Some(CleanupOutcome::Deleted { name }) => {
            format!(" (repository {} was deleted)", name)
        }
        Some(CleanupOutcome::Failed { name, error }) => format!(
            " (repository {} could not be deleted and must be removed manually: {})",
            name, error
        ),
    }
}

impl ForkError {
    pub fn new(step: ForkStep, error: WorkflowError) -> Self {
        Self {
            step,
            error,
            cleanup: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_cleanup_result() {
        let mut err = ForkError::new(
            ForkStep::PushBranches,
            WorkflowError::git("push", GitError::NetworkError("could not resolve host".into())),
        );
        assert_eq!(
            err.to_string(),
            "git push failed: Git network error: could not resolve host"
        );

        err.cleanup = Some(CleanupOutcome::Failed {
            name: "acme-widgets-private".into(),
            error: GitHubError::InsufficientPermissions,
        });
        let message = err.to_string();
        assert!(message.contains("acme-widgets-private could not be deleted"));
        assert!(message.contains("403"));
    }
}
