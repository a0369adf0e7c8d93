//! Error types for process execution and git operations

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for git operations
pub type Result<T> = std::result::Result<T, GitError>;

/// Classified failure of a single external command
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be found (spawn failure or exit code 127)
    #[error("Command not found: {program}")]
    CommandNotFound { program: String },

    /// The program ran and exited with a non-zero code
    #[error("Command exited with code {exit_code}: {stderr}")]
    ExecutionFailed { exit_code: i32, stderr: String },

    /// The program was killed after exceeding its timeout
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// The requested working directory is missing or not a directory
    #[error("Invalid working directory: {}", path.display())]
    InvalidWorkingDirectory { path: PathBuf },

    /// Spawning failed for a reason other than a missing program
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    /// URL scheme is not one git can clone over the network
    #[error("Unsupported repository URL: {0}")]
    InvalidUrl(String),

    /// Path is not inside a git repository
    #[error("Not a git repository: {}", path.display())]
    InvalidRepository { path: PathBuf },

    #[error("Git authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Git network error: {0}")]
    NetworkError(String),

    #[error("Git repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Git remote already exists: {0}")]
    RemoteAlreadyExists(String),

    /// Any other git failure, carrying git's stderr
    #[error("Git command failed: {0}")]
    CommandExecutionFailed(String),

    #[error("Git command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid working directory for git: {}", path.display())]
    InvalidWorkingDirectory { path: PathBuf },

    #[error("git is not installed or not on PATH")]
    GitNotInstalled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcessError> for GitError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::ExecutionFailed { stderr, .. } => classify_stderr(&stderr),
            ProcessError::Timeout(duration) => Self::Timeout(duration),
            ProcessError::InvalidWorkingDirectory { path } => {
                Self::InvalidWorkingDirectory { path }
            }
            ProcessError::CommandNotFound { .. } => Self::GitNotInstalled,
            ProcessError::SpawnFailed { program, source } => {
                Self::CommandExecutionFailed(format!("failed to spawn {}: {}", program, source))
            }
        }
    }
}

/// Map git's stderr onto the error taxonomy.
///
/// Checks run in order and the first match wins.
pub fn classify_stderr(stderr: &str) -> GitError {
    let lower = stderr.to_lowercase();
    let message = stderr.trim().to_string();

    if lower.contains("authentication failed") || lower.contains("permission denied") {
        GitError::AuthenticationFailed(message)
    } else if lower.contains("network") || lower.contains("connection") {
        GitError::NetworkError(message)
    } else if lower.contains("not found") || lower.contains("does not exist") {
        GitError::RepositoryNotFound(message)
    } else if lower.contains("already exists") {
        GitError::RemoteAlreadyExists(message)
    } else {
        GitError::CommandExecutionFailed(message)
    }
}
