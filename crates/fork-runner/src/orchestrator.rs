//! Fork orchestrator - runs the private fork workflow
//!
//! The workflow is a saga: every step runs in order, the first failure stops
//! it, and once the private repository exists a failure deletes it again.

use std::path::Path;
use std::sync::Arc;

use pf_core::CredentialStore;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use github_client::{GitHubError, GitHubUser, RepositoryRef};

use crate::error::{CleanupOutcome, ForkError, Result, WorkflowError};
use crate::event::{ForkStep, StatusEvent};
use crate::services::{GitHubService, GitService};
use crate::source::SourceRepository;

/// Name of the remote that points at the private repository
pub const PRIVATE_REMOTE: &str = "private";

/// Progress of one workflow run. Lives only as long as the run.
#[derive(Debug, Clone, Default)]
pub struct ForkWorkflowState {
    last_completed: Option<ForkStep>,
    repository: Option<RepositoryRef>,
}

impl ForkWorkflowState {
    pub fn last_completed(&self) -> Option<ForkStep> {
        self.last_completed
    }

    /// The private repository, once it has been created
    pub fn repository(&self) -> Option<&RepositoryRef> {
        self.repository.as_ref()
    }

    /// The repository to delete after a failure: one was recorded and the
    /// creation step has completed.
    pub fn compensation_target(&self) -> Option<&RepositoryRef> {
        let created = self.last_completed >= Some(ForkStep::CreateRepository);
        self.repository.as_ref().filter(|_| created)
    }

    fn complete(&mut self, step: ForkStep) {
        self.last_completed = Some(step);
    }
}

/// Sends status events for one run, in order
struct StatusReporter {
    run_id: Uuid,
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl StatusReporter {
    fn progress(&self, step: ForkStep, message: String) {
        info!("[{}] {}", step, message);
        self.send(StatusEvent::progress(self.run_id, step, message));
    }

    fn warning(&self, step: ForkStep, message: String) {
        warn!("[{}] {}", step, message);
        self.send(StatusEvent::warning(self.run_id, step, message));
    }

    fn cleanup(&self, message: String) {
        info!("[{}] {}", ForkStep::Cleanup, message);
        self.send(StatusEvent::cleanup(self.run_id, message));
    }

    fn send(&self, event: StatusEvent) {
        // Nobody listening is fine; the workflow still runs to completion
        let _ = self.tx.send(event);
    }
}

/// Runs the private fork workflow against git and GitHub
pub struct ForkOrchestrator {
    git: Arc<dyn GitService>,
    github: Arc<dyn GitHubService>,
    credentials: Arc<dyn CredentialStore>,
}

impl ForkOrchestrator {
    pub fn new(
        git: Arc<dyn GitService>,
        github: Arc<dyn GitHubService>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            git,
            github,
            credentials,
        }
    }

    /// Create a private copy of `repository_url`, cloned at `local_path`.
    ///
    /// Stage descriptions are sent on `status_tx` in order. Returns a success
    /// message containing the private repository's web URL.
    pub async fn create_private_fork(
        &self,
        repository_url: &str,
        local_path: &Path,
        status_tx: mpsc::UnboundedSender<StatusEvent>,
    ) -> Result<String> {
        let reporter = StatusReporter {
            run_id: Uuid::new_v4(),
            tx: status_tx,
        };
        let mut state = ForkWorkflowState::default();

        info!(
            "Starting private fork {} of {} into {:?}",
            reporter.run_id, repository_url, local_path
        );

        match self
            .run(&reporter, &mut state, repository_url, local_path)
            .await
        {
            Ok(message) => Ok(message),
            Err(mut err) => {
                error!("Private fork failed at {}: {}", err.step, err.error);
                if let Some(repository) = state.compensation_target() {
                    err.cleanup = Some(self.compensate(&reporter, repository).await);
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        reporter: &StatusReporter,
        state: &mut ForkWorkflowState,
        repository_url: &str,
        local_path: &Path,
    ) -> Result<String> {
        // 1. Source owner and name
        reporter.progress(ForkStep::ParseUrl, "Parsing repository URL...".to_string());
        let source = SourceRepository::parse(repository_url).map_err(|reason| {
            ForkError::new(
                ForkStep::ParseUrl,
                WorkflowError::InvalidRepositoryUrl {
                    url: repository_url.to_string(),
                    reason,
                },
            )
        })?;
        state.complete(ForkStep::ParseUrl);

        // 2. Clone destination
        reporter.progress(
            ForkStep::ValidateLocalPath,
            "Validating local path...".to_string(),
        );
        validate_local_path(local_path)
            .await
            .map_err(|e| ForkError::new(ForkStep::ValidateLocalPath, e))?;
        state.complete(ForkStep::ValidateLocalPath);

        // 3. Credentials
        reporter.progress(
            ForkStep::ValidateCredentials,
            "Validating GitHub credentials...".to_string(),
        );
        let user = self.validate_credentials().await.map_err(|e| {
            ForkError::new(
                ForkStep::ValidateCredentials,
                WorkflowError::CredentialValidationFailed(e),
            )
        })?;
        reporter.progress(
            ForkStep::ValidateCredentials,
            format!("Authenticated as {}", user.login),
        );
        state.complete(ForkStep::ValidateCredentials);

        // 4. Private repository
        let private_name = source.private_name();
        reporter.progress(
            ForkStep::CreateRepository,
            format!("Creating private repository {}...", private_name),
        );
        let repository = self
            .github
            .create_private_repository(&private_name, &source.description())
            .await
            .map_err(|e| {
                ForkError::new(
                    ForkStep::CreateRepository,
                    WorkflowError::RepositoryCreationFailed(e),
                )
            })?;
        reporter.progress(
            ForkStep::CreateRepository,
            format!("Created private repository {}", repository.html_url),
        );
        let clone_url = repository.clone_url.clone();
        let html_url = repository.html_url.clone();
        state.repository = Some(repository);
        state.complete(ForkStep::CreateRepository);

        // 5. Clone
        reporter.progress(ForkStep::Clone, format!("Cloning {}...", repository_url));
        self.git
            .clone_repository(repository_url, local_path)
            .await
            .map_err(|e| ForkError::new(ForkStep::Clone, WorkflowError::git("clone", e)))?;
        state.complete(ForkStep::Clone);

        // 6. Remote
        reporter.progress(
            ForkStep::AddRemote,
            format!("Adding remote '{}'...", PRIVATE_REMOTE),
        );
        self.git
            .add_remote(PRIVATE_REMOTE, &clone_url, local_path)
            .await
            .map_err(|e| {
                ForkError::new(ForkStep::AddRemote, WorkflowError::git("remote add", e))
            })?;
        state.complete(ForkStep::AddRemote);

        // 7. Push branches, then tags
        reporter.progress(
            ForkStep::PushBranches,
            "Pushing all branches to private repository...".to_string(),
        );
        self.git
            .push(PRIVATE_REMOTE, "--all", local_path)
            .await
            .map_err(|e| ForkError::new(ForkStep::PushBranches, WorkflowError::git("push", e)))?;
        state.complete(ForkStep::PushBranches);

        reporter.progress(
            ForkStep::PushTags,
            "Pushing tags to private repository...".to_string(),
        );
        match self.git.push(PRIVATE_REMOTE, "--tags", local_path).await {
            Ok(()) => state.complete(ForkStep::PushTags),
            Err(e) => reporter.warning(
                ForkStep::PushTags,
                format!("Warning: failed to push tags: {}", e),
            ),
        }

        // 8. Done
        state.complete(ForkStep::Completed);
        reporter.progress(
            ForkStep::Completed,
            "Private fork created successfully".to_string(),
        );
        Ok(format!("Private fork created successfully: {}", html_url))
    }

    async fn validate_credentials(&self) -> std::result::Result<GitHubUser, GitHubError> {
        self.credentials.retrieve().await?;
        self.github.get_current_user().await
    }

    /// Delete the repository created earlier in the run
    async fn compensate(
        &self,
        reporter: &StatusReporter,
        repository: &RepositoryRef,
    ) -> CleanupOutcome {
        reporter.cleanup(format!(
            "Cleaning up: deleting repository {}...",
            repository.name
        ));

        match self.github.delete_repository(&repository.name).await {
            Ok(()) => {
                info!("Deleted repository {}", repository.name);
                CleanupOutcome::Deleted {
                    name: repository.name.clone(),
                }
            }
            Err(e) => {
                error!(
                    "Failed to delete repository {}, remove it manually: {}",
                    repository.name, e
                );
                CleanupOutcome::Failed {
                    name: repository.name.clone(),
                    error: e,
                }
            }
        }
    }
}

/// The destination's parent directory must already exist
async fn validate_local_path(local_path: &Path) -> std::result::Result<(), WorkflowError> {
    let invalid = |reason: &str| WorkflowError::InvalidLocalPath {
        path: local_path.to_path_buf(),
        reason: reason.to_string(),
    };

    if local_path.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }

    let parent = match local_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => return Err(invalid("path has no parent directory")),
    };

    match tokio::fs::metadata(parent).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(invalid("parent is not a directory")),
        Err(_) => Err(invalid("parent directory does not exist")),
    }
}
