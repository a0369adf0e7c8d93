//! Git subcommands built on a [`CommandRunner`]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{GitError, Result};
use crate::executor::{CommandInvocation, CommandRunner, ProcessExecutor};

/// Lower bound for push timeouts, whatever the configured default
pub const MIN_PUSH_TIMEOUT: Duration = Duration::from_secs(300);

/// What `status` reports when `git status --porcelain` prints nothing
pub const WORKING_TREE_CLEAN: &str = "Working tree clean";

/// Configuration for GitOperationsClient
#[derive(Debug, Clone)]
pub struct GitConfig {
    /// Timeout for every git call except push
    pub default_timeout: Duration,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(120),
        }
    }
}

/// Runs git subcommands and maps their failures to [`GitError`]
#[derive(Clone)]
pub struct GitOperationsClient {
    runner: Arc<dyn CommandRunner>,
    config: GitConfig,
}

impl std::fmt::Debug for GitOperationsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitOperationsClient")
            .field("runner", &"<runner>")
            .field("config", &self.config)
            .finish()
    }
}

impl Default for GitOperationsClient {
    fn default() -> Self {
        Self::new(GitConfig::default())
    }
}

impl GitOperationsClient {
    /// Create a client that spawns real git processes
    pub fn new(config: GitConfig) -> Self {
        Self::with_runner(Arc::new(ProcessExecutor::new()), config)
    }

    /// Create a client on top of a custom runner
    pub fn with_runner(runner: Arc<dyn CommandRunner>, config: GitConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    /// Timeout applied to `push`
    pub fn push_timeout(&self) -> Duration {
        self.config.default_timeout.max(MIN_PUSH_TIMEOUT)
    }

    async fn git(
        &self,
        args: Vec<String>,
        repo_path: Option<&Path>,
        timeout: Duration,
    ) -> Result<String> {
        debug!("Running git {:?} in {:?}", args, repo_path);

        let mut invocation = CommandInvocation::new("git", timeout)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0");
        if let Some(path) = repo_path {
            invocation = invocation.current_dir(path);
        }

        Ok(self.runner.execute(invocation).await?)
    }

    /// Clone `url` into `dest`, creating `dest`'s parent directory if needed
    pub async fn clone(&self, url: &str, dest: &Path) -> Result<()> {
        if !is_supported_url(url) {
            return Err(GitError::InvalidUrl(url.to_string()));
        }

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating clone parent directory {:?}", parent);
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!("Cloning {} into {:?}", url, dest);
        self.git(
            vec![
                "clone".into(),
                url.to_string(),
                dest.to_string_lossy().into_owned(),
            ],
            None,
            self.config.default_timeout,
        )
        .await?;
        Ok(())
    }

    /// Check if a path is inside a git repository.
    ///
    /// Any failure, including a missing directory, counts as "no".
    pub async fn is_valid_repository(&self, repo_path: &Path) -> bool {
        self.git(
            vec!["rev-parse".into(), "--git-dir".into()],
            Some(repo_path),
            self.config.default_timeout,
        )
        .await
        .is_ok()
    }

    async fn ensure_repository(&self, repo_path: &Path) -> Result<()> {
        if self.is_valid_repository(repo_path).await {
            Ok(())
        } else {
            Err(GitError::InvalidRepository {
                path: repo_path.to_path_buf(),
            })
        }
    }

    /// Add a remote
    pub async fn add_remote(&self, name: &str, url: &str, repo_path: &Path) -> Result<()> {
        self.ensure_repository(repo_path).await?;
        info!("Adding remote {} -> {}", name, url);
        self.git(
            vec!["remote".into(), "add".into(), name.into(), url.into()],
            Some(repo_path),
            self.config.default_timeout,
        )
        .await?;
        Ok(())
    }

    /// Point an existing remote at a new URL
    pub async fn set_remote_url(&self, name: &str, url: &str, repo_path: &Path) -> Result<()> {
        self.ensure_repository(repo_path).await?;
        info!("Setting remote {} -> {}", name, url);
        self.git(
            vec!["remote".into(), "set-url".into(), name.into(), url.into()],
            Some(repo_path),
            self.config.default_timeout,
        )
        .await?;
        Ok(())
    }

    /// Push `refspec` (a ref, or a flag such as `--all`/`--tags`) to `remote`
    pub async fn push(
        &self,
        remote: &str,
        refspec: &str,
        repo_path: &Path,
        force: bool,
    ) -> Result<()> {
        self.ensure_repository(repo_path).await?;

        let mut args = vec!["push".to_string()];
        if force {
            args.push("--force".into());
        }
        args.push(remote.into());
        args.push(refspec.into());

        info!("Pushing {} to {} from {:?}", refspec, remote, repo_path);
        self.git(args, Some(repo_path), self.push_timeout()).await?;
        Ok(())
    }

    /// Short status of the working tree
    pub async fn status(&self, repo_path: &Path) -> Result<String> {
        let output = self
            .git(
                vec!["status".into(), "--porcelain".into()],
                Some(repo_path),
                self.config.default_timeout,
            )
            .await?;

        if output.trim().is_empty() {
            Ok(WORKING_TREE_CLEAN.to_string())
        } else {
            Ok(output)
        }
    }
}

/// Accepts `https://`, `git://`, `ssh://` and SCP-style `user@host:path`
fn is_supported_url(url: &str) -> bool {
    const SCHEMES: [&str; 3] = ["https://", "git://", "ssh://"];
    if SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        return true;
    }
    if url.contains("://") {
        return false;
    }

    match url.split_once('@') {
        Some((_, rest)) => matches!(rest.split_once(':'), Some((host, _)) if !host.is_empty()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records invocations and answers each with a canned result
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<CommandInvocation>>,
        fail_with: Option<fn() -> ProcessError>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn execute(
            &self,
            invocation: CommandInvocation,
        ) -> std::result::Result<String, ProcessError> {
            self.calls.lock().unwrap().push(invocation);
            match self.fail_with {
                Some(make_err) => Err(make_err()),
                None => Ok(String::new()),
            }
        }
    }

    fn client_with(runner: Arc<RecordingRunner>, default_timeout: Duration) -> GitOperationsClient {
        GitOperationsClient::with_runner(runner, GitConfig { default_timeout })
    }

    async fn git_checked(dir: &Path, args: &[&str]) {
        ProcessExecutor::new()
            .execute(
                CommandInvocation::new("git", Duration::from_secs(30))
                    .args(args.iter().copied())
                    .current_dir(dir),
            )
            .await
            .unwrap();
    }

    async fn init_test_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        git_checked(dir.path(), &["init"]).await;
        git_checked(dir.path(), &["config", "user.email", "test@test.com"]).await;
        git_checked(dir.path(), &["config", "user.name", "Test"]).await;

        // Create initial commit and a tag
        tokio::fs::write(dir.path().join("test.txt"), "test").await.unwrap();
        git_checked(dir.path(), &["add", "."]).await;
        git_checked(dir.path(), &["commit", "-m", "Initial commit"]).await;
        git_checked(dir.path(), &["tag", "v1.0.0"]).await;

        dir
    }

    #[test]
    fn test_supported_urls() {
        assert!(is_supported_url("https://github.com/acme/widgets"));
        assert!(is_supported_url("git://example.com/repo.git"));
        assert!(is_supported_url("ssh://git@github.com/acme/widgets.git"));
        assert!(is_supported_url("git@github.com:acme/widgets.git"));

        assert!(!is_supported_url("http://github.com/acme/widgets"));
        assert!(!is_supported_url("file:///tmp/repo"));
        assert!(!is_supported_url("/tmp/repo"));
        assert!(!is_supported_url("git@:acme/widgets"));
        assert!(!is_supported_url("user@host"));
    }

    #[test]
    fn test_push_timeout_floor() {
        let runner = Arc::new(RecordingRunner::default());
        let client = client_with(runner.clone(), Duration::from_secs(10));
        assert_eq!(client.push_timeout(), Duration::from_secs(300));

        let client = client_with(runner, Duration::from_secs(900));
        assert_eq!(client.push_timeout(), Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_push_uses_floored_timeout_and_args() {
        let runner = Arc::new(RecordingRunner::default());
        let client = client_with(runner.clone(), Duration::from_secs(30));
        let dir = TempDir::new().unwrap();

        client.push("private", "--all", dir.path(), true).await.unwrap();

        let calls = runner.calls.lock().unwrap();
        // rev-parse check, then the push itself
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args, vec!["rev-parse", "--git-dir"]);
        assert_eq!(calls[0].timeout, Duration::from_secs(30));
        assert_eq!(calls[1].program, "git");
        assert_eq!(calls[1].args, vec!["push", "--force", "private", "--all"]);
        assert_eq!(calls[1].timeout, Duration::from_secs(300));
        assert_eq!(calls[1].working_dir.as_deref(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_clone_rejects_unsupported_url_without_spawning() {
        let runner = Arc::new(RecordingRunner::default());
        let client = client_with(runner.clone(), Duration::from_secs(30));
        let dir = TempDir::new().unwrap();

        let err = client
            .clone("/tmp/local/repo", &dir.path().join("dest"))
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::InvalidUrl(_)));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clone_creates_parent_directory() {
        let runner = Arc::new(RecordingRunner::default());
        let client = client_with(runner.clone(), Duration::from_secs(30));
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a").join("b").join("widgets");

        client
            .clone("https://github.com/acme/widgets", &dest)
            .await
            .unwrap();

        assert!(dir.path().join("a").join("b").is_dir());
        let calls = runner.calls.lock().unwrap();
        assert_eq!(
            calls[0].args,
            vec![
                "clone".to_string(),
                "https://github.com/acme/widgets".to_string(),
                dest.to_string_lossy().into_owned(),
            ]
        );
    }

    fn timeout_error() -> ProcessError {
        ProcessError::Timeout(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_timeout_passes_through() {
        let runner = Arc::new(RecordingRunner {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(timeout_error),
        });
        let client = client_with(runner, Duration::from_secs(30));
        let dir = TempDir::new().unwrap();

        let err = client
            .clone("https://github.com/acme/widgets", &dir.path().join("w"))
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_is_valid_repository() {
        let client = GitOperationsClient::default();
        let repo = init_test_repo().await;
        assert!(client.is_valid_repository(repo.path()).await);

        let non_git = TempDir::new().unwrap();
        assert!(!client.is_valid_repository(non_git.path()).await);
        assert!(!client.is_valid_repository(&non_git.path().join("missing")).await);
    }

    #[tokio::test]
    async fn test_status_clean_and_dirty() {
        let client = GitOperationsClient::default();
        let repo = init_test_repo().await;

        assert_eq!(client.status(repo.path()).await.unwrap(), WORKING_TREE_CLEAN);

        tokio::fs::write(repo.path().join("new_file.txt"), "new").await.unwrap();
        let status = client.status(repo.path()).await.unwrap();
        assert!(status.contains("?? new_file.txt"));
    }

    #[tokio::test]
    async fn test_add_remote_requires_repository() {
        let client = GitOperationsClient::default();
        let non_git = TempDir::new().unwrap();

        let err = client
            .add_remote("private", "https://github.com/acme/x.git", non_git.path())
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::InvalidRepository { .. }));
    }

    #[tokio::test]
    async fn test_add_remote_twice_already_exists() {
        let client = GitOperationsClient::default();
        let repo = init_test_repo().await;

        client
            .add_remote("private", "https://github.com/acme/x.git", repo.path())
            .await
            .unwrap();
        let err = client
            .add_remote("private", "https://github.com/acme/y.git", repo.path())
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::RemoteAlreadyExists(_)));

        client
            .set_remote_url("private", "https://github.com/acme/y.git", repo.path())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_push_all_and_tags_to_bare_remote() {
        let client = GitOperationsClient::default();
        let repo = init_test_repo().await;
        let bare = TempDir::new().unwrap();
        git_checked(bare.path(), &["init", "--bare"]).await;

        client
            .add_remote("private", &bare.path().to_string_lossy(), repo.path())
            .await
            .unwrap();
        client.push("private", "--all", repo.path(), false).await.unwrap();
        client.push("private", "--tags", repo.path(), false).await.unwrap();

        let tags = ProcessExecutor::new()
            .execute(
                CommandInvocation::new("git", Duration::from_secs(30))
                    .args(["tag", "--list"])
                    .current_dir(bare.path()),
            )
            .await
            .unwrap();
        assert_eq!(tags, "v1.0.0");
    }

    #[tokio::test]
    async fn test_push_to_missing_remote_fails() {
        let client = GitOperationsClient::default();
        let repo = init_test_repo().await;

        let err = client
            .push("nowhere", "--all", repo.path(), false)
            .await
            .unwrap_err();
        // "fatal: 'nowhere' does not appear to be a git repository"
        assert!(matches!(
            err,
            GitError::CommandExecutionFailed(_) | GitError::RepositoryNotFound(_)
        ));
    }
}
