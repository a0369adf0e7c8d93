//! Subcommand implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;

use fork_runner::{CleanupOutcome, ForkOrchestrator, StatusEvent, StatusKind};
use git_ops::{GitConfig, GitOperationsClient};
use github_client::{GitHubClient, GitHubConfig};
use pf_core::{CredentialStore, FileCredentialStore, ForkConfig};

fn credential_store(config: &ForkConfig) -> Arc<FileCredentialStore> {
    Arc::new(FileCredentialStore::new(config.credentials_path()))
}

fn github_client(config: &ForkConfig, credentials: Arc<dyn CredentialStore>) -> GitHubClient {
    let mut github = GitHubConfig::default().with_api_url(&config.github_api_url);
    if let Some(client_id) = &config.github_client_id {
        github = github.with_client_id(client_id);
    }
    GitHubClient::new(github, credentials)
}

pub async fn login(config: &ForkConfig) -> Result<()> {
    if config.github_client_id.is_none() {
        bail!("PF_GITHUB_CLIENT_ID must be set to the OAuth App client ID");
    }

    let client = github_client(config, credential_store(config));
    let flow = client.authenticate_with_device_flow(|session| {
        println!(
            "Open {} and enter the code {}",
            session.verification_uri, session.user_code
        );
        println!(
            "Waiting for authorization (expires at {})...",
            session.expires_at.format("%H:%M:%S UTC")
        );
    });

    tokio::select! {
        result = flow => {
            result.context("GitHub login failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            bail!("Login cancelled");
        }
    }

    let user = client
        .get_current_user()
        .await
        .context("Token was stored but GitHub rejected it")?;
    println!("Logged in as {}", user.login);
    Ok(())
}

pub async fn logout(config: &ForkConfig) -> Result<()> {
    let client = github_client(config, credential_store(config));
    client.logout().await.context("Failed to remove stored token")?;
    println!("Logged out");
    Ok(())
}

pub async fn whoami(config: &ForkConfig) -> Result<()> {
    let client = github_client(config, credential_store(config));
    let user = client.get_current_user().await?;
    match user.name {
        Some(name) => println!("{} ({})", user.login, name),
        None => println!("{}", user.login),
    }
    Ok(())
}

pub async fn fork(config: &ForkConfig, repository_url: &str, local_path: &Path) -> Result<()> {
    let credentials = credential_store(config);
    let github = github_client(config, credentials.clone());
    let git = GitOperationsClient::new(GitConfig {
        default_timeout: config.git_timeout,
    });
    let orchestrator = ForkOrchestrator::new(Arc::new(git), Arc::new(github), credentials);

    let (tx, mut rx) = mpsc::unbounded_channel::<StatusEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.kind {
                StatusKind::Warning => eprintln!("{}", event.message),
                StatusKind::Progress | StatusKind::Cleanup => println!("{}", event.message),
            }
        }
    });

    let result = orchestrator
        .create_private_fork(repository_url, local_path, tx)
        .await;
    // The sender is gone once the workflow returns, so the printer drains and exits
    let _ = printer.await;

    match result {
        Ok(message) => {
            println!("{}", message);
            Ok(())
        }
        Err(err) => {
            if let Some(CleanupOutcome::Failed { name, .. }) = &err.cleanup {
                eprintln!(
                    "Repository {} is left on GitHub; delete it before retrying",
                    name
                );
            }
            Err(anyhow::Error::new(err).context(format!("Private fork of {} failed", repository_url)))
        }
    }
}
