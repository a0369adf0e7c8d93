//! private-fork - turn a public GitHub repository into a private copy
//!
//! ```text
//! private-fork login
//! private-fork whoami
//! private-fork fork <repository-url> <local-path>
//! private-fork logout
//! ```
//!
//! Configuration comes from `PF_DATA_DIR`, `PF_GITHUB_CLIENT_ID`,
//! `PF_GITHUB_API_URL` and `PF_GIT_TIMEOUT_SECS`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pf_core::ForkConfig;

#[derive(Parser, Debug)]
#[command(
    name = "private-fork",
    version,
    about = "Create a private copy of a GitHub repository",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authorize with GitHub through the device flow.
    Login,

    /// Forget the stored GitHub token.
    Logout,

    /// Show the GitHub account the stored token belongs to.
    Whoami,

    /// Create a private repository, clone the source and push everything to it.
    Fork {
        /// Repository to copy, e.g. https://github.com/acme/widgets
        repository_url: String,

        /// Where to clone the source; the parent directory must exist
        local_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "private_fork=info,fork_runner=info,git_ops=info,github_client=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ForkConfig::from_env();
    tracing::debug!("Using data directory: {:?}", config.data_dir);

    match cli.command {
        Commands::Login => commands::login(&config).await,
        Commands::Logout => commands::logout(&config).await,
        Commands::Whoami => commands::whoami(&config).await,
        Commands::Fork {
            repository_url,
            local_path,
        } => commands::fork(&config, &repository_url, &local_path).await,
    }
}
