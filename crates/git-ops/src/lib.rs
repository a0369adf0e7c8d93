//! Git operations for private-fork
//!
//! This crate runs the system `git` binary through a timeout-enforcing
//! process executor and maps git's failures onto a small error taxonomy.

mod client;
mod error;
mod executor;

pub use client::{GitConfig, GitOperationsClient, MIN_PUSH_TIMEOUT, WORKING_TREE_CLEAN};
pub use error::{classify_stderr, GitError, ProcessError, Result};
pub use executor::{CommandInvocation, CommandRunner, ProcessExecutor, EXIT_COMMAND_NOT_FOUND};
