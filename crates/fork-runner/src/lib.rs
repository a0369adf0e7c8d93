//! Fork Runner - the private fork workflow
//!
//! This crate sequences credential validation, repository creation, clone,
//! remote configuration and push into one workflow, and deletes the created
//! repository again when a later step fails.

mod error;
mod event;
mod orchestrator;
mod services;
mod source;

pub use error::{CleanupOutcome, ForkError, Result, WorkflowError};
pub use event::{ForkStep, StatusEvent, StatusKind};
pub use orchestrator::{ForkOrchestrator, ForkWorkflowState, PRIVATE_REMOTE};
pub use services::{GitHubService, GitService};
pub use source::SourceRepository;
