//! Status events for the fork workflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Steps of the fork workflow, in execution order (the ordering follows it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForkStep {
    /// Parsing owner and name out of the source URL
    ParseUrl,
    /// Checking the clone destination
    ValidateLocalPath,
    /// Loading the stored token and checking it against GitHub
    ValidateCredentials,
    /// Creating the private repository
    CreateRepository,
    /// Cloning the source repository
    Clone,
    /// Adding the `private` remote
    AddRemote,
    /// Pushing every branch
    PushBranches,
    /// Pushing tags (failure is only a warning)
    PushTags,
    /// Deleting the created repository after a failure
    Cleanup,
    /// Workflow finished
    Completed,
}

impl ForkStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseUrl => "parse_url",
            Self::ValidateLocalPath => "validate_local_path",
            Self::ValidateCredentials => "validate_credentials",
            Self::CreateRepository => "create_repository",
            Self::Clone => "clone",
            Self::AddRemote => "add_remote",
            Self::PushBranches => "push_branches",
            Self::PushTags => "push_tags",
            Self::Cleanup => "cleanup",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ForkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Progress,
    /// Something failed but the workflow carries on
    Warning,
    /// Compensating action after a failure
    Cleanup,
}

/// One stage description emitted while a workflow runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Unique event ID
    pub id: Uuid,

    /// Workflow run this event belongs to
    pub run_id: Uuid,

    pub step: ForkStep,

    pub kind: StatusKind,

    /// Human-readable stage description
    pub message: String,

    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(run_id: Uuid, step: ForkStep, kind: StatusKind, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            step,
            kind,
            message,
            timestamp: Utc::now(),
        }
    }

    /// Create a progress event
    pub fn progress(run_id: Uuid, step: ForkStep, message: String) -> Self {
        Self::new(run_id, step, StatusKind::Progress, message)
    }

    /// Create a warning event
    pub fn warning(run_id: Uuid, step: ForkStep, message: String) -> Self {
        Self::new(run_id, step, StatusKind::Warning, message)
    }

    /// Create a cleanup event
    pub fn cleanup(run_id: Uuid, message: String) -> Self {
        Self::new(run_id, ForkStep::Cleanup, StatusKind::Cleanup, message)
    }
}
