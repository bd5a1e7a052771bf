//! Jobs: one queued, executed and terminally resolved engine invocation.
//!
//! - [`executor`]: single-worker FIFO queue around an [`Engine`](crate::engine::Engine)
//! - [`reporter`]: progress and completion delivery to the caller

pub mod executor;
pub mod reporter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use executor::{JobExecutor, JobHandle};
pub use reporter::{CompletionSink, JobEvent, ProgressSink, ProgressUpdate, PROGRESS_EVENT};

use crate::error::EditError;
use crate::pipeline::PipelineDescriptor;

/// Completion code for a job submitted after the worker stopped.
pub const EXECUTOR_SHUTDOWN: &str = "EXECUTOR_SHUTDOWN";
/// Completion code for a job whose sink was dropped before a delivery.
pub const JOB_ABANDONED: &str = "JOB_ABANDONED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for the worker
    #[default]
    Queued,
    /// Engine invocation in progress
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of a job. There is no partial success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Success { message: String },
    Failure { code: String, message: String },
}

impl JobOutcome {
    pub fn success<S: Into<String>>(message: S) -> Self {
        JobOutcome::Success { message: message.into() }
    }

    pub fn failure<C: Into<String>, S: Into<String>>(code: C, message: S) -> Self {
        JobOutcome::Failure { code: code.into(), message: message.into() }
    }

    pub fn from_error(err: &EditError) -> Self {
        Self::failure(err.code(), err.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            JobOutcome::Success { message } | JobOutcome::Failure { message, .. } => message,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            JobOutcome::Success { .. } => None,
            JobOutcome::Failure { code, .. } => Some(code),
        }
    }

    pub fn state(&self) -> JobState {
        if self.is_success() {
            JobState::Succeeded
        } else {
            JobState::Failed
        }
    }
}

/// What to run and how to describe it.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub descriptor: PipelineDescriptor,
    /// Operation name used in logs and failure messages
    pub description: String,
    /// Message delivered on success
    pub success_message: String,
}

impl JobRequest {
    pub fn new<D: Into<String>, M: Into<String>>(
        descriptor: PipelineDescriptor,
        description: D,
        success_message: M,
    ) -> Self {
        Self {
            descriptor,
            description: description.into(),
            success_message: success_message.into(),
        }
    }
}

/// A submitted unit of work. Immutable apart from its lifecycle, which is
/// tracked by the executor.
pub struct Job {
    pub id: JobId,
    pub request: JobRequest,
    pub submitted_at: DateTime<Utc>,
    pub(crate) completion: CompletionSink,
    pub(crate) progress: ProgressSink,
}

/// Point-in-time view of a job's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub description: String,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<JobOutcome>,
}
