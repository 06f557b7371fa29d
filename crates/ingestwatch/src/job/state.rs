//! Job-level state and the read-only views handed to the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::FileTask;

/// Status of the processing run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running,
    Cancelling,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    /// Running or cancelling: a stream is being consumed.
    pub fn is_live(self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Cancelling)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "Idle"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Cancelling => write!(f, "Cancelling"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    /// The connection failed or ended early.
    Transport,
    /// The server sent a job-level `error` event.
    ServerReported,
}

/// Why a job failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl JobError {
    pub fn new(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Totals reported by the server when the job completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub total_files: usize,
    pub processing_time_seconds: f64,
    pub results: Vec<Value>,
}

/// One processing run, from `start()` to a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Id assigned by the server on start.
    pub job_id: String,
    /// Client-side stamp of the connection belonging to this job.
    pub generation: u64,
    pub status: JobStatus,
    /// Seeded from the start response (0 when the server omits it), then
    /// overwritten by the stream's `start` event.
    pub total_files: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<JobError>,
    /// Latest transient status text (status, waiting, cancelling).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<JobSummary>,
}

impl Job {
    pub fn new(job_id: &str, generation: u64, total_files: usize) -> Self {
        Self {
            job_id: job_id.to_string(),
            generation,
            status: JobStatus::Running,
            total_files,
            started_at: Utc::now(),
            finished_at: None,
            last_error: None,
            last_message: None,
            summary: None,
        }
    }

    /// Moves into a terminal state. Returns false if already terminal.
    pub fn finish(&mut self, status: JobStatus) -> bool {
        debug_assert!(status.is_terminal());
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
        true
    }

    /// Wall-clock time since start, up to the finish time once terminal.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }
}

/// Identifies the job a caller started; compare against [`Job::generation`]
/// to tell whether the controller has moved on to a newer job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub job_id: String,
    pub generation: u64,
}

/// Point-in-time copy of everything the UI renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job: Job,
    pub files: Vec<FileTask>,
    pub log_revision: u64,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(JobSummary),
    Cancelled(String),
    Failed(JobError),
}

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job moved to `Cancelling` and the server was asked to stop.
    Requested,
    /// A cancel was already requested; nothing was sent.
    AlreadyCancelling,
    /// No running job to cancel.
    NotRunning,
}
