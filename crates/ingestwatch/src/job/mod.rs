//! Job lifecycle: start, cancel, stream consumption and notifications.

pub mod api;
pub mod controller;
pub mod notify;
pub mod state;

pub use api::{FileSelection, HttpIngestApi, IngestApi, ProcessingSettings, StartResponse};
pub use controller::JobController;
pub use notify::{JobNotification, NotificationBroadcaster};
pub use state::{
    CancelOutcome, Job, JobError, JobErrorKind, JobHandle, JobOutcome, JobSnapshot, JobStatus,
    JobSummary,
};
