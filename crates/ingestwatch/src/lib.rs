pub mod codec;
pub mod config;
pub mod error;
pub mod job;
pub mod log_model;
pub mod registry;
pub mod transport;

pub use codec::{decode, DecodeError, Envelope, PipelineStage, ProgressEvent, StepProgress};
pub use config::{load_config, load_config_from_str, ClientConfig};
pub use error::{ApiError, ConfigError, IngestError, ProtocolViolation, Result, TransportError};
pub use job::{
    CancelOutcome, FileSelection, HttpIngestApi, IngestApi, Job, JobController, JobError,
    JobErrorKind, JobHandle, JobNotification, JobOutcome, JobSnapshot, JobStatus, JobSummary,
    NotificationBroadcaster, ProcessingSettings, StartResponse,
};
pub use log_model::{AccordionKey, BodyWrite, LogContent, LogEntry, LogModel, NodeId, PageKey};
pub use registry::{Applied, FileStage, FileTask, FileTaskRegistry};
pub use transport::{
    Framing, MemoryConnector, SseConnector, StreamConnector, StreamEnvelope, StreamHandle,
    StreamSignal, StreamSink, StreamTicket,
};
