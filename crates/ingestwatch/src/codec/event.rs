//! Typed progress events as delivered by the ingestion server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pipeline stage a file can be reported in by a `stage_progress` event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Ocr,
    Llm,
    Embedding,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Ocr => write!(f, "OCR"),
            PipelineStage::Llm => write!(f, "LLM refinement"),
            PipelineStage::Embedding => write!(f, "Embedding"),
        }
    }
}

/// Sub-step counter attached to stage events (e.g. page 3 of 10).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepProgress {
    pub current: u32,
    pub total: u32,
}

/// One decoded message of the progress stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Start {
        #[serde(alias = "totalFiles")]
        total_files: usize,
    },
    FileStart {
        #[serde(alias = "fileName")]
        file_name: String,
        #[serde(default, alias = "fileId", skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        index: usize,
        total: usize,
    },
    StageProgress {
        #[serde(alias = "fileName")]
        file_name: String,
        stage: PipelineStage,
        step: String,
        #[serde(default, alias = "stepProgress", skip_serializing_if = "Option::is_none")]
        step_progress: Option<StepProgress>,
    },
    FileProgress {
        #[serde(alias = "fileName")]
        file_name: String,
        #[serde(default, alias = "pageId", skip_serializing_if = "Option::is_none")]
        page_id: Option<String>,
        #[serde(default, alias = "isInPlaceUpdate")]
        is_in_place_update: bool,
        step: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
    },
    AccordionHeading {
        #[serde(alias = "fileName")]
        file_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        part: Option<String>,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        heading: Option<String>,
    },
    AccordionBody {
        #[serde(alias = "fileName")]
        file_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        part: Option<String>,
        title: String,
        content: String,
    },
    FileComplete {
        #[serde(alias = "fileName")]
        file_name: String,
        index: usize,
        total: usize,
        #[serde(default)]
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
    },
    JobComplete {
        #[serde(alias = "totalFiles")]
        total_files: usize,
        #[serde(alias = "processingTimeSeconds")]
        processing_time_seconds: f64,
        #[serde(default)]
        results: Vec<Value>,
    },
    Cancelling {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Cancelled {
        message: String,
    },
    Status {
        message: String,
    },
    Waiting {
        message: String,
        #[serde(alias = "elapsedSeconds")]
        elapsed_seconds: f64,
    },
    Error {
        message: String,
        #[serde(default, alias = "fileName", skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
}

impl ProgressEvent {
    /// Wire tags of every known event type.
    pub const KINDS: &'static [&'static str] = &[
        "start",
        "file_start",
        "stage_progress",
        "file_progress",
        "accordion_heading",
        "accordion_body",
        "file_complete",
        "job_complete",
        "cancelling",
        "cancelled",
        "status",
        "waiting",
        "error",
    ];

    /// Returns the wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Start { .. } => "start",
            ProgressEvent::FileStart { .. } => "file_start",
            ProgressEvent::StageProgress { .. } => "stage_progress",
            ProgressEvent::FileProgress { .. } => "file_progress",
            ProgressEvent::AccordionHeading { .. } => "accordion_heading",
            ProgressEvent::AccordionBody { .. } => "accordion_body",
            ProgressEvent::FileComplete { .. } => "file_complete",
            ProgressEvent::JobComplete { .. } => "job_complete",
            ProgressEvent::Cancelling { .. } => "cancelling",
            ProgressEvent::Cancelled { .. } => "cancelled",
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::Waiting { .. } => "waiting",
            ProgressEvent::Error { .. } => "error",
        }
    }

    /// Returns the file this event is scoped to, if any.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            ProgressEvent::FileStart { file_name, .. }
            | ProgressEvent::StageProgress { file_name, .. }
            | ProgressEvent::FileProgress { file_name, .. }
            | ProgressEvent::AccordionHeading { file_name, .. }
            | ProgressEvent::AccordionBody { file_name, .. }
            | ProgressEvent::FileComplete { file_name, .. } => Some(file_name),
            ProgressEvent::Error { file_name, .. } => file_name.as_deref(),
            _ => None,
        }
    }

    /// Returns true for events that end the job.
    pub fn is_terminal(&self) -> bool {
        match self {
            ProgressEvent::JobComplete { .. } | ProgressEvent::Cancelled { .. } => true,
            ProgressEvent::Error { file_name, .. } => file_name.is_none(),
            _ => false,
        }
    }
}

/// A decoded event together with the job id the server stamped on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub job_id: Option<String>,
    pub event: ProgressEvent,
}
