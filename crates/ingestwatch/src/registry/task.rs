//! Per-file state machine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{PipelineStage, StepProgress};

/// Stage of a single file within the job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    Queued,
    Ocr,
    Llm,
    Embedding,
    Done,
    Error,
}

impl FileStage {
    /// Position on the forward-only ladder. `Error` sits off the ladder.
    pub(crate) fn rank(self) -> Option<u8> {
        match self {
            FileStage::Queued => Some(0),
            FileStage::Ocr => Some(1),
            FileStage::Llm => Some(2),
            FileStage::Embedding => Some(3),
            FileStage::Done => Some(4),
            FileStage::Error => None,
        }
    }

    /// Returns true once the file can no longer progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStage::Done | FileStage::Error)
    }
}

impl From<PipelineStage> for FileStage {
    fn from(stage: PipelineStage) -> Self {
        match stage {
            PipelineStage::Ocr => FileStage::Ocr,
            PipelineStage::Llm => FileStage::Llm,
            PipelineStage::Embedding => FileStage::Embedding,
        }
    }
}

impl std::fmt::Display for FileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStage::Queued => write!(f, "Queued"),
            FileStage::Ocr => write!(f, "OCR"),
            FileStage::Llm => write!(f, "LLM refinement"),
            FileStage::Embedding => write!(f, "Embedding"),
            FileStage::Done => write!(f, "Done"),
            FileStage::Error => write!(f, "Error"),
        }
    }
}

/// Progress of one file, reconstructed from the events that name it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileTask {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub index: Option<usize>,
    pub total: Option<usize>,
    pub stage: FileStage,
    /// Last human-readable status for this file.
    pub current_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_progress: Option<StepProgress>,
    /// Latest step text per page, overwritten in place.
    pub page_progress: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileTask {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_id: None,
            index: None,
            total: None,
            stage: FileStage::Queued,
            current_step: None,
            step_progress: None,
            page_progress: BTreeMap::new(),
            duration_seconds: None,
            result: None,
            error: None,
        }
    }

    /// Moves the stage forward. Never regresses and never leaves a terminal stage.
    /// Returns the previous stage when the stage changed.
    pub fn advance_to(&mut self, stage: FileStage) -> Option<FileStage> {
        if self.stage.is_terminal() {
            return None;
        }
        let advances = match (self.stage.rank(), stage.rank()) {
            (Some(current), Some(next)) => next > current,
            // Error is reachable from every non-terminal stage.
            (_, None) => true,
            (None, _) => false,
        };
        if !advances {
            return None;
        }
        let previous = self.stage;
        self.stage = stage;
        Some(previous)
    }

    /// Marks the file finished. Completion wins over any prior stage.
    pub fn complete(&mut self, result: Value, duration: Option<f64>) -> FileStage {
        let previous = self.stage;
        self.stage = FileStage::Done;
        self.result = Some(result);
        self.error = None;
        if duration.is_some() {
            self.duration_seconds = duration;
        }
        previous
    }

    /// Marks the file failed unless it already finished.
    pub fn fail(&mut self, message: &str) -> Option<FileStage> {
        let previous = self.advance_to(FileStage::Error)?;
        self.error = Some(message.to_string());
        Some(previous)
    }

    /// Returns the completion ratio of the current stage counter, if reported.
    pub fn step_ratio(&self) -> Option<f64> {
        self.step_progress
            .filter(|p| p.total > 0)
            .map(|p| f64::from(p.current.min(p.total)) / f64::from(p.total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_queued() {
        let task = FileTask::new("a.pdf");
        assert_eq!(task.stage, FileStage::Queued);
        assert!(task.page_progress.is_empty());
    }

    #[test]
    fn test_advance_never_regresses() {
        let mut task = FileTask::new("a.pdf");
        assert_eq!(task.advance_to(FileStage::Llm), Some(FileStage::Queued));
        assert_eq!(task.advance_to(FileStage::Ocr), None);
        assert_eq!(task.advance_to(FileStage::Llm), None);
        assert_eq!(task.stage, FileStage::Llm);
    }

    #[test]
    fn test_error_is_terminal() {
        let mut task = FileTask::new("a.pdf");
        task.advance_to(FileStage::Ocr);
        assert_eq!(task.fail("unreadable"), Some(FileStage::Ocr));
        assert_eq!(task.advance_to(FileStage::Embedding), None);
        assert_eq!(task.stage, FileStage::Error);
        assert_eq!(task.error.as_deref(), Some("unreadable"));
    }

    #[test]
    fn test_done_ignores_errors() {
        let mut task = FileTask::new("a.pdf");
        task.complete(Value::Null, Some(1.5));
        assert_eq!(task.fail("late"), None);
        assert_eq!(task.stage, FileStage::Done);
        assert_eq!(task.duration_seconds, Some(1.5));
    }

    #[test]
    fn test_completion_wins_over_error() {
        let mut task = FileTask::new("a.pdf");
        task.fail("transient");
        assert_eq!(task.complete(Value::Bool(true), None), FileStage::Error);
        assert_eq!(task.stage, FileStage::Done);
        assert!(task.error.is_none());
    }

    #[test]
    fn test_step_ratio() {
        let mut task = FileTask::new("a.pdf");
        assert_eq!(task.step_ratio(), None);
        task.step_progress = Some(StepProgress {
            current: 1,
            total: 4,
        });
        assert_eq!(task.step_ratio(), Some(0.25));
        task.step_progress = Some(StepProgress {
            current: 3,
            total: 0,
        });
        assert_eq!(task.step_ratio(), None);
    }
}
