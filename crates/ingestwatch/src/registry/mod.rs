//! Registry of per-file state machines for the current job.

pub mod task;

use std::collections::HashMap;

pub use task::{FileStage, FileTask};

use crate::codec::ProgressEvent;

/// What applying an event did to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The event does not concern any file, or the file ignored it.
    Ignored,
    /// Task fields changed but the stage did not.
    Updated,
    /// The stage moved.
    StageChanged { from: FileStage, to: FileStage },
}

/// Owns every `FileTask` of the current job, in first-seen order.
///
/// Tasks are created lazily by the first event naming a file and are only
/// dropped by [`FileTaskRegistry::clear`] when a new job starts.
#[derive(Debug, Default)]
pub struct FileTaskRegistry {
    tasks: Vec<FileTask>,
    by_name: HashMap<String, usize>,
}

impl FileTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the task for `file_name`, creating a queued one if unseen.
    pub fn get_or_create(&mut self, file_name: &str) -> &mut FileTask {
        let idx = match self.by_name.get(file_name) {
            Some(&idx) => idx,
            None => {
                log::debug!("Tracking new file '{}'", file_name);
                self.tasks.push(FileTask::new(file_name));
                let idx = self.tasks.len() - 1;
                self.by_name.insert(file_name.to_string(), idx);
                idx
            }
        };
        &mut self.tasks[idx]
    }

    pub fn get(&self, file_name: &str) -> Option<&FileTask> {
        self.by_name.get(file_name).map(|&idx| &self.tasks[idx])
    }

    pub fn tasks(&self) -> &[FileTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of files in the given stage.
    pub fn count_in(&self, stage: FileStage) -> usize {
        self.tasks.iter().filter(|t| t.stage == stage).count()
    }

    /// Drops all tasks. Only called on job teardown.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.by_name.clear();
    }

    /// Applies a file-scoped event to its task.
    pub fn apply(&mut self, event: &ProgressEvent) -> Applied {
        match event {
            ProgressEvent::FileStart {
                file_name,
                file_id,
                index,
                total,
            } => {
                let task = self.get_or_create(file_name);
                if file_id.is_some() {
                    task.file_id = file_id.clone();
                }
                task.index = Some(*index);
                task.total = Some(*total);
                Applied::Updated
            }
            ProgressEvent::StageProgress {
                file_name,
                stage,
                step,
                step_progress,
            } => {
                let task = self.get_or_create(file_name);
                if task.stage.is_terminal() {
                    log::debug!(
                        "Ignoring {} progress for finished file '{}'",
                        stage,
                        file_name
                    );
                    return Applied::Ignored;
                }
                task.current_step = Some(step.clone());
                task.step_progress = *step_progress;
                let to = FileStage::from(*stage);
                match task.advance_to(to) {
                    Some(from) => Applied::StageChanged { from, to },
                    None => Applied::Updated,
                }
            }
            ProgressEvent::FileProgress {
                file_name,
                page_id,
                is_in_place_update,
                step,
                duration,
            } => {
                let task = self.get_or_create(file_name);
                task.current_step = Some(step.clone());
                if duration.is_some() {
                    task.duration_seconds = *duration;
                }
                if let (true, Some(page_id)) = (*is_in_place_update, page_id) {
                    task.page_progress.insert(page_id.clone(), step.clone());
                }
                Applied::Updated
            }
            ProgressEvent::AccordionHeading { file_name, .. }
            | ProgressEvent::AccordionBody { file_name, .. } => {
                // Accordion content lives in the log model; only register the file.
                self.get_or_create(file_name);
                Applied::Ignored
            }
            ProgressEvent::FileComplete {
                file_name,
                index,
                total,
                result,
                duration,
            } => {
                let task = self.get_or_create(file_name);
                task.index = Some(*index);
                task.total = Some(*total);
                let from = task.complete(result.clone(), *duration);
                if from == FileStage::Done {
                    Applied::Updated
                } else {
                    Applied::StageChanged {
                        from,
                        to: FileStage::Done,
                    }
                }
            }
            ProgressEvent::Error {
                message,
                file_name: Some(file_name),
            } => {
                let task = self.get_or_create(file_name);
                match task.fail(message) {
                    Some(from) => Applied::StageChanged {
                        from,
                        to: FileStage::Error,
                    },
                    None => {
                        log::debug!("Ignoring error for finished file '{}'", file_name);
                        Applied::Ignored
                    }
                }
            }
            _ => Applied::Ignored,
        }
    }
}
