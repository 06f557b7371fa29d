//! Plain-text rendering of the job log and the final outcome.

use std::collections::HashSet;
use std::process::ExitCode;

use ingestwatch::{JobController, JobOutcome, LogContent, LogEntry, LogModel, NodeId};

/// Prints log entries as they appear, reading the model by revision.
#[derive(Debug, Default)]
pub struct LogPrinter {
    seen: u64,
    headings: HashSet<NodeId>,
}

impl LogPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints everything that changed since the last call.
    pub fn print_new(&mut self, log: &LogModel) {
        for (_, entry) in log.entries_since(self.seen) {
            for line in self.format_entry(entry) {
                println!("{}", line);
            }
        }
        self.seen = log.revision();
    }

    fn format_entry(&mut self, entry: &LogEntry) -> Vec<String> {
        match &entry.content {
            LogContent::Line { text } => vec![text.clone()],
            LogContent::PageLine { text, .. } => vec![format!("  {}", text)],
            LogContent::Accordion {
                id, heading, body, ..
            } => {
                let mut lines = Vec::new();
                if self.headings.insert(*id) {
                    lines.push(format!("> {}", heading));
                }
                if let Some(body) = body {
                    lines.extend(body.lines().map(|l| format!("    {}", l)));
                }
                lines
            }
        }
    }
}

/// Prints how the job ended and maps it to the process exit code.
pub fn report(controller: &JobController) -> ExitCode {
    match controller.outcome() {
        Some(JobOutcome::Completed(summary)) => {
            println!(
                "Completed {} file(s) in {:.1}s",
                summary.total_files, summary.processing_time_seconds
            );
            ExitCode::SUCCESS
        }
        Some(JobOutcome::Cancelled(message)) => {
            println!("Cancelled: {}", message);
            ExitCode::from(2)
        }
        Some(JobOutcome::Failed(error)) => {
            eprintln!("Failed: {}", error.message);
            ExitCode::from(1)
        }
        None => {
            eprintln!("Job did not finish");
            ExitCode::from(1)
        }
    }
}
