//! Owns the current job and drives it from the progress stream.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::debug_span;

use super::api::{FileSelection, HttpIngestApi, IngestApi, ProcessingSettings};
use super::notify::{JobNotification, NotificationBroadcaster};
use super::state::{
    CancelOutcome, Job, JobError, JobErrorKind, JobHandle, JobOutcome, JobSnapshot, JobStatus,
    JobSummary,
};
use crate::codec::{self, Envelope, ProgressEvent};
use crate::config::ClientConfig;
use crate::error::{ApiError, IngestError, ProtocolViolation, Result, TransportError};
use crate::log_model::{AccordionKey, LogEntry, LogModel, PageKey};
use crate::registry::{Applied, FileTask, FileTaskRegistry};
use crate::transport::{
    SseConnector, StreamConnector, StreamEnvelope, StreamHandle, StreamSignal, StreamSink,
    StreamTicket,
};

/// State machine for one processing run at a time.
///
/// All mutation goes through `&mut self`, so each inbound message is applied
/// completely before the next one is looked at. Connections push stamped
/// signals into an inbox owned by the controller; [`JobController::pump`]
/// takes them out one by one.
pub struct JobController {
    api: Arc<dyn IngestApi>,
    connector: Arc<dyn StreamConnector>,
    notifier: NotificationBroadcaster,
    inbox_tx: mpsc::UnboundedSender<StreamEnvelope>,
    inbox: mpsc::UnboundedReceiver<StreamEnvelope>,
    generation: u64,
    job: Option<Job>,
    stream: Option<StreamHandle>,
    registry: FileTaskRegistry,
    log: LogModel,
}

impl JobController {
    pub fn new(api: Arc<dyn IngestApi>, connector: Arc<dyn StreamConnector>) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        Self {
            api,
            connector,
            notifier: NotificationBroadcaster::default(),
            inbox_tx,
            inbox,
            generation: 0,
            job: None,
            stream: None,
            registry: FileTaskRegistry::new(),
            log: LogModel::new(),
        }
    }

    /// Builds a controller talking HTTP to the configured server.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api = HttpIngestApi::from_config(config)?;
        let connector = SseConnector::from_config(config)?;
        Ok(Self::new(Arc::new(api), Arc::new(connector))
            .with_notifier(NotificationBroadcaster::new(config.notifications.capacity)))
    }

    pub fn with_notifier(mut self, notifier: NotificationBroadcaster) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobNotification> {
        self.notifier.subscribe()
    }

    /// Starts a new job and opens its progress stream.
    ///
    /// Fails with [`IngestError::AlreadyRunning`] without touching any state
    /// while a job is live, or when the server reports another active job.
    pub async fn start(
        &mut self,
        selection: &FileSelection,
        settings: &ProcessingSettings,
    ) -> Result<JobHandle> {
        if self.status().is_live() {
            return Err(IngestError::AlreadyRunning);
        }

        let started = match self.api.start(selection, settings).await {
            Ok(started) => started,
            Err(ApiError::Conflict(body)) => {
                log::warn!("Server refused to start a job: {}", body);
                return Err(IngestError::AlreadyRunning);
            }
            Err(e) => return Err(e.into()),
        };

        self.close_stream();
        self.stream = None;
        self.generation += 1;
        self.registry.clear();
        self.log.clear();

        let generation = self.generation;
        let ticket = StreamTicket {
            job_id: started.job_id.clone(),
            generation,
        };
        let sink = StreamSink::new(generation, self.inbox_tx.clone());
        let mut job = Job::new(&started.job_id, generation, started.total_files);

        match self.connector.open(&ticket, sink).await {
            Ok(handle) => {
                log::info!(
                    "Started job {} (generation {}, {} files)",
                    job.job_id,
                    generation,
                    job.total_files
                );
                self.stream = Some(handle);
                self.job = Some(job);
                self.notify_progress();
                Ok(JobHandle {
                    job_id: started.job_id,
                    generation,
                })
            }
            Err(err) => {
                log::error!("Could not open progress stream for job {}: {}", job.job_id, err);
                job.finish(JobStatus::Failed);
                job.last_error = Some(JobError::new(JobErrorKind::Transport, err.to_string()));
                self.job = Some(job);
                self.notify_progress();
                self.notifier.send(JobNotification::Failed(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Asks the server to stop the running job.
    ///
    /// The job moves to `Cancelling` before the request goes out. The stream
    /// stays open; the terminal state comes from the stream.
    pub async fn request_cancel(&mut self) -> CancelOutcome {
        let job_id = match self.job.as_mut() {
            Some(job) if job.status == JobStatus::Running => {
                job.status = JobStatus::Cancelling;
                job.last_message = Some("Cancelling".to_string());
                job.job_id.clone()
            }
            Some(job) if job.status == JobStatus::Cancelling => {
                log::debug!("Cancel already requested for job {}", job.job_id);
                return CancelOutcome::AlreadyCancelling;
            }
            _ => return CancelOutcome::NotRunning,
        };

        log::info!("Requesting cancellation of job {}", job_id);
        self.notifier.send(JobNotification::CancelRequested);
        self.notify_progress();

        if let Err(e) = self.api.request_cancel(&job_id).await {
            log::warn!("Cancel request for job {} failed: {}", job_id, e);
        }
        CancelOutcome::Requested
    }

    /// Clears a stuck job on the server. Local state is left alone.
    pub async fn reset(&self) -> Result<()> {
        log::info!("Asking the server to reset its job state");
        self.api.reset().await?;
        Ok(())
    }

    /// Waits for the next inbound signal and applies it.
    ///
    /// Returns false once no live job remains. Safe to use as a
    /// `tokio::select!` branch: a pending call holds no partial state.
    pub async fn pump(&mut self) -> bool {
        if !self.status().is_live() {
            return false;
        }
        match self.inbox.recv().await {
            Some(envelope) => self.receive(envelope),
            // The controller holds a sender, so this is unreachable in practice.
            None => self.fail_transport(TransportError::ClosedEarly),
        }
        self.status().is_live()
    }

    /// Pumps until the job is terminal.
    pub async fn run_to_end(&mut self) -> Option<JobOutcome> {
        while self.pump().await {}
        self.outcome()
    }

    /// Applies one stamped signal from a connection.
    pub fn receive(&mut self, envelope: StreamEnvelope) {
        if envelope.generation != self.generation {
            log::debug!(
                "Discarding signal from stale stream (generation {}, current {})",
                envelope.generation,
                self.generation
            );
            return;
        }
        if !self.status().is_live() {
            log::debug!("Discarding signal, job is no longer live");
            return;
        }

        match envelope.signal {
            StreamSignal::Message(raw) => {
                if let Some(decoded) = codec::decode_or_warn(&raw) {
                    self.accept(decoded);
                }
            }
            StreamSignal::Error(err) => self.fail_transport(err),
            StreamSignal::Ended => self.fail_transport(TransportError::ClosedEarly),
        }
    }

    fn accept(&mut self, envelope: Envelope) {
        if let (Some(found), Some(job)) = (envelope.job_id.as_deref(), self.job.as_ref()) {
            if found != job.job_id {
                log::warn!(
                    "{}",
                    ProtocolViolation::ForeignJob {
                        expected: job.job_id.clone(),
                        found: found.to_string(),
                    }
                );
                return;
            }
        }
        self.dispatch(envelope.event);
    }

    /// Applies one decoded event to the job, its files and the log.
    pub fn dispatch(&mut self, event: ProgressEvent) {
        let _span = debug_span!("dispatch", kind = event.kind(), generation = self.generation)
            .entered();

        match self.status() {
            JobStatus::Idle => {
                log::warn!("Dropping '{}' event, no job has been started", event.kind());
                return;
            }
            status if status.is_terminal() => {
                log::debug!("{}", ProtocolViolation::AfterTerminal(event.kind()));
                return;
            }
            _ => {}
        }

        let applied = self.registry.apply(&event);
        let mut terminal = None;

        match event {
            ProgressEvent::Start { total_files } => {
                if let Some(job) = self.job.as_mut() {
                    job.total_files = total_files;
                }
                self.log
                    .append_line(format!("Processing {} file(s)", total_files));
            }
            ProgressEvent::FileStart {
                file_name,
                index,
                total,
                ..
            } => {
                self.log.append_line(format!(
                    "[{}/{}] {}",
                    index.saturating_add(1),
                    total,
                    file_name
                ));
            }
            ProgressEvent::StageProgress {
                file_name, step, ..
            } => {
                if let Applied::StageChanged { to, .. } = applied {
                    self.log
                        .append_line(format!("{}: {} - {}", file_name, to, step));
                }
            }
            ProgressEvent::FileProgress {
                file_name,
                page_id,
                is_in_place_update,
                step,
                ..
            } => {
                let line = format!("{}: {}", file_name, step);
                match page_id {
                    Some(page_id) if is_in_place_update => {
                        self.log
                            .upsert_page_line(PageKey::new(&file_name, &page_id), line);
                    }
                    _ => {
                        self.log.append_line(line);
                    }
                }
            }
            ProgressEvent::AccordionHeading {
                file_name,
                part,
                title,
                heading,
            } => {
                let key = AccordionKey::new(&file_name, part.as_deref(), &title);
                self.log.ensure_accordion(key, heading.unwrap_or(title));
            }
            ProgressEvent::AccordionBody {
                file_name,
                part,
                title,
                content,
            } => {
                let key = AccordionKey::new(&file_name, part.as_deref(), &title);
                if let Err(violation) = self.log.set_body(&key, &content) {
                    log::warn!("Dropping accordion body: {}", violation);
                }
            }
            ProgressEvent::FileComplete {
                file_name,
                duration,
                ..
            } => {
                let line = match duration {
                    Some(secs) => format!("{}: done in {:.1}s", file_name, secs),
                    None => format!("{}: done", file_name),
                };
                self.log.append_line(line);
            }
            ProgressEvent::JobComplete {
                total_files,
                processing_time_seconds,
                results,
            } => {
                let summary = JobSummary {
                    total_files,
                    processing_time_seconds,
                    results,
                };
                self.log.append_line(format!(
                    "Finished {} file(s) in {:.1}s",
                    total_files, processing_time_seconds
                ));
                if let Some(job) = self.job.as_mut() {
                    job.total_files = total_files;
                    job.summary = Some(summary.clone());
                }
                self.finish(JobStatus::Completed, None);
                terminal = Some(JobNotification::Completed(summary));
            }
            ProgressEvent::Cancelling { message } => {
                // Feedback only, not part of the log history.
                self.set_last_message(message.unwrap_or_else(|| "Cancelling".to_string()));
            }
            ProgressEvent::Cancelled { message } => {
                self.log.append_line(format!("Cancelled: {}", message));
                self.set_last_message(message.clone());
                self.finish(JobStatus::Cancelled, None);
                terminal = Some(JobNotification::Cancelled(message));
            }
            ProgressEvent::Status { message } => {
                self.log.append_line(message.clone());
                self.set_last_message(message);
            }
            ProgressEvent::Waiting {
                message,
                elapsed_seconds,
            } => {
                self.log
                    .append_line(format!("{} ({:.0}s)", message, elapsed_seconds));
                self.set_last_message(message);
            }
            ProgressEvent::Error {
                message,
                file_name: Some(file_name),
            } => {
                self.log
                    .append_line(format!("{}: error: {}", file_name, message));
            }
            ProgressEvent::Error {
                message,
                file_name: None,
            } => {
                self.log.append_line(format!("Error: {}", message));
                let error = JobError::new(JobErrorKind::ServerReported, message.clone());
                self.finish(JobStatus::Failed, Some(error));
                terminal = Some(JobNotification::Failed(message));
            }
        }

        self.notify_progress();
        if let Some(notification) = terminal {
            self.notifier.send(notification);
        }
    }

    fn set_last_message(&mut self, message: String) {
        if let Some(job) = self.job.as_mut() {
            job.last_message = Some(message);
        }
    }

    fn finish(&mut self, status: JobStatus, error: Option<JobError>) {
        if let Some(job) = self.job.as_mut() {
            if job.finish(status) {
                if error.is_some() {
                    job.last_error = error;
                }
                log::info!("Job {} ended: {}", job.job_id, status);
            }
        }
        self.close_stream();
    }

    fn fail_transport(&mut self, err: TransportError) {
        log::error!("Progress stream failed: {}", err);
        let message = err.to_string();
        self.log.append_line(format!("Connection lost: {}", message));
        let error = JobError::new(JobErrorKind::Transport, message.clone());
        self.finish(JobStatus::Failed, Some(error));
        self.notify_progress();
        self.notifier.send(JobNotification::Failed(message));
    }

    fn close_stream(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            stream.close();
        }
    }

    fn notify_progress(&self) {
        if self.notifier.receiver_count() == 0 {
            return;
        }
        if let Some(snapshot) = self.snapshot() {
            self.notifier
                .send(JobNotification::ProgressChanged(Box::new(snapshot)));
        }
    }

    pub fn status(&self) -> JobStatus {
        self.job.as_ref().map_or(JobStatus::Idle, |job| job.status)
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn handle(&self) -> Option<JobHandle> {
        self.job.as_ref().map(|job| JobHandle {
            job_id: job.job_id.clone(),
            generation: job.generation,
        })
    }

    pub fn file_task(&self, file_name: &str) -> Option<&FileTask> {
        self.registry.get(file_name)
    }

    pub fn file_tasks(&self) -> &[FileTask] {
        self.registry.tasks()
    }

    pub fn log(&self) -> &LogModel {
        &self.log
    }

    pub fn log_entries(&self) -> &[LogEntry] {
        self.log.entries()
    }

    /// True when no connection is open for the current job.
    pub fn is_stream_closed(&self) -> bool {
        self.stream.as_ref().map_or(true, StreamHandle::is_closed)
    }

    pub fn snapshot(&self) -> Option<JobSnapshot> {
        self.job.as_ref().map(|job| JobSnapshot {
            job: job.clone(),
            files: self.registry.tasks().to_vec(),
            log_revision: self.log.revision(),
        })
    }

    /// How the current job ended, once it has.
    pub fn outcome(&self) -> Option<JobOutcome> {
        let job = self.job.as_ref()?;
        match job.status {
            JobStatus::Completed => Some(JobOutcome::Completed(
                job.summary.clone().unwrap_or_default(),
            )),
            JobStatus::Cancelled => Some(JobOutcome::Cancelled(
                job.last_message.clone().unwrap_or_default(),
            )),
            JobStatus::Failed => job.last_error.clone().map(JobOutcome::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Debug for JobController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobController")
            .field("generation", &self.generation)
            .field("status", &self.status())
            .field("files", &self.registry.len())
            .field("log_entries", &self.log.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::api::StartResponse;
    use crate::transport::MemoryConnector;
    use async_trait::async_trait;

    struct IdleApi;

    #[async_trait]
    impl IngestApi for IdleApi {
        async fn start(
            &self,
            _selection: &FileSelection,
            _settings: &ProcessingSettings,
        ) -> std::result::Result<StartResponse, ApiError> {
            Ok(StartResponse {
                job_id: "job-1".to_string(),
                total_files: 0,
            })
        }

        async fn request_cancel(&self, _job_id: &str) -> std::result::Result<(), ApiError> {
            Ok(())
        }

        async fn reset(&self) -> std::result::Result<(), ApiError> {
            Ok(())
        }
    }

    fn controller() -> JobController {
        JobController::new(Arc::new(IdleApi), Arc::new(MemoryConnector::new()))
    }

    #[test]
    fn test_new_controller_is_idle() {
        let controller = controller();
        assert_eq!(controller.status(), JobStatus::Idle);
        assert!(controller.job().is_none());
        assert!(controller.is_stream_closed());
        assert!(controller.snapshot().is_none());
        assert!(controller.outcome().is_none());
    }

    #[test]
    fn test_dispatch_without_job_is_dropped() {
        let mut controller = controller();
        controller.dispatch(ProgressEvent::Status {
            message: "hello".to_string(),
        });
        assert!(controller.log_entries().is_empty());
        assert!(controller.file_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_without_job() {
        let mut controller = controller();
        assert_eq!(controller.request_cancel().await, CancelOutcome::NotRunning);
    }

    #[tokio::test]
    async fn test_pump_without_job_returns_immediately() {
        let mut controller = controller();
        assert!(!controller.pump().await);
        assert!(controller.run_to_end().await.is_none());
    }

    #[tokio::test]
    async fn test_start_opens_stream() {
        let mut controller = controller();
        let handle = controller
            .start(&FileSelection::new(["a.pdf"]), &ProcessingSettings::default())
            .await
            .unwrap();
        assert_eq!(handle.job_id, "job-1");
        assert_eq!(handle.generation, 1);
        assert_eq!(controller.status(), JobStatus::Running);
        assert!(!controller.is_stream_closed());
        assert_eq!(controller.handle(), Some(handle));
    }
}
