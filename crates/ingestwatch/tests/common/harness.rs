//! Test harness driving a `JobController` over an in-memory stream.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ingestwatch::{
    ApiError, FileSelection, IngestApi, JobController, JobHandle, MemoryConnector,
    ProcessingSettings, StartResponse, StreamSink,
};

/// A call made to the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Start(Vec<String>),
    Cancel(String),
    Reset,
}

#[derive(Debug, Default)]
struct FakeApiState {
    calls: Vec<ApiCall>,
    started: usize,
    conflict: bool,
    fail_cancel: bool,
}

/// Records calls and answers like a healthy server unless told otherwise.
#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<FakeApiState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every start with 409 until `reset` is called.
    pub fn busy(&self) {
        self.state.lock().unwrap().conflict = true;
    }

    pub fn fail_cancel(&self) {
        self.state.lock().unwrap().fail_cancel = true;
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn cancel_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ApiCall::Cancel(_)))
            .count()
    }
}

#[async_trait]
impl IngestApi for FakeApi {
    async fn start(
        &self,
        selection: &FileSelection,
        _settings: &ProcessingSettings,
    ) -> Result<StartResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::Start(selection.files.clone()));
        if state.conflict {
            return Err(ApiError::Conflict("job already running".to_string()));
        }
        state.started += 1;
        Ok(StartResponse {
            job_id: format!("job-{}", state.started),
            total_files: selection.files.len(),
        })
    }

    async fn request_cancel(&self, job_id: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::Cancel(job_id.to_string()));
        if state.fail_cancel {
            return Err(ApiError::Request("connection refused".to_string()));
        }
        Ok(())
    }

    async fn reset(&self) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::Reset);
        state.conflict = false;
        Ok(())
    }
}

/// A controller wired to a fake server and an in-memory stream.
pub struct TestHarness {
    pub controller: JobController,
    pub api: Arc<FakeApi>,
    pub connector: MemoryConnector,
}

impl TestHarness {
    pub fn new() -> Self {
        let api = Arc::new(FakeApi::new());
        let connector = MemoryConnector::new();
        let controller = JobController::new(api.clone(), Arc::new(connector.clone()));
        Self {
            controller,
            api,
            connector,
        }
    }

    /// Starts a job over the given files with default settings.
    pub async fn start(&mut self, files: &[&str]) -> JobHandle {
        self.controller
            .start(
                &FileSelection::new(files.iter().copied()),
                &ProcessingSettings::default(),
            )
            .await
            .expect("start failed")
    }

    /// Sink of the most recently opened stream.
    pub fn sink(&self) -> StreamSink {
        self.connector.last_sink().expect("no stream opened")
    }

    /// Pushes payloads onto the current stream and applies them. Stops early
    /// when the job reaches a terminal state.
    pub async fn feed(&mut self, payloads: &[String]) {
        let sink = self.sink();
        for payload in payloads {
            sink.message(payload.as_str());
        }
        for _ in payloads {
            if !self.controller.pump().await {
                break;
            }
        }
    }

    pub async fn feed_one(&mut self, payload: String) {
        self.feed(&[payload]).await;
    }

    /// Text of every log entry, in order.
    pub fn log_lines(&self) -> Vec<String> {
        self.controller
            .log_entries()
            .iter()
            .map(|entry| entry.text().to_string())
            .collect()
    }
}
