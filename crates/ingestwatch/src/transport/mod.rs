//! Push-connection plumbing for the progress stream.
//!
//! A connector opens one connection per job and forwards what it reads as
//! [`StreamSignal`]s through a [`StreamSink`]. Every signal is stamped with the
//! generation of the job that opened the connection so the consumer can drop
//! output of connections it has already abandoned.

pub mod framing;
pub mod http;
pub mod memory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TransportError;

pub use framing::{FrameDecoder, Framing};
pub use http::SseConnector;
pub use memory::MemoryConnector;

/// What a connection can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    /// One complete text payload.
    Message(String),
    /// The connection failed.
    Error(TransportError),
    /// The server closed the connection.
    Ended,
}

/// A signal stamped with the generation of the connection that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEnvelope {
    pub generation: u64,
    pub signal: StreamSignal,
}

/// Identifies the job a connection is opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTicket {
    pub job_id: String,
    pub generation: u64,
}

/// Write side handed to a connection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StreamSink {
    generation: u64,
    tx: mpsc::UnboundedSender<StreamEnvelope>,
    closed: Arc<AtomicBool>,
}

impl StreamSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<StreamEnvelope>) -> Self {
        Self {
            generation,
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true once the consumer closed this connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn send(&self, signal: StreamSignal) -> bool {
        if self.is_closed() {
            return false;
        }
        self.tx
            .send(StreamEnvelope {
                generation: self.generation,
                signal,
            })
            .is_ok()
    }

    /// Forwards a payload. Returns false when nobody is listening anymore.
    pub fn message(&self, raw: impl Into<String>) -> bool {
        self.send(StreamSignal::Message(raw.into()))
    }

    pub fn error(&self, err: TransportError) -> bool {
        self.send(StreamSignal::Error(err))
    }

    pub fn end(&self) -> bool {
        self.send(StreamSignal::Ended)
    }
}

/// Consumer-side handle of an open connection. Closing is idempotent and also
/// happens on drop.
#[derive(Debug)]
pub struct StreamHandle {
    generation: u64,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Creates a handle sharing the close flag of `sink`.
    pub fn new(sink: &StreamSink) -> Self {
        Self {
            generation: sink.generation,
            closed: Arc::clone(&sink.closed),
            task: None,
        }
    }

    /// Attaches the reader task, which is aborted on close.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn close(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            log::debug!("Closing progress stream (generation {})", self.generation);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens progress stream connections.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn open(
        &self,
        ticket: &StreamTicket,
        sink: StreamSink,
    ) -> Result<StreamHandle, TransportError>;
}
