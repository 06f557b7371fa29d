//! In-process connector. The embedding application (or a test) feeds the
//! stream by hand through the sinks this connector hands out.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{StreamConnector, StreamHandle, StreamSink, StreamTicket};
use crate::error::TransportError;

#[derive(Debug, Default)]
struct MemoryState {
    opened: Vec<(StreamTicket, StreamSink)>,
    fail_next: Option<TransportError>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory connector lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Makes the next `open` fail with `err`.
    pub fn fail_next_open(&self, err: TransportError) {
        self.lock().fail_next = Some(err);
    }

    /// Sink of the most recently opened connection.
    pub fn last_sink(&self) -> Option<StreamSink> {
        self.lock().opened.last().map(|(_, sink)| sink.clone())
    }

    /// Tickets of every connection opened so far, oldest first.
    pub fn tickets(&self) -> Vec<StreamTicket> {
        self.lock()
            .opened
            .iter()
            .map(|(ticket, _)| ticket.clone())
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.lock().opened.len()
    }
}

#[async_trait]
impl StreamConnector for MemoryConnector {
    async fn open(
        &self,
        ticket: &StreamTicket,
        sink: StreamSink,
    ) -> Result<StreamHandle, TransportError> {
        let mut state = self.lock();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        let handle = StreamHandle::new(&sink);
        state.opened.push((ticket.clone(), sink));
        Ok(handle)
    }
}
