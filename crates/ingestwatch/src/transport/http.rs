//! Progress stream over a long-lived HTTP response.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::Instrument;

use super::{FrameDecoder, Framing, StreamConnector, StreamHandle, StreamSink, StreamTicket};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// Opens `GET {progress_url}?job_id=...` and forwards each frame.
#[derive(Debug, Clone)]
pub struct SseConnector {
    client: Client,
    progress_url: String,
    framing: Framing,
}

impl SseConnector {
    pub fn new(client: Client, progress_url: impl Into<String>, framing: Framing) -> Self {
        Self {
            client,
            progress_url: progress_url.into(),
            framing,
        }
    }

    /// Builds a connector whose client only bounds connection setup; the
    /// response body may stay open for as long as the job runs.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.http.connect_timeout())
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self::new(
            client,
            config.server.progress_url(),
            config.server.framing,
        ))
    }
}

#[async_trait]
impl StreamConnector for SseConnector {
    async fn open(
        &self,
        ticket: &StreamTicket,
        sink: StreamSink,
    ) -> Result<StreamHandle, TransportError> {
        log::info!(
            "Opening progress stream for job {} at {}",
            ticket.job_id,
            self.progress_url
        );

        let response = self
            .client
            .get(&self.progress_url)
            .query(&[("job_id", ticket.job_id.as_str())])
            .header(ACCEPT, self.framing.accept())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let framing = self.framing;
        let reader = sink.clone();
        let span = tracing::info_span!(
            "transport.read",
            job_id = %ticket.job_id,
            generation = ticket.generation
        );
        let task = tokio::spawn(
            async move {
                let mut decoder = FrameDecoder::new(framing);
                let mut body = response.bytes_stream();
                while let Some(chunk) = body.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            tracing::warn!("Progress stream read failed: {}", e);
                            reader.error(TransportError::Stream(e.to_string()));
                            return;
                        }
                    };
                    for payload in decoder.push(&chunk) {
                        if !reader.message(payload) {
                            tracing::debug!("Progress stream consumer gone, stopping reader");
                            return;
                        }
                    }
                }
                if let Some(payload) = decoder.finish() {
                    reader.message(payload);
                }
                reader.end();
            }
            .instrument(span),
        );

        Ok(StreamHandle::new(&sink).with_task(task))
    }
}
