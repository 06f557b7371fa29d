use std::path::PathBuf;
use thiserror::Error;

use crate::log_model::AccordionKey;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("An ingestion job is already running")]
    AlreadyRunning,

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failures of the request/response calls to the ingestion server.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Server rejected the request, another job is active: {0}")]
    Conflict(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Connection-level failures of the progress stream. Always terminal for the job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Progress stream returned HTTP status {0}")]
    HttpStatus(u16),

    #[error("Progress stream read failed: {0}")]
    Stream(String),

    #[error("Progress stream ended before the job finished")]
    ClosedEarly,
}

/// Inbound data that is well-formed but breaks the protocol's rules.
/// These are logged and dropped; they never reach the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("Body for '{}/{}/{}' arrived before its heading", .0.file, .0.part, .0.title)]
    BodyWithoutHeading(AccordionKey),

    #[error("Event for job '{found}' does not belong to current job '{expected}'")]
    ForeignJob { expected: String, found: String },

    #[error("Event '{0}' arrived after the job reached a terminal state")]
    AfterTerminal(&'static str),
}

impl ApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ApiError::InvalidResponse(err.to_string());
        }
        ApiError::Request(err.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_builder() {
            return TransportError::Connect(err.to_string());
        }
        if let Some(status) = err.status() {
            return TransportError::HttpStatus(status.as_u16());
        }
        TransportError::Stream(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_violation_message_names_key() {
        let key = AccordionKey::new("a.pdf", None, "used prompt");
        let err = ProtocolViolation::BodyWithoutHeading(key);
        assert_eq!(
            err.to_string(),
            "Body for 'a.pdf/all/used prompt' arrived before its heading"
        );
    }

    #[test]
    fn test_api_error_converts_into_ingest_error() {
        let err: IngestError = ApiError::Conflict("busy".to_string()).into();
        assert!(matches!(err, IngestError::Api(ApiError::Conflict(_))));
    }
}
