use serde_json::Value;
use thiserror::Error;

use super::event::{Envelope, ProgressEvent};

/// Why a single stream message could not be turned into an event.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Message is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Message has no 'type' tag")]
    MissingType,

    #[error("Unknown event type '{0}'")]
    UnknownType(String),

    #[error("Invalid '{kind}' event: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes one raw stream payload.
pub fn decode(raw: &str) -> Result<Envelope, DecodeError> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(DecodeError::InvalidJson)?;

    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    if !ProgressEvent::KINDS.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownType(kind));
    }

    let job_id = object
        .get("job_id")
        .or_else(|| object.get("jobId"))
        .and_then(job_id_to_string);

    let event = serde_json::from_value(value)
        .map_err(|source| DecodeError::InvalidPayload { kind, source })?;

    Ok(Envelope { job_id, event })
}

/// Decodes a payload, logging and discarding it on failure.
pub fn decode_or_warn(raw: &str) -> Option<Envelope> {
    match decode(raw) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            log::warn!("Dropping malformed progress message: {} (payload: {})", e, preview(raw));
            None
        }
    }
}

fn job_id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Serde adapter accepting a job id as either a string or a number.
pub(crate) fn deserialize_job_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = <Value as serde::Deserialize>::deserialize(deserializer)?;
    job_id_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom("job id must be a string or a number"))
}

const MAX_PREVIEW_LENGTH: usize = 120;

/// Truncates a payload for log output without splitting a character.
fn preview(raw: &str) -> String {
    if raw.len() <= MAX_PREVIEW_LENGTH {
        return raw.to_string();
    }
    let mut end = MAX_PREVIEW_LENGTH;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &raw[..end])
}
