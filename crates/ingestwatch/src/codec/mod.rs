//! Boundary decoding of raw stream payloads into typed events.

pub mod decode;
pub mod event;

pub use decode::{decode, decode_or_warn, DecodeError};
pub use event::{Envelope, PipelineStage, ProgressEvent, StepProgress};
