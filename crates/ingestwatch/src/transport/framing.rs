//! Splits the raw byte stream of a response into text payloads.

use serde::{Deserialize, Serialize};

/// Wire framing of the progress stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Server-Sent Events: `data:` lines, events separated by a blank line.
    #[default]
    Sse,
    /// One JSON document per line.
    Ndjson,
}

impl Framing {
    /// Value for the `Accept` header.
    pub fn accept(self) -> &'static str {
        match self {
            Framing::Sse => "text/event-stream",
            Framing::Ndjson => "application/x-ndjson",
        }
    }
}

/// Incremental frame decoder. Chunks may split lines and UTF-8 sequences
/// anywhere; only complete lines are decoded.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Feeds a chunk and returns every payload it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
            self.feed_line(line, &mut payloads);
        }
        payloads
    }

    /// Flushes at end of stream. A trailing NDJSON line without newline is
    /// still a payload; an SSE event without its terminating blank line is
    /// incomplete and discarded.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        match self.framing {
            Framing::Ndjson => {
                let line = String::from_utf8_lossy(&rest);
                let line = line.trim();
                (!line.is_empty()).then(|| line.to_string())
            }
            Framing::Sse => {
                if !self.data.is_empty() || !rest.is_empty() {
                    log::debug!("Discarding incomplete event at end of stream");
                }
                self.data.clear();
                None
            }
        }
    }

    fn feed_line(&mut self, line: &str, payloads: &mut Vec<String>) {
        match self.framing {
            Framing::Ndjson => {
                let line = line.trim();
                if !line.is_empty() {
                    payloads.push(line.to_string());
                }
            }
            Framing::Sse => {
                if line.is_empty() {
                    if !self.data.is_empty() {
                        payloads.push(self.data.join("\n"));
                        self.data.clear();
                    }
                    return;
                }
                if line.starts_with(':') {
                    return;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                    None => (line, ""),
                };
                if field == "data" {
                    self.data.push(value.to_string());
                }
                // event, id and retry carry nothing the consumer needs.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_single_event() {
        let mut decoder = FrameDecoder::new(Framing::Sse);
        let out = decoder.push(b"data: {\"type\":\"start\",\"total_files\":1}\n\n");
        assert_eq!(out, vec![r#"{"type":"start","total_files":1}"#]);
    }

    #[test]
    fn test_sse_event_split_across_chunks() {
        let mut decoder = FrameDecoder::new(Framing::Sse);
        assert!(decoder.push(b"data: {\"type\":").is_empty());
        assert!(decoder.push(b"\"status\",\"message\":\"hi\"}\r\n").is_empty());
        let out = decoder.push(b"\r\n");
        assert_eq!(out, vec![r#"{"type":"status","message":"hi"}"#]);
    }

    #[test]
    fn test_sse_multi_line_data_and_comments() {
        let mut decoder = FrameDecoder::new(Framing::Sse);
        let out = decoder.push(b": keep-alive\nevent: progress\nid: 7\ndata: line one\ndata:line two\n\n");
        assert_eq!(out, vec!["line one\nline two"]);
    }

    #[test]
    fn test_sse_multiple_events_in_one_chunk() {
        let mut decoder = FrameDecoder::new(Framing::Sse);
        let out = decoder.push(b"data: a\n\ndata: b\n\n\n");
        assert_eq!(out, vec!["a", "b"]);
    }

    #[test]
    fn test_sse_split_utf8_sequence() {
        let mut decoder = FrameDecoder::new(Framing::Sse);
        let bytes = "data: Seite é\n\n".as_bytes();
        let split = bytes.len() - 3;
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec!["Seite é"]);
    }

    #[test]
    fn test_sse_finish_discards_incomplete_event() {
        let mut decoder = FrameDecoder::new(Framing::Sse);
        assert!(decoder.push(b"data: half\n").is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_ndjson_lines() {
        let mut decoder = FrameDecoder::new(Framing::Ndjson);
        let out = decoder.push(b"{\"a\":1}\n\n{\"b\":2}\n{\"c\"");
        assert_eq!(out, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
        assert!(decoder.push(b":3}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some(r#"{"c":3}"#));
    }

    #[test]
    fn test_accept_headers() {
        assert_eq!(Framing::Sse.accept(), "text/event-stream");
        assert_eq!(Framing::Ndjson.accept(), "application/x-ndjson");
        assert_eq!(Framing::default(), Framing::Sse);
    }
}
