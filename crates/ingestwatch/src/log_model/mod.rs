//! Ordered job log with accordion nodes and in-place page lines.
//!
//! The log is display-oriented data derived from the progress stream. It is
//! keyed structurally: accordion nodes by `(file, part, title)` and page lines
//! by `(file, page_id)`. Presentation state such as whether a node is expanded
//! belongs to the UI layer and is not stored here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolViolation;

/// Identity of an accordion node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccordionKey {
    pub file: String,
    pub part: String,
    pub title: String,
}

impl AccordionKey {
    /// Part used when an event does not name one.
    pub const DEFAULT_PART: &'static str = "all";

    pub fn new(file: &str, part: Option<&str>, title: &str) -> Self {
        Self {
            file: file.to_string(),
            part: part.unwrap_or(Self::DEFAULT_PART).to_string(),
            title: title.to_string(),
        }
    }
}

/// Identity of an in-place progress line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageKey {
    pub file: String,
    pub page_id: String,
}

impl PageKey {
    pub fn new(file: &str, page_id: &str) -> Self {
        Self {
            file: file.to_string(),
            page_id: page_id.to_string(),
        }
    }
}

/// Stable handle of an accordion node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogContent {
    /// Append-only status line.
    Line { text: String },
    /// Progress line overwritten in place for its page.
    PageLine { key: PageKey, text: String },
    /// Collapsible heading with an optional body.
    Accordion {
        id: NodeId,
        key: AccordionKey,
        heading: String,
        body: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Model revision at which this entry last changed.
    pub revision: u64,
    pub content: LogContent,
}

impl LogEntry {
    /// Primary display text of the entry.
    pub fn text(&self) -> &str {
        match &self.content {
            LogContent::Line { text } | LogContent::PageLine { text, .. } => text,
            LogContent::Accordion { heading, .. } => heading,
        }
    }
}

/// Outcome of writing an accordion body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyWrite {
    Set,
    Replaced,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct LogModel {
    entries: Vec<LogEntry>,
    accordions: HashMap<AccordionKey, usize>,
    pages: HashMap<PageKey, usize>,
    next_node: u64,
    revision: u64,
}

impl LogModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn push(&mut self, content: LogContent) -> usize {
        let revision = self.bump();
        self.entries.push(LogEntry { revision, content });
        self.entries.len() - 1
    }

    /// Returns the node for `key`, appending a heading-only node on first sight.
    pub fn ensure_accordion(&mut self, key: AccordionKey, heading: impl Into<String>) -> NodeId {
        if let Some(&pos) = self.accordions.get(&key) {
            if let LogContent::Accordion { id, .. } = &self.entries[pos].content {
                return *id;
            }
        }
        let id = NodeId(self.next_node);
        self.next_node += 1;
        let pos = self.push(LogContent::Accordion {
            id,
            key: key.clone(),
            heading: heading.into(),
            body: None,
        });
        self.accordions.insert(key, pos);
        id
    }

    /// Writes the body of an existing node. A missing heading is a protocol
    /// violation and nothing is created.
    pub fn set_body(
        &mut self,
        key: &AccordionKey,
        content: &str,
    ) -> Result<BodyWrite, ProtocolViolation> {
        let pos = *self
            .accordions
            .get(key)
            .ok_or_else(|| ProtocolViolation::BodyWithoutHeading(key.clone()))?;

        let write = match &self.entries[pos].content {
            LogContent::Accordion { body: None, .. } => BodyWrite::Set,
            LogContent::Accordion {
                body: Some(existing),
                ..
            } if existing == content => BodyWrite::Unchanged,
            _ => BodyWrite::Replaced,
        };
        if write == BodyWrite::Unchanged {
            return Ok(write);
        }

        let revision = self.bump();
        let entry = &mut self.entries[pos];
        if let LogContent::Accordion { body, .. } = &mut entry.content {
            *body = Some(content.to_string());
        }
        entry.revision = revision;
        Ok(write)
    }

    /// Appends a plain status line. Returns its position.
    pub fn append_line(&mut self, text: impl Into<String>) -> usize {
        self.push(LogContent::Line { text: text.into() })
    }

    /// Replaces the line stored for `key` at its original position, or appends
    /// it on first sight. Returns its position.
    pub fn upsert_page_line(&mut self, key: PageKey, text: impl Into<String>) -> usize {
        let text = text.into();
        if let Some(&pos) = self.pages.get(&key) {
            let revision = self.bump();
            let entry = &mut self.entries[pos];
            entry.content = LogContent::PageLine { key, text };
            entry.revision = revision;
            return pos;
        }
        let pos = self.push(LogContent::PageLine {
            key: key.clone(),
            text,
        });
        self.pages.insert(key, pos);
        pos
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries that changed after `revision`, in log order.
    pub fn entries_since(&self, revision: u64) -> impl Iterator<Item = (usize, &LogEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.revision > revision)
    }

    pub fn accordion(&self, key: &AccordionKey) -> Option<&LogEntry> {
        self.accordions.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn node(&self, id: NodeId) -> Option<&LogEntry> {
        self.entries
            .iter()
            .find(|e| matches!(&e.content, LogContent::Accordion { id: node, .. } if *node == id))
    }

    /// Latest revision; increases with every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries. The revision keeps counting so incremental readers
    /// never mistake new entries for already-seen ones.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.accordions.clear();
        self.pages.clear();
        self.bump();
    }
}
