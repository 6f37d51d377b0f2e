//! Typed model of the conversation export document.
//!
//! The export is a list of conversation records (bare, or wrapped under a
//! `conversations` key), each carrying a node mapping: a keyed collection
//! of graph nodes that optionally wrap a message payload. Only the
//! "contains a message" relationship is modeled; the parent/child edges
//! the real export encodes are ignored, because linearization is purely
//! chronological (see `linearize`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// A full export document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExportDocument {
    /// A bare list of conversation records.
    List(Vec<ConversationRecord>),
    /// An object wrapping the list under a `conversations` key.
    Wrapped {
        conversations: Vec<ConversationRecord>,
    },
}

impl ExportDocument {
    /// Parse an export document from a JSON string.
    ///
    /// Any shape other than the two known ones is fatal; nothing has been
    /// written at this point.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|_| {
            Error::Export(
                "expected a list of conversations or an object with a 'conversations' key"
                    .to_string(),
            )
        })
    }

    /// Read and parse an export document from a file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// The conversation records, whichever shape carried them.
    pub fn conversations(&self) -> &[ConversationRecord] {
        match self {
            ExportDocument::List(conversations)
            | ExportDocument::Wrapped { conversations } => conversations,
        }
    }
}

/// One conversation in the export.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConversationRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    /// Node mapping. A `BTreeMap` keeps iteration deterministic, so
    /// messages with identical timestamps keep a stable relative order
    /// across runs.
    pub mapping: BTreeMap<String, ExportNode>,
}

impl ConversationRecord {
    /// Title as recorded, empty string when absent.
    pub fn raw_title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

/// One node of the conversation graph. Everything but the wrapped message
/// payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportNode {
    pub message: Option<MessageNode>,
}

/// A raw message payload as the export records it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageNode {
    pub id: Option<String>,
    pub author: Option<Author>,
    pub create_time: Option<Timestamp>,
    pub create_time_iso: Option<Timestamp>,
    pub update_time: Option<Timestamp>,
    pub content: Option<MessageContent>,
    pub text: Option<Fragment>,
}

impl MessageNode {
    /// Author role string, if the node carries one.
    pub fn role(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| a.role.as_deref())
    }

    /// Best-effort plain-text body.
    ///
    /// Resolution order: structured content with a fragment list (joined
    /// with newlines, non-string fragments contribute nothing), then a
    /// single-text content field, then the node's own top-level text
    /// field. Absence degrades to empty string, never an error.
    pub fn text(&self) -> String {
        match &self.content {
            Some(MessageContent::Parts { parts }) => parts
                .iter()
                .map(Fragment::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Some(MessageContent::Text { text }) => text.clone(),
            Some(MessageContent::Other(_)) | None => self
                .text
                .as_ref()
                .map(|t| t.as_text().to_string())
                .unwrap_or_default(),
        }
    }

    /// Persisted creation time: `create_time` only, in unix seconds.
    pub fn created_at(&self) -> Option<f64> {
        self.create_time.as_ref().and_then(Timestamp::to_epoch)
    }

    /// Chronological sort key. Falls back through the secondary timestamp
    /// fields; missing or unparseable values resolve to epoch start so
    /// they sort before everything dated.
    pub fn sort_key(&self) -> f64 {
        self.create_time
            .as_ref()
            .and_then(Timestamp::to_epoch)
            .or_else(|| self.create_time_iso.as_ref().and_then(Timestamp::to_epoch))
            .or_else(|| self.update_time.as_ref().and_then(Timestamp::to_epoch))
            .unwrap_or(0.0)
    }
}

/// Message author block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Author {
    pub role: Option<String>,
}

/// The known content encodings, with an unrecognized-shape fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Parts { parts: Vec<Fragment> },
    Text { text: String },
    Other(serde_json::Value),
}

/// A content fragment that may or may not be a string. Non-string
/// fragments (image pointers and the like) count as empty text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Fragment {
    Text(String),
    Other(serde_json::Value),
}

impl Fragment {
    pub fn as_text(&self) -> &str {
        match self {
            Fragment::Text(s) => s,
            Fragment::Other(_) => "",
        }
    }
}

/// A timestamp as the export records it: unix seconds, an ISO-8601-like
/// string, or something unusable.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Seconds(f64),
    Iso(String),
    Other(serde_json::Value),
}

impl Timestamp {
    /// Resolve to unix seconds. Unparseable values resolve to `None`
    /// rather than erroring.
    pub fn to_epoch(&self) -> Option<f64> {
        match self {
            Timestamp::Seconds(s) => Some(*s),
            Timestamp::Iso(raw) => parse_iso_seconds(raw),
            Timestamp::Other(_) => None,
        }
    }
}

/// Parse an ISO-8601-like datetime into fractional unix seconds. Accepts
/// an explicit offset or a trailing `Z`; naive datetimes are treated as
/// UTC.
fn parse_iso_seconds(raw: &str) -> Option<f64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_micros() as f64 / 1_000_000.0);
    }
    chrono::NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc().timestamp_micros() as f64 / 1_000_000.0)
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
