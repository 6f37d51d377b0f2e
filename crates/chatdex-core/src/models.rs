//! Domain models for normalized conversation entities.

use serde::{Deserialize, Serialize};

/// A conversation from an export, normalized to a common format.
///
/// Timestamps are unix seconds as the export records them (fractional
/// seconds preserved). `created_at` is coalesce-on-conflict: once a value
/// is stored, later ingestion runs never overwrite it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: Option<f64>,
    pub updated_at: Option<f64>,
}

/// A message within a conversation.
///
/// Persisted messages always have a role of `User` or `Assistant` and
/// non-empty text; the linearizer filters everything else out before the
/// writer sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub created_at: Option<f64>,
    pub text: String,
}

/// Message roles across export formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
    #[serde(other)]
    Other,
}

impl MessageRole {
    /// Whether this role belongs in the persisted message set.
    pub fn is_substantive(self) -> bool {
        matches!(self, MessageRole::User | MessageRole::Assistant)
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Tool => write!(f, "tool"),
            MessageRole::Other => write!(f, "other"),
        }
    }
}

impl From<&str> for MessageRole {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "user" | "human" => MessageRole::User,
            "assistant" | "agent" | "ai" | "bot" => MessageRole::Assistant,
            "system" => MessageRole::System,
            "tool" | "function" => MessageRole::Tool,
            _ => MessageRole::Other,
        }
    }
}

/// Search hit for message-level queries, denormalized for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub message_id: String,
    pub conversation_id: String,
    pub title: String,
    pub role: MessageRole,
    pub created_at: Option<f64>,
    pub text: String,
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
