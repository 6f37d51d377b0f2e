//! Stable identity derivation for conversations and messages.
//!
//! Exports do not always carry identifiers. When one is missing, a
//! content-derived SHA-256 stands in, so re-running ingestion over
//! unchanged input always resolves to the same rows.

use sha2::{Digest, Sha256};

use crate::models::MessageRole;

/// How many leading characters of a message body participate in its
/// derived identifier.
pub const TEXT_PREFIX_CHARS: usize = 32;

/// Identifier for a conversation: the export's own id when present,
/// otherwise a hash of the raw title.
///
/// Two id-less conversations with identical titles therefore collide and
/// merge. Known limitation.
pub fn conversation_id(source_id: Option<&str>, raw_title: &str) -> String {
    match source_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => hex_digest(raw_title.as_bytes()),
    }
}

/// Identifier for a message: the export's own id when present, otherwise
/// a hash over (conversation id, timestamp, role, text prefix).
pub fn message_id(
    source_id: Option<&str>,
    conversation_id: &str,
    created_at: Option<f64>,
    role: MessageRole,
    text: &str,
) -> String {
    match source_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let ts = created_at.map_or_else(|| "none".to_string(), |t| t.to_string());
            let prefix: String = text.chars().take(TEXT_PREFIX_CHARS).collect();
            hex_digest(format!("{conversation_id}:{ts}:{role}:{prefix}").as_bytes())
        }
    }
}

fn hex_digest(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}
