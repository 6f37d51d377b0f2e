//! Ingestion pipeline: export document in, normalized rows out.

use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::export::ExportDocument;
use crate::ident;
use crate::linearize::linearize;
use crate::models::{Conversation, Message, MessageRole};

/// Title stored when the export has none.
const DEFAULT_TITLE: &str = "Conversation";

/// Options for an ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Cap on messages kept per conversation, applied after linearization.
    pub max_messages: Option<usize>,
    /// Case-insensitive substring over conversation titles; non-matching
    /// conversations are skipped before any write.
    pub title_filter: Option<String>,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub conversations: usize,
    pub messages: usize,
    pub failed: usize,
}

/// Ingest every conversation in the document, sequentially. Each
/// conversation is one transactional unit; a conversation that fails to
/// write is logged and counted, and the run continues with the next one.
pub async fn ingest(
    db: &Database,
    document: &ExportDocument,
    opts: &IngestOptions,
) -> Result<IngestReport> {
    let needle = opts
        .title_filter
        .as_ref()
        .map(|filter| filter.to_lowercase());

    let mut report = IngestReport::default();

    for record in document.conversations() {
        let raw_title = record.raw_title();

        if let Some(ref needle) = needle {
            if !raw_title.to_lowercase().contains(needle) {
                continue;
            }
        }

        // The hash fallback derives from the raw (possibly empty) title,
        // while the stored title gets the display default.
        let conv_id = ident::conversation_id(record.id.as_deref(), raw_title);
        let title = if raw_title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            raw_title.to_string()
        };

        let mut sequence = linearize(&record.mapping);
        if let Some(max) = opts.max_messages {
            sequence.truncate(max);
        }

        let conv = Conversation {
            id: conv_id.clone(),
            title,
            created_at: sequence.first().and_then(|m| m.created_at()),
            updated_at: sequence.last().and_then(|m| m.created_at()),
        };

        let messages: Vec<Message> = sequence
            .iter()
            .map(|node| {
                let role = node.role().map_or(MessageRole::Other, MessageRole::from);
                let created_at = node.created_at();
                let text = node.text();
                Message {
                    id: ident::message_id(
                        node.id.as_deref(),
                        &conv_id,
                        created_at,
                        role,
                        &text,
                    ),
                    conversation_id: conv_id.clone(),
                    role,
                    created_at,
                    text,
                }
            })
            .collect();

        match db.ingest_conversation(&conv, &messages).await {
            Ok(()) => {
                report.conversations += 1;
                report.messages += messages.len();
            }
            Err(err) => {
                tracing::warn!("Failed to ingest conversation {conv_id}: {err}");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
