//! Chronological linearization of a conversation's node mapping.
//!
//! Policy: the export encodes a tree, but this pipeline orders messages
//! purely by timestamp ("chronological linearization"). Parent/child
//! edges are never consulted; a tree-walk linearizer for branched
//! conversations would be a separate feature, not a change here.

use std::collections::BTreeMap;

use crate::export::{ExportNode, MessageNode};
use crate::models::MessageRole;

/// Whether a message payload belongs in the persisted set: role resolves
/// to user or assistant, and the extracted text is non-empty after
/// trimming.
pub fn is_substantive(message: &MessageNode) -> bool {
    let role = message.role().map_or(MessageRole::Other, MessageRole::from);
    role.is_substantive() && !message.text().trim().is_empty()
}

/// Flatten a node mapping into a time-ordered message sequence.
///
/// Non-substantive payloads are dropped, then the rest are stable-sorted
/// ascending by their sort key. Missing or unparseable timestamps key to
/// epoch start and so come first. Ties keep the mapping's node-key order,
/// which is deterministic but not semantically meaningful.
pub fn linearize(mapping: &BTreeMap<String, ExportNode>) -> Vec<&MessageNode> {
    let mut keyed: Vec<(f64, &MessageNode)> = mapping
        .values()
        .filter_map(|node| node.message.as_ref())
        .filter(|message| is_substantive(message))
        .map(|message| (message.sort_key(), message))
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, message)| message).collect()
}

#[cfg(test)]
#[path = "linearize_tests.rs"]
mod tests;
