//! Interaction log document schema.
//!
//! Calls, meetings, emails, and notes attached to a venture. Entries are
//! editable only by their author or an admin.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for venture interactions
pub const INTERACTION_COLLECTION: &str = "venture_interactions";

/// What kind of touchpoint was logged.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Call,
    Meeting,
    Email,
    #[default]
    Note,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Call => "call",
            InteractionKind::Meeting => "meeting",
            InteractionKind::Email => "email",
            InteractionKind::Note => "note",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Interaction document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InteractionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub venture_id: ObjectId,

    /// Profile that logged the entry
    pub author_id: ObjectId,

    #[serde(default)]
    pub kind: InteractionKind,

    pub body: String,

    /// When the touchpoint happened (defaults to logging time)
    pub occurred_at: DateTime,
}

impl Default for InteractionDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            venture_id: ObjectId::default(),
            author_id: ObjectId::default(),
            kind: InteractionKind::default(),
            body: String::new(),
            occurred_at: DateTime::now(),
        }
    }
}

impl InteractionDoc {
    pub fn new(
        venture_id: ObjectId,
        author_id: ObjectId,
        kind: InteractionKind,
        body: String,
        occurred_at: Option<DateTime>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            venture_id,
            author_id,
            kind,
            body,
            occurred_at: occurred_at.unwrap_or_else(DateTime::now),
        }
    }
}

impl IntoIndexes for InteractionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "venture_id": 1, "occurred_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("venture_timeline_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "author_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("author_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for InteractionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_uses_snake_case_wire_form() {
        assert_eq!(
            serde_json::to_string(&InteractionKind::Meeting).unwrap(),
            "\"meeting\""
        );
        let kind: InteractionKind = serde_json::from_str("\"call\"").unwrap();
        assert_eq!(kind, InteractionKind::Call);
    }

    #[test]
    fn occurred_at_defaults_to_now() {
        let before = DateTime::now();
        let entry = InteractionDoc::new(
            ObjectId::new(),
            ObjectId::new(),
            InteractionKind::Note,
            "Spoke about hiring plan".to_string(),
            None,
        );
        assert!(entry.occurred_at >= before);
    }
}
