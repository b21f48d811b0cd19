//! Venture history document schema.
//!
//! Append-only record of every status transition, written by the pipeline
//! in the same operation as the status flip.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::{Role, VentureStatus};

/// Collection name for venture history
pub const HISTORY_COLLECTION: &str = "venture_history";

/// Transition record stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct HistoryDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub venture_id: ObjectId,

    pub from_status: VentureStatus,

    pub to_status: VentureStatus,

    pub actor_id: ObjectId,

    pub actor_role: Role,

    /// Optional annotation, e.g. the committee feedback on a rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl HistoryDoc {
    pub fn new(
        venture_id: ObjectId,
        from_status: VentureStatus,
        to_status: VentureStatus,
        actor_id: ObjectId,
        actor_role: Role,
        note: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            venture_id,
            from_status,
            to_status,
            actor_id,
            actor_role,
            note,
        }
    }
}

impl IntoIndexes for HistoryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "venture_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("venture_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for HistoryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
