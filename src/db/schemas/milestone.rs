//! Milestone document schema.
//!
//! Milestones form the venture's roadmap. The set is produced by the
//! deterministic generator in `services::roadmap` and replaced wholesale on
//! regeneration.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::StreamCategory;

/// Collection name for venture milestones
pub const MILESTONE_COLLECTION: &str = "venture_milestones";

/// Milestone document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MilestoneDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub venture_id: ObjectId,

    /// Stream this milestone belongs to
    pub stream_category: StreamCategory,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Days after the agreement date this milestone is due
    #[serde(default)]
    pub due_offset_days: i32,

    /// Position in the roadmap
    #[serde(default)]
    pub sequence: i32,

    #[serde(default)]
    pub completed: bool,
}

impl IntoIndexes for MilestoneDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "venture_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("venture_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "venture_id": 1, "sequence": 1 },
                Some(
                    IndexOptions::builder()
                        .name("venture_sequence_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for MilestoneDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
