//! Work stream document schema.
//!
//! Six streams are seeded per venture at submission; the unique
//! `(venture_id, category)` index makes a second seeding attempt a
//! conflict rather than a duplicate.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::{StreamCategory, StreamStatus};

/// Collection name for venture work streams
pub const STREAM_COLLECTION: &str = "venture_streams";

/// Work stream document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StreamDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub venture_id: ObjectId,

    pub category: StreamCategory,

    #[serde(default)]
    pub status: StreamStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Dashboard ordering, taken from the category's canonical position
    #[serde(default)]
    pub sort_order: i32,
}

impl StreamDoc {
    /// Fresh stream for a newly submitted venture.
    pub fn new(venture_id: ObjectId, category: StreamCategory) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            venture_id,
            category,
            status: StreamStatus::NotStarted,
            summary: None,
            sort_order: category.sort_order(),
        }
    }
}

impl IntoIndexes for StreamDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One stream per category per venture
            (
                doc! { "venture_id": 1, "category": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("venture_category_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "venture_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("venture_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for StreamDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
