//! Support hours document schema.
//!
//! Mentor time recorded by staff against a venture.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::StreamCategory;

/// Collection name for support hours
pub const SUPPORT_HOURS_COLLECTION: &str = "support_hours";

/// Support hours entry stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SupportHoursDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub venture_id: ObjectId,

    /// Staff profile that recorded the time
    pub recorded_by: ObjectId,

    /// Hours spent; positive, at most 24 per entry
    pub hours: f64,

    /// Optional stream the time was spent on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<StreamCategory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SupportHoursDoc {
    pub fn new(
        venture_id: ObjectId,
        recorded_by: ObjectId,
        hours: f64,
        category: Option<StreamCategory>,
        note: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            venture_id,
            recorded_by,
            hours,
            category,
            note,
        }
    }
}

impl IntoIndexes for SupportHoursDoc {
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

impl MutMetadata for SupportHoursDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
