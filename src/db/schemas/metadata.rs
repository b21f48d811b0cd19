//! Common document metadata.
//!
//! Every collection embeds this subdocument. Reads filter on `is_deleted`;
//! the collection wrapper stamps the timestamps on insert and update.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Soft-delete flag and lifecycle timestamps.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Fresh metadata stamped with the current time.
    pub fn new() -> Self {
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(DateTime::now()),
            created_at: Some(DateTime::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_metadata_deserializes_live() {
        // Documents imported from earlier exports may lack the subdocument
        let meta: Metadata = serde_json::from_str("{}").unwrap();
        assert!(!meta.is_deleted);
        assert!(meta.deleted_at.is_none());
    }

    #[test]
    fn unset_timestamps_are_omitted_from_storage() {
        let meta = Metadata::default();
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("deleted_at").is_none());
        assert!(json.get("created_at").is_none());
        assert_eq!(json.get("is_deleted").unwrap(), false);
    }
}
