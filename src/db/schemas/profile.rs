//! Profile document schema.
//!
//! Stores credentials and the platform role. The role on this record is the
//! only role source the service consults.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::Role;

/// Collection name for profiles
pub const PROFILE_COLLECTION: &str = "profiles";

/// Profile document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProfileDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Login identifier (email)
    pub identifier: String,

    /// Argon2 password hash
    pub password_hash: String,

    #[serde(default)]
    pub display_name: String,

    /// Platform role; unknown stored values fall back to entrepreneur
    #[serde(default)]
    pub role: Role,

    /// Whether the account may authenticate
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Token version for invalidation (increment to invalidate all tokens)
    #[serde(default)]
    pub token_version: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime>,
}

fn default_true() -> bool {
    true
}

impl ProfileDoc {
    /// Create a new profile.
    pub fn new(identifier: String, password_hash: String, display_name: String, role: Role) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            identifier,
            password_hash,
            display_name,
            role,
            is_active: true,
            token_version: 1,
            last_login: None,
        }
    }
}

impl IntoIndexes for ProfileDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on identifier
            (
                doc! { "identifier": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("identifier_unique".to_string())
                        .build(),
                ),
            ),
            // Admin provisioning lists filter by role
            (
                doc! { "role": 1 },
                Some(
                    IndexOptions::builder()
                        .name("role_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ProfileDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
