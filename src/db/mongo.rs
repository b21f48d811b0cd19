//! MongoDB client and collection wrapper.
//!
//! Every schema gets a typed [`MongoCollection`] that applies its indexes on
//! startup, stamps metadata timestamps on writes, filters soft-deleted
//! documents out of reads, and retries idempotent reads on transient store
//! failures.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::IndexOptions,
    results::{DeleteResult, UpdateResult},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{error, info};

use crate::db::retry;
use crate::db::schemas::Metadata;
use crate::types::TrellisError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify with a ping.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, TrellisError> {
        info!("Connecting to MongoDB at {}", uri);

        // serverSelectionTimeoutMS avoids hanging on an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| TrellisError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| TrellisError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied.
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, TrellisError>
    where
        T: Serialize
            + DeserializeOwned
            + Unpin
            + Send
            + Sync
            + Default
            + IntoIndexes
            + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Sort, skip, and limit for list queries.
#[derive(Debug, Clone, Default)]
pub struct FindOpts {
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindOpts {
    pub fn sorted(sort: Document) -> Self {
        FindOpts {
            sort: Some(sort),
            ..Default::default()
        }
    }

    pub fn page(sort: Document, skip: u64, limit: i64) -> Self {
        FindOpts {
            sort: Some(sort),
            skip: Some(skip),
            limit: Some(limit),
        }
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection handle and apply schema indexes.
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, TrellisError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), TrellisError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| TrellisError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, stamping metadata timestamps. Unique index
    /// violations surface as `Conflict`.
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, TrellisError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self.inner.insert_one(item).await.map_err(|e| {
            let msg = e.to_string();
            if msg.contains("E11000") {
                TrellisError::Conflict("duplicate key".into())
            } else {
                TrellisError::Database(format!("Insert failed: {}", msg))
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| TrellisError::Database("Failed to get inserted ID".into()))
    }

    /// Insert several documents, stamping metadata on each.
    pub async fn insert_many(&self, items: Vec<T>) -> Result<Vec<ObjectId>, TrellisError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let now = DateTime::now();
        let items: Vec<T> = items
            .into_iter()
            .map(|mut item| {
                let metadata = item.mut_metadata();
                metadata.is_deleted = false;
                metadata.created_at = Some(now);
                metadata.updated_at = Some(now);
                item
            })
            .collect();

        let result = self.inner.insert_many(items).await.map_err(|e| {
            let msg = e.to_string();
            if msg.contains("E11000") {
                TrellisError::Conflict("duplicate key".into())
            } else {
                TrellisError::Database(format!("Insert failed: {}", msg))
            }
        })?;

        Ok(result
            .inserted_ids
            .values()
            .filter_map(|id| id.as_object_id())
            .collect())
    }

    /// Find one live document by filter. Retries transient store failures.
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, TrellisError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        retry::with_backoff("find_one", || {
            let filter = full_filter.clone();
            async move {
                self.inner
                    .find_one(filter)
                    .await
                    .map_err(|e| TrellisError::Database(format!("Find failed: {}", e)))
            }
        })
        .await
    }

    /// Find live documents by filter, with optional sort and pagination.
    /// Retries transient store failures.
    pub async fn find_many(
        &self,
        filter: Document,
        opts: FindOpts,
    ) -> Result<Vec<T>, TrellisError> {
        use futures_util::StreamExt;

        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        retry::with_backoff("find_many", || {
            let filter = full_filter.clone();
            let opts = opts.clone();
            async move {
                let mut find = self.inner.find(filter);
                if let Some(sort) = opts.sort {
                    find = find.sort(sort);
                }
                if let Some(skip) = opts.skip {
                    find = find.skip(skip);
                }
                if let Some(limit) = opts.limit {
                    find = find.limit(limit);
                }

                let cursor = find
                    .await
                    .map_err(|e| TrellisError::Database(format!("Find failed: {}", e)))?;

                let results: Vec<T> = cursor
                    .filter_map(|doc| async {
                        match doc {
                            Ok(d) => Some(d),
                            Err(e) => {
                                error!("Error reading document: {}", e);
                                None
                            }
                        }
                    })
                    .collect()
                    .await;

                Ok(results)
            }
        })
        .await
    }

    /// Count live documents matching the filter. Retries transient store
    /// failures.
    pub async fn count(&self, filter: Document) -> Result<u64, TrellisError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        retry::with_backoff("count", || {
            let filter = full_filter.clone();
            async move {
                self.inner
                    .count_documents(filter)
                    .await
                    .map_err(|e| TrellisError::Database(format!("Count failed: {}", e)))
            }
        })
        .await
    }

    /// Update one document, stamping `metadata.updated_at` into the `$set`.
    /// Writes are not retried.
    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, TrellisError> {
        let mut update = update;
        let mut set = update
            .get_document("$set")
            .map(|d| d.clone())
            .unwrap_or_default();
        set.insert("metadata.updated_at", DateTime::now());
        update.insert("$set", set);

        self.inner
            .update_one(filter, update)
            .await
            .map_err(|e| TrellisError::Database(format!("Update failed: {}", e)))
    }

    /// Soft delete documents matching the filter.
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, TrellisError> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.inner
            .update_one(filter, update)
            .await
            .map_err(|e| TrellisError::Database(format!("Delete failed: {}", e)))
    }

    /// Hard-delete documents matching the filter. Reserved for maintenance
    /// operations like roadmap regeneration; user-facing deletes are soft.
    pub async fn delete_many(&self, filter: Document) -> Result<DeleteResult, TrellisError> {
        self.inner
            .delete_many(filter)
            .await
            .map_err(|e| TrellisError::Database(format!("Delete failed: {}", e)))
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}
