//! MongoDB storage layer.

pub mod mongo;
pub mod retry;
pub mod schemas;

pub use mongo::{FindOpts, IntoIndexes, MongoClient, MongoCollection, MutMetadata};
