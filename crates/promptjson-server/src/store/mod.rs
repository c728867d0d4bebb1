//! Persistence of successful conversions.

mod jsonl;
mod memory;

pub use jsonl::JsonlConversionStore;
pub use memory::MemoryConversionStore;

use async_trait::async_trait;
use promptjson_core::{ConversionRecord, NewConversion};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Other(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Document store for conversion records
#[async_trait]
pub trait ConversionStore: Send + Sync {
    /// Persist a new record and return it with its id
    async fn create(&self, conversion: NewConversion) -> StoreResult<ConversionRecord>;

    /// Records owned by a user, newest first
    async fn find_by_owner(&self, user_id: &str, limit: usize) -> StoreResult<Vec<ConversionRecord>>;

    /// Delete one of the user's records. False when it does not exist.
    async fn delete(&self, user_id: &str, id: &str) -> StoreResult<bool>;

    fn backend(&self) -> &'static str;
}

/// Newest first, at most `limit`
pub(crate) fn newest_first(mut records: Vec<ConversionRecord>, limit: usize) -> Vec<ConversionRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records.truncate(limit);
    records
}
