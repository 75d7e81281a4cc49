mod cosmos;
mod memory;
mod redis;

pub use self::cosmos::CosmosRecordStore;
pub use self::memory::MemoryRecordStore;
pub use self::redis::RedisRecordStore;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use thiserror::Error;

use crate::cli::Args;
use crate::models::wire::WireRecord;

/// Path of the partition key inside every stored record.
pub const PARTITION_KEY_PATH: &str = "/partition_key";

/// Throughput allocated to newly created collections.
pub const MIN_THROUGHPUT: u32 = 400;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record store rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
    },
    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("record store configuration error: {0}")]
    Config(String),
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceHandle {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionHandle {
    pub namespace: String,
    pub name: String,
    pub partition_key_path: String,
}

impl CollectionHandle {
    pub fn new(namespace: &NamespaceHandle, name: &str) -> Self {
        Self {
            namespace: namespace.name.clone(),
            name: name.to_string(),
            partition_key_path: PARTITION_KEY_PATH.to_string(),
        }
    }
}

/// Keyed document storage holding one [`WireRecord`] per conversation.
///
/// The `ensure_*` operations are get-or-create: an absent namespace or
/// collection is created, and a create that loses a race resolves to the
/// already existing resource.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn ensure_namespace(&self, name: &str) -> Result<NamespaceHandle, StoreError>;

    async fn ensure_collection(
        &self,
        namespace: &NamespaceHandle,
        name: &str
    ) -> Result<CollectionHandle, StoreError>;

    /// Point read by exact partition key and record key. Absence is `Ok(None)`.
    async fn read(
        &self,
        collection: &CollectionHandle,
        partition_key: &str,
        record_key: &str
    ) -> Result<Option<WireRecord>, StoreError>;

    /// Full replacement of the record at its key; last writer wins.
    async fn upsert(&self, collection: &CollectionHandle, record: &WireRecord) -> Result<(), StoreError>;
}

pub fn create_record_store(args: &Args) -> Result<Arc<dyn RecordStore>, StoreError> {
    match args.store_type.to_lowercase().as_str() {
        "cosmos" => {
            let endpoint = args.cosmos_endpoint
                .clone()
                .ok_or_else(|| StoreError::Config("COSMOS_ENDPOINT is required for the cosmos store".into()))?;
            let key = args.cosmos_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| StoreError::Config("COSMOS_KEY is required for the cosmos store".into()))?;
            Ok(Arc::new(CosmosRecordStore::new(&endpoint, &key)?))
        }
        "redis" => {
            let store = RedisRecordStore::new(&args.redis_url, &args.redis_prefix)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryRecordStore::new())),
        other => Err(StoreError::Config(format!("Unsupported record store type: {}", other))),
    }
}

pub fn initialize_record_store(args: &Args) -> Result<Arc<dyn RecordStore>, StoreError> {
    info!(
        "Conversations will be stored in: {} (database '{}', collection '{}')",
        args.store_type,
        args.db_name,
        args.db_container
    );
    create_record_store(args)
}
