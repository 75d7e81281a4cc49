use async_trait::async_trait;
use log::info;
use std::collections::{ HashMap, HashSet };
use tokio::sync::RwLock;

use super::{ CollectionHandle, NamespaceHandle, RecordStore, StoreError };
use crate::models::wire::WireRecord;

type RecordKey = (String, String, String, String);

/// Process-local store. Records are lost when the process exits.
#[derive(Default)]
pub struct MemoryRecordStore {
    namespaces: RwLock<HashSet<String>>,
    collections: RwLock<HashSet<(String, String)>>,
    records: RwLock<HashMap<RecordKey, WireRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    fn record_key(collection: &CollectionHandle, partition_key: &str, id: &str) -> RecordKey {
        (
            collection.namespace.clone(),
            collection.name.clone(),
            partition_key.to_string(),
            id.to_string(),
        )
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn ensure_namespace(&self, name: &str) -> Result<NamespaceHandle, StoreError> {
        if self.namespaces.write().await.insert(name.to_string()) {
            info!("Created namespace '{}'", name);
        }
        Ok(NamespaceHandle { name: name.to_string() })
    }

    async fn ensure_collection(
        &self,
        namespace: &NamespaceHandle,
        name: &str
    ) -> Result<CollectionHandle, StoreError> {
        if !self.namespaces.read().await.contains(&namespace.name) {
            return Err(StoreError::Rejected {
                status: 404,
                message: format!("namespace '{}' does not exist", namespace.name),
            });
        }
        if self.collections.write().await.insert((namespace.name.clone(), name.to_string())) {
            info!("Created collection '{}' in '{}'", name, namespace.name);
        }
        Ok(CollectionHandle::new(namespace, name))
    }

    async fn read(
        &self,
        collection: &CollectionHandle,
        partition_key: &str,
        record_key: &str
    ) -> Result<Option<WireRecord>, StoreError> {
        let key = Self::record_key(collection, partition_key, record_key);
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn upsert(&self, collection: &CollectionHandle, record: &WireRecord) -> Result<(), StoreError> {
        let key = Self::record_key(collection, &record.partition_key, &record.id);
        self.records.write().await.insert(key, record.clone());
        Ok(())
    }
}
