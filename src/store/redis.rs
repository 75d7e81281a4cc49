use async_trait::async_trait;
use log::{ error, info };
use redis::{ AsyncCommands, Client };
use serde::{ Deserialize, Serialize };

use super::{ CollectionHandle, NamespaceHandle, RecordStore, StoreError, MIN_THROUGHPUT };
use crate::models::wire::WireRecord;

#[derive(Serialize, Deserialize)]
struct CollectionSettings {
    partition_key_path: String,
    throughput: u32,
}

/// Records are JSON strings under `{prefix}record:["namespace","collection","partition","id"]`;
/// the JSON array keeps caller-supplied keys containing `:` apart.
/// Namespaces live in the `{prefix}namespaces` set and collections in the
/// `{prefix}{namespace}:collections` hash, so provisioning is idempotent on the
/// server side.
pub struct RedisRecordStore {
    client: Client,
    key_prefix: String,
}

impl RedisRecordStore {
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(url)?,
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn namespaces_key(&self) -> String {
        format!("{}namespaces", self.key_prefix)
    }

    fn collections_key(&self, namespace: &str) -> String {
        format!("{}{}:collections", self.key_prefix, namespace)
    }

    fn record_key(&self, collection: &CollectionHandle, partition_key: &str, id: &str) -> Result<String, StoreError> {
        let parts = [collection.namespace.as_str(), collection.name.as_str(), partition_key, id];
        Ok(format!("{}record:{}", self.key_prefix, serde_json::to_string(&parts)?))
    }
}

/// A stored record must carry the keys it was looked up by.
fn check_identity(record: WireRecord, partition_key: &str, record_key: &str) -> Result<WireRecord, StoreError> {
    if record.partition_key == partition_key && record.id == record_key {
        Ok(record)
    } else {
        Err(StoreError::Rejected {
            status: 409,
            message: format!(
                "stored record {}/{} does not match requested {}/{}",
                record.partition_key,
                record.id,
                partition_key,
                record_key
            ),
        })
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn ensure_namespace(&self, name: &str) -> Result<NamespaceHandle, StoreError> {
        let mut conn = self.get_connection().await?;
        let added: i64 = conn.sadd(self.namespaces_key(), name).await?;
        if added > 0 {
            info!("Created namespace '{}'", name);
        }
        Ok(NamespaceHandle { name: name.to_string() })
    }

    async fn ensure_collection(
        &self,
        namespace: &NamespaceHandle,
        name: &str
    ) -> Result<CollectionHandle, StoreError> {
        let mut conn = self.get_connection().await?;
        let known: bool = conn.sismember(self.namespaces_key(), &namespace.name).await?;
        if !known {
            return Err(StoreError::Rejected {
                status: 404,
                message: format!("namespace '{}' does not exist", namespace.name),
            });
        }

        let handle = CollectionHandle::new(namespace, name);
        let settings = serde_json::to_string(
            &(CollectionSettings {
                partition_key_path: handle.partition_key_path.clone(),
                throughput: MIN_THROUGHPUT,
            })
        )?;
        let created: bool = conn.hset_nx(self.collections_key(&namespace.name), name, settings).await?;
        if created {
            info!("Created collection '{}' in '{}' with partition key {}", name, namespace.name, handle.partition_key_path);
        }
        Ok(handle)
    }

    async fn read(
        &self,
        collection: &CollectionHandle,
        partition_key: &str,
        record_key: &str
    ) -> Result<Option<WireRecord>, StoreError> {
        let mut conn = self.get_connection().await?;
        let key = self.record_key(collection, partition_key, record_key)?;
        let stored: Option<String> = conn.get(&key).await?;

        match stored {
            Some(json) => {
                let record: WireRecord = serde_json::from_str(&json).map_err(|e| {
                    error!("Error parsing stored record '{}': {}", key, e);
                    StoreError::from(e)
                })?;
                check_identity(record, partition_key, record_key).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn upsert(&self, collection: &CollectionHandle, record: &WireRecord) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let key = self.record_key(collection, &record.partition_key, &record.id)?;
        let json = serde_json::to_string(record)?;
        let _: () = conn.set(&key, json).await?;
        Ok(())
    }
}
