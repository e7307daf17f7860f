//! In-memory partition store
//!
//! Nested maps under a single `parking_lot::RwLock`. Operations are
//! synchronous under the lock; partitions and entries enumerate
//! deterministically, which the lifecycle and queue code relies on in tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::entry::{RequestKey, StoredResponse};
use super::error::StoreError;
use super::PartitionStore;

/// In-memory `PartitionStore` implementation.
#[derive(Default)]
pub struct MemoryStore {
    partitions: RwLock<HashMap<String, HashMap<RequestKey, StoredResponse>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a partition, zero if it does not exist.
    pub fn entry_count(&self, partition: &str) -> usize {
        self.partitions
            .read()
            .get(partition)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PartitionStore for MemoryStore {
    async fn open(&self, partition: &str) -> Result<(), StoreError> {
        self.partitions
            .write()
            .entry(partition.to_string())
            .or_default();
        Ok(())
    }

    async fn read(
        &self,
        partition: &str,
        key: &RequestKey,
    ) -> Result<Option<StoredResponse>, StoreError> {
        Ok(self
            .partitions
            .read()
            .get(partition)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn write(
        &self,
        partition: &str,
        key: RequestKey,
        response: StoredResponse,
    ) -> Result<(), StoreError> {
        self.partitions
            .write()
            .entry(partition.to_string())
            .or_default()
            .insert(key, response);
        Ok(())
    }

    async fn delete_entry(&self, partition: &str, key: &RequestKey) -> Result<bool, StoreError> {
        Ok(self
            .partitions
            .write()
            .get_mut(partition)
            .map(|entries| entries.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn list_entries(&self, partition: &str) -> Result<Vec<RequestKey>, StoreError> {
        Ok(self
            .partitions
            .read()
            .get(partition)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, StoreError> {
        Ok(self.partitions.write().remove(partition).is_some())
    }

    async fn list_partitions(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.partitions.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::SystemTime;

    fn entry(body: &str) -> StoredResponse {
        StoredResponse {
            status: 200,
            headers: vec![],
            body: Bytes::copy_from_slice(body.as_bytes()),
            stored_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn test_read_missing_partition_is_none() {
        let store = MemoryStore::new();
        let key = RequestKey::get("https://site.example/");
        assert!(store.read("nope", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_creates_partition_lazily() {
        let store = MemoryStore::new();
        let key = RequestKey::get("https://site.example/app.js");
        store.write("p", key.clone(), entry("x")).await.unwrap();
        assert!(store.list_partitions().await.unwrap().contains(&"p".to_string()));
        assert!(store.read("p", &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_entry() {
        let store = MemoryStore::new();
        let key = RequestKey::get("https://site.example/app.js");
        store.write("p", key.clone(), entry("old")).await.unwrap();
        store.write("p", key.clone(), entry("new")).await.unwrap();
        let got = store.read("p", &key).await.unwrap().unwrap();
        assert_eq!(got.body, Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let store = MemoryStore::new();
        store.open("p").await.unwrap();
        store
            .write("p", RequestKey::get("u"), entry("x"))
            .await
            .unwrap();
        store.open("p").await.unwrap();
        assert_eq!(store.entry_count("p"), 1);
    }

    #[tokio::test]
    async fn test_delete_partition_removes_all_entries() {
        let store = MemoryStore::new();
        store
            .write("p", RequestKey::get("a"), entry("1"))
            .await
            .unwrap();
        store
            .write("p", RequestKey::get("b"), entry("2"))
            .await
            .unwrap();
        assert!(store.delete_partition("p").await.unwrap());
        assert!(!store.delete_partition("p").await.unwrap());
        assert!(store.list_entries("p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_entry_reports_whether_key_existed() {
        let store = MemoryStore::new();
        let key = RequestKey::get("https://site.example/a");
        store.write("p", key.clone(), entry("1")).await.unwrap();
        assert!(store.delete_entry("p", &key).await.unwrap());
        assert!(!store.delete_entry("p", &key).await.unwrap());
    }
}
