//! Disk-backed partition store
//!
//! One directory per partition under a root cache directory. Each entry is a
//! pair of files named by the SHA-256 of the request key: a `.meta.json`
//! sidecar holding the key and response metadata, and a `.body` file holding
//! the raw body bytes. The body is written before the sidecar, so a crash
//! mid-write never leaves a sidecar pointing at a missing body.
//!
//! Partition names must be path-safe; the registry's `<site>-<role>-<version>`
//! layout satisfies this as long as site and version avoid path separators.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::entry::{RequestKey, StoredResponse};
use super::error::StoreError;
use super::PartitionStore;

const META_SUFFIX: &str = ".meta.json";
const BODY_SUFFIX: &str = ".body";

/// Sidecar metadata persisted next to each body file.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    method: String,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    stored_at: SystemTime,
}

/// Disk-backed `PartitionStore` implementation over `tokio::fs`.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn partition_dir(&self, partition: &str) -> PathBuf {
        self.root.join(partition)
    }

    fn entry_stem(key: &RequestKey) -> String {
        let digest = Sha256::digest(key.to_string().as_bytes());
        hex::encode(digest)
    }

    fn meta_path(&self, partition: &str, key: &RequestKey) -> PathBuf {
        self.partition_dir(partition)
            .join(format!("{}{}", Self::entry_stem(key), META_SUFFIX))
    }

    fn body_path(&self, partition: &str, key: &RequestKey) -> PathBuf {
        self.partition_dir(partition)
            .join(format!("{}{}", Self::entry_stem(key), BODY_SUFFIX))
    }
}

/// Read a file, mapping "not found" to None.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl PartitionStore for DiskStore {
    async fn open(&self, partition: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(self.partition_dir(partition)).await?;
        Ok(())
    }

    async fn read(
        &self,
        partition: &str,
        key: &RequestKey,
    ) -> Result<Option<StoredResponse>, StoreError> {
        let Some(meta_bytes) = read_optional(&self.meta_path(partition, key)).await? else {
            return Ok(None);
        };
        let meta: EntryMeta = serde_json::from_slice(&meta_bytes)?;
        let Some(body) = read_optional(&self.body_path(partition, key)).await? else {
            // Sidecar without body: treat as a miss rather than an error.
            return Ok(None);
        };
        Ok(Some(StoredResponse {
            status: meta.status,
            headers: meta.headers,
            body: Bytes::from(body),
            stored_at: meta.stored_at,
        }))
    }

    async fn write(
        &self,
        partition: &str,
        key: RequestKey,
        response: StoredResponse,
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(self.partition_dir(partition)).await?;
        let meta = EntryMeta {
            method: key.method.clone(),
            url: key.url.clone(),
            status: response.status,
            headers: response.headers.clone(),
            stored_at: response.stored_at,
        };
        // Body first, sidecar last.
        tokio::fs::write(self.body_path(partition, &key), &response.body).await?;
        tokio::fs::write(
            self.meta_path(partition, &key),
            serde_json::to_vec(&meta)?,
        )
        .await?;
        Ok(())
    }

    async fn delete_entry(&self, partition: &str, key: &RequestKey) -> Result<bool, StoreError> {
        let meta_path = self.meta_path(partition, key);
        let existed = match tokio::fs::remove_file(&meta_path).await {
            Ok(()) => true,
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };
        match tokio::fs::remove_file(self.body_path(partition, key)).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(existed)
    }

    async fn list_entries(&self, partition: &str) -> Result<Vec<RequestKey>, StoreError> {
        let dir = self.partition_dir(partition);
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut keys = Vec::new();
        while let Some(dirent) = reader.next_entry().await? {
            let name = dirent.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.ends_with(META_SUFFIX) {
                continue;
            }
            let meta_bytes = tokio::fs::read(dirent.path()).await?;
            let meta: EntryMeta = serde_json::from_slice(&meta_bytes)?;
            keys.push(RequestKey {
                method: meta.method,
                url: meta.url,
            });
        }
        Ok(keys)
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_dir_all(self.partition_dir(partition)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_partitions(&self) -> Result<Vec<String>, StoreError> {
        let mut reader = match tokio::fs::read_dir(&self.root).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut names = Vec::new();
        while let Some(dirent) = reader.next_entry().await? {
            if dirent.file_type().await?.is_dir() {
                if let Some(name) = dirent.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: u16, body: &str) -> StoredResponse {
        StoredResponse {
            status,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: Bytes::copy_from_slice(body.as_bytes()),
            stored_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn test_write_then_read_round_trips_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        let key = RequestKey::get("https://site.example/models/fault-model.json");
        store
            .write("site-models-v1", key.clone(), entry(200, "weights"))
            .await
            .unwrap();

        let got = store.read("site-models-v1", &key).await.unwrap().unwrap();
        assert_eq!(got.status, 200);
        assert_eq!(got.body, Bytes::from_static(b"weights"));
        assert_eq!(got.headers.len(), 1);
    }

    #[tokio::test]
    async fn test_read_from_missing_root_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().join("never-created"));
        let key = RequestKey::get("https://site.example/");
        assert!(store.read("p", &key).await.unwrap().is_none());
        assert!(store.list_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_entries_recovers_original_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        let key = RequestKey::new(
            &http::Method::POST,
            "https://site.example/api/quotes?ref=offline",
        );
        store.write("p", key.clone(), entry(200, "{}")).await.unwrap();

        let keys = store.list_entries("p").await.unwrap();
        assert_eq!(keys, vec![key]);
    }

    #[tokio::test]
    async fn test_delete_partition_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        store
            .write("site-static-v1", RequestKey::get("a"), entry(200, "1"))
            .await
            .unwrap();

        assert!(store.delete_partition("site-static-v1").await.unwrap());
        assert!(!store.delete_partition("site-static-v1").await.unwrap());
        assert!(store.list_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_creates_empty_listable_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        store.open("site-api-v1").await.unwrap();
        let names = store.list_partitions().await.unwrap();
        assert_eq!(names, vec!["site-api-v1".to_string()]);
    }
}
