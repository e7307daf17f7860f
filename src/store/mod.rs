//! Partition storage abstraction
//!
//! This module defines the `PartitionStore` trait that strategy, lifecycle
//! and queue code program against, with two implementations:
//! - `MemoryStore`: deterministic in-memory store, also the test double
//! - `DiskStore`: persistent store, one directory per partition
//!
//! The store provides atomic per-key read/write only. Concurrent writers to
//! the same key resolve by last-write-wins; callers take no locks.

pub mod disk;
pub mod entry;
pub mod error;
pub mod memory;

pub use disk::DiskStore;
pub use entry::{RequestKey, StoredResponse};
pub use error::StoreError;
pub use memory::MemoryStore;

use async_trait::async_trait;

/// Storage-partition interface: open a partition by name, read/write/delete
/// by key, enumerate keys, delete whole partitions, list partition names.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Ensure the named partition exists. Idempotent.
    async fn open(&self, partition: &str) -> Result<(), StoreError>;

    /// Read an entry. A missing partition reads the same as a missing key.
    async fn read(
        &self,
        partition: &str,
        key: &RequestKey,
    ) -> Result<Option<StoredResponse>, StoreError>;

    /// Write an entry, creating the partition lazily if needed.
    /// Overwrites any existing entry for the key.
    async fn write(
        &self,
        partition: &str,
        key: RequestKey,
        response: StoredResponse,
    ) -> Result<(), StoreError>;

    /// Delete one entry. Returns true if the entry existed.
    async fn delete_entry(&self, partition: &str, key: &RequestKey) -> Result<bool, StoreError>;

    /// Enumerate the keys of all entries in a partition.
    /// A missing partition enumerates as empty.
    async fn list_entries(&self, partition: &str) -> Result<Vec<RequestKey>, StoreError>;

    /// Delete a whole partition. Returns true if it existed.
    async fn delete_partition(&self, partition: &str) -> Result<bool, StoreError>;

    /// List the names of all partitions currently in storage.
    async fn list_partitions(&self) -> Result<Vec<String>, StoreError>;
}
