//! Cache partition registry
//!
//! Cache partitions are named, versioned stores of cached responses. At most
//! one partition per logical role is current at any time; activation deletes
//! everything outside the current set. The persisted naming layout
//! `<site>-<role>-<version>` must stay stable across deploys, otherwise
//! cleanup cannot recognize its own partitions.
//!
//! The offline-data partition is not a cache: it holds staged mutations that
//! must survive until replayed, so its name carries no version tag and it is
//! never rolled over.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Logical role of a versioned cache partition.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionRole {
    /// Pre-warmed application shell assets
    Static,
    /// Pages and navigations cached on demand
    Dynamic,
    /// Pre-warmed model/binary assets (cache-first territory)
    Models,
    /// API responses cached as network-first fallback
    Api,
}

impl PartitionRole {
    /// All cache roles, in a fixed order. Activation keeps exactly one
    /// partition per entry in this list, plus the offline-data partition.
    pub const ALL: [PartitionRole; 4] = [
        PartitionRole::Static,
        PartitionRole::Dynamic,
        PartitionRole::Models,
        PartitionRole::Api,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionRole::Static => "static",
            PartitionRole::Dynamic => "dynamic",
            PartitionRole::Models => "models",
            PartitionRole::Api => "api",
        }
    }
}

impl std::fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the cache partition name for a role under a given site and
/// version. Pure and collision-free across roles: role strings are distinct
/// and the layout is fixed.
pub fn partition_name(site: &str, role: PartitionRole, version: &str) -> String {
    format!("{}-{}-{}", site, role.as_str(), version)
}

/// Name of the offline-data partition holding staged mutations. Unversioned:
/// a record is deleted only when its replay succeeds, never by rollover.
pub fn offline_data_partition(site: &str) -> String {
    format!("{}-offline-data", site)
}

/// The complete set of partition names that must survive activation for the
/// given version. Any partition found in storage outside this set is stale.
pub fn current_partition_names(site: &str, version: &str) -> HashSet<String> {
    PartitionRole::ALL
        .iter()
        .map(|role| partition_name(site, *role, version))
        .chain(std::iter::once(offline_data_partition(site)))
        .collect()
}
