//! Cache storage trait and in-memory implementation.

// Author: kelexine (https://github.com/kelexine)

use super::models::{CacheKey, StoredResponse};
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Backend holding named cache partitions.
///
/// Every method is a single atomic read or write; callers never need
/// multi-key transactions.
pub trait CacheStorage: Send + Sync {
    /// Create an empty partition if it does not exist yet.
    fn open_partition(&self, partition: &str) -> Result<()>;

    /// Store a response, replacing any previous entry for the key.
    fn put(&self, partition: &str, key: &CacheKey, response: &StoredResponse) -> Result<()>;

    /// Look up a key in one partition.
    fn get(&self, partition: &str, key: &CacheKey) -> Result<Option<StoredResponse>>;

    /// Names of every partition currently held, sorted.
    fn partitions(&self) -> Result<Vec<String>>;

    /// Drop a partition and all its entries. Returns false if it did not exist.
    fn delete_partition(&self, partition: &str) -> Result<bool>;

    /// Number of entries in a partition (0 if missing).
    fn entry_count(&self, partition: &str) -> Result<usize>;

    /// Merged read across partitions: `preferred` are consulted first in
    /// the given order, then every other partition in name order.
    fn match_any(&self, key: &CacheKey, preferred: &[String]) -> Result<Option<StoredResponse>> {
        let existing = self.partitions()?;
        let ordered = preferred
            .iter()
            .filter(|name| existing.contains(name))
            .chain(existing.iter().filter(|name| !preferred.contains(name)));

        for partition in ordered {
            if let Some(found) = self.get(partition, key)? {
                debug!("Matched {} in partition {}", key, partition);
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Delete every partition. Returns how many were removed.
    fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for partition in self.partitions()? {
            if self.delete_partition(&partition)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

type Partition = HashMap<CacheKey, StoredResponse>;

/// Process-local storage. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
    partitions: RwLock<BTreeMap<String, Partition>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryStorage {
    fn open_partition(&self, partition: &str) -> Result<()> {
        self.partitions
            .write()
            .entry(partition.to_string())
            .or_default();
        Ok(())
    }

    fn put(&self, partition: &str, key: &CacheKey, response: &StoredResponse) -> Result<()> {
        self.partitions
            .write()
            .entry(partition.to_string())
            .or_default()
            .insert(key.clone(), response.clone());
        Ok(())
    }

    fn get(&self, partition: &str, key: &CacheKey) -> Result<Option<StoredResponse>> {
        Ok(self
            .partitions
            .read()
            .get(partition)
            .and_then(|p| p.get(key))
            .cloned())
    }

    fn partitions(&self) -> Result<Vec<String>> {
        Ok(self.partitions.read().keys().cloned().collect())
    }

    fn delete_partition(&self, partition: &str) -> Result<bool> {
        Ok(self.partitions.write().remove(partition).is_some())
    }

    fn entry_count(&self, partition: &str) -> Result<usize> {
        Ok(self
            .partitions
            .read()
            .get(partition)
            .map(|p| p.len())
            .unwrap_or(0))
    }
}
