// Cache partition storage module
// Author: kelexine (https://github.com/kelexine)

pub mod models;
pub mod sqlite;
pub mod storage;

pub use models::{CacheKey, EdgeRequest, ResponseSource, StoredResponse, CACHE_STATUS_HEADER};
pub use sqlite::SqliteStorage;
pub use storage::{CacheStorage, MemoryStorage};

use crate::config::{CacheConfig, StorageBackend};
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Build the storage backend selected in configuration.
pub fn open_storage(config: &CacheConfig) -> Result<Arc<dyn CacheStorage>> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory cache partitions");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageBackend::Sqlite => {
            info!("Using SQLite cache partitions at {}", config.sqlite_path);
            Ok(Arc::new(SqliteStorage::open(&config.sqlite_path)?))
        }
    }
}
