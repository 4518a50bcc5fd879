//! Runtime-selected storage backend.
//!
//! [`AnyStorage`] wraps every backend built into this crate so the backend
//! can be picked from configuration while callers keep static dispatch.
//!
//! ```
//! use storekit::{open, StorageConfig};
//!
//! # async fn example() -> storekit::StorageResult<()> {
//! let storage = open(&StorageConfig::memory()).await?;
//! assert!(storage.is_memory());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Key, MemoryStorage, Storage};
use crate::config::{StorageConfig, StorageType};
use crate::error::{StorageError, StorageResult};
#[cfg(feature = "mongodb")]
use crate::mongo::MongoStorage;
use crate::record::Record;

#[derive(Clone)]
pub enum AnyStorage {
    Memory(MemoryStorage),
    #[cfg(feature = "mongodb")]
    Mongo(MongoStorage),
}

impl AnyStorage {
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryStorage::new())
    }

    #[must_use]
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }
}

/// Builds the backend named by `config.storage_type`.
pub async fn open(config: &StorageConfig) -> StorageResult<AnyStorage> {
    debug!(storage_type = %config.storage_type, "opening storage");
    match config.storage_type {
        StorageType::Memory => Ok(AnyStorage::Memory(MemoryStorage::bounded(
            config.max_length,
            config.tick_interval(),
        ))),
        #[cfg(feature = "mongodb")]
        StorageType::MongoDb => {
            let storage = MongoStorage::connect(
                &config.endpoint,
                &config.user,
                &config.password,
                &config.database,
            )
            .await?;
            Ok(AnyStorage::Mongo(storage))
        }
        other => Err(StorageError::UnsupportedBackend(other.to_string())),
    }
}

#[async_trait]
impl Storage for AnyStorage {
    async fn create_table<R: Record>(&self, table: Option<&str>) -> StorageResult<()> {
        match self {
            Self::Memory(s) => s.create_table::<R>(table).await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(s) => s.create_table::<R>(table).await,
        }
    }

    async fn create<R: Record>(&self, record: &R, table: Option<&str>) -> StorageResult<()> {
        match self {
            Self::Memory(s) => s.create(record, table).await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(s) => s.create(record, table).await,
        }
    }

    async fn delete<R: Record>(&self, table: Option<&str>, key: Key) -> StorageResult<()> {
        match self {
            Self::Memory(s) => s.delete::<R>(table, key).await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(s) => s.delete::<R>(table, key).await,
        }
    }

    async fn save<R: Record>(&self, record: &mut R, table: Option<&str>) -> StorageResult<()> {
        match self {
            Self::Memory(s) => s.save(record, table).await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(s) => s.save(record, table).await,
        }
    }

    async fn first<R: Record>(
        &self,
        out: &mut R,
        table: Option<&str>,
        key: Key,
    ) -> StorageResult<()> {
        match self {
            Self::Memory(s) => s.first(out, table, key).await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(s) => s.first(out, table, key).await,
        }
    }

    async fn find<R: Record>(
        &self,
        out: &mut Vec<R>,
        table: Option<&str>,
        limit: i64,
        expr: &str,
        args: &[Value],
    ) -> StorageResult<()> {
        match self {
            Self::Memory(s) => s.find(out, table, limit, expr, args).await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(s) => s.find(out, table, limit, expr, args).await,
        }
    }
}
