//! Storage configuration recognized by [`open`](crate::open).
//!
//! Reading it from files or the environment is left to the caller; the
//! record deserializes from any serde format.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backend selector. Unknown names select [`StorageType::Memory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageType {
    #[default]
    Memory,
    DynamoDb,
    MongoDb,
}

impl StorageType {
    /// Case-insensitive; anything unrecognized is memory.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "dynamodb" => StorageType::DynamoDb,
            "mongodb" => StorageType::MongoDb,
            _ => StorageType::Memory,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageType::Memory => "memory",
            StorageType::DynamoDb => "dynamodb",
            StorageType::MongoDb => "mongodb",
        }
    }
}

impl From<String> for StorageType {
    fn from(name: String) -> Self {
        StorageType::parse(&name)
    }
}

impl From<StorageType> for String {
    fn from(kind: StorageType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend selection plus connection and capacity settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub storage_type: StorageType,

    /// URL or `host:port` of the backend.
    pub endpoint: String,

    /// Wide-column region; unused by the backends built here.
    pub region: String,

    /// Document-store database; empty means `"data"`.
    pub database: String,

    pub user: String,

    #[serde(skip_serializing)]
    pub password: String,

    /// Per-table row cap of the memory backend (0 = unlimited).
    pub max_length: usize,

    /// Memory backend sweep cadence in milliseconds (0 = evict inline).
    pub tick: u64,
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick)
    }
}
