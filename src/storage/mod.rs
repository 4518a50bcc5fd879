//! The storage contract and the backends that implement it.
//!
//! Every backend speaks the same six operations. Table names default to the
//! record type's name when `None` (or an empty string) is passed.

mod any;
mod memory;
mod table;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StorageError, StorageResult};
use crate::record::introspect::{self, Stamp};
use crate::record::Record;

pub use any::{open, AnyStorage};
pub use memory::MemoryStorage;
pub use table::{Table, TablesExt};

/// Primary-key values for `first` and `delete`.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub hash: Value,
    pub range: Option<Value>,
}

impl Key {
    pub fn new(hash: impl Into<Value>) -> Self {
        Key {
            hash: hash.into(),
            range: None,
        }
    }

    /// Adds the range component for two-key tables.
    pub fn range(mut self, range: impl Into<Value>) -> Self {
        self.range = Some(range.into());
        self
    }
}

/// Uniform CRUD-plus-query surface over a backing store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Materializes the table with a unique index on the primary key.
    /// Calling it for an existing table is not an error.
    async fn create_table<R: Record>(&self, table: Option<&str>) -> StorageResult<()>;

    /// Inserts a new row after applying `default=` values. The stored
    /// version is the carried version plus one.
    async fn create<R: Record>(&self, record: &R, table: Option<&str>) -> StorageResult<()>;

    /// Removes a row by primary key. An absent row is not an error.
    async fn delete<R: Record>(&self, table: Option<&str>, key: Key) -> StorageResult<()>;

    /// Optimistic update. Matches the row on primary key and the record's
    /// current version, writes every non-key attribute and bumps the
    /// version. A stale record yields [`StorageError::ExpiredValue`] and is
    /// left as it was.
    async fn save<R: Record>(&self, record: &mut R, table: Option<&str>) -> StorageResult<()>;

    /// Reads one row into `out`, or [`StorageError::NotFound`].
    async fn first<R: Record>(&self, out: &mut R, table: Option<&str>, key: Key)
        -> StorageResult<()>;

    /// Replaces the contents of `out` with the rows matching `expr`.
    /// `limit <= 0` is unlimited; a blank `expr` matches every row.
    async fn find<R: Record>(
        &self,
        out: &mut Vec<R>,
        table: Option<&str>,
        limit: i64,
        expr: &str,
        args: &[Value],
    ) -> StorageResult<()>;
}

/// Storage paths and values of a primary key.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PrimaryKey {
    pub hash: (String, Value),
    pub range: Option<(String, Value)>,
}

impl PrimaryKey {
    /// Resolves caller-supplied key values against the record's schema.
    pub(crate) fn lookup<R: Record>(key: Key) -> StorageResult<Self> {
        let (hash_name, range_name) = introspect::hash_and_range_key::<R>(true)?;
        let range = match (range_name, key.range) {
            (Some(name), Some(value)) => Some((name, value)),
            (Some(_), None) => return Err(StorageError::MissingRangeValue),
            (None, _) => None,
        };
        Ok(PrimaryKey {
            hash: (hash_name, key.hash),
            range,
        })
    }

    /// Reads the key values out of a record.
    pub(crate) fn of<R: Record>(record: &R) -> StorageResult<Self> {
        let (hash_name, range_name) = introspect::hash_and_range_key::<R>(true)?;
        let (hash, range) = introspect::hash_and_range_value(record)?;
        Ok(PrimaryKey {
            hash: (hash_name, hash),
            range: range_name.zip(range),
        })
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.hash.0, self.hash.1)?;
        if let Some((name, value)) = &self.range {
            write!(f, ", {}={}", name, value)?;
        }
        Ok(())
    }
}

/// The row `create` writes: defaults applied, timestamps stamped and the
/// version advanced. The caller's record is not touched.
pub(crate) fn prepare_insert<R: Record>(record: &R) -> StorageResult<R> {
    let mut row = record.clone();
    introspect::set_defaults(&mut row)?;
    introspect::stamp(&mut row, Stamp::Created)?;
    if introspect::version_path::<R>().is_some() {
        introspect::bump_version(&mut row)?;
    }
    Ok(row)
}
