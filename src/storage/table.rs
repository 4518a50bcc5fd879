//! Table - Typed accessor for one record type's table.

use std::marker::PhantomData;

use serde_json::Value;

use super::{Key, Storage};
use crate::error::{StorageError, StorageResult};
use crate::record::Record;

/// Typed handle binding a storage to a record type and, optionally, an
/// explicit table name.
///
/// Provides short method names by delegating to [`Storage`].
pub struct Table<'a, S, R> {
    storage: &'a S,
    name: Option<String>,
    _marker: PhantomData<R>,
}

impl<'a, S: Storage, R: Record> Table<'a, S, R> {
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            name: None,
            _marker: PhantomData,
        }
    }

    /// Use `name` instead of the type-derived table name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub async fn create_table(&self) -> StorageResult<()> {
        self.storage.create_table::<R>(self.name()).await
    }

    pub async fn create(&self, record: &R) -> StorageResult<()> {
        self.storage.create(record, self.name()).await
    }

    pub async fn delete(&self, key: Key) -> StorageResult<()> {
        self.storage.delete::<R>(self.name(), key).await
    }

    pub async fn save(&self, record: &mut R) -> StorageResult<()> {
        self.storage.save(record, self.name()).await
    }

    /// Fetch one record. Returns None if not found.
    pub async fn get(&self, key: Key) -> StorageResult<Option<R>>
    where
        R: Default,
    {
        let mut out = R::default();
        match self.storage.first(&mut out, self.name(), key).await {
            Ok(()) => Ok(Some(out)),
            Err(StorageError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn find(&self, limit: i64, expr: &str, args: &[Value]) -> StorageResult<Vec<R>> {
        let mut out = Vec::new();
        self.storage
            .find(&mut out, self.name(), limit, expr, args)
            .await?;
        Ok(out)
    }

    /// Every row of the table.
    pub async fn all(&self) -> StorageResult<Vec<R>> {
        self.find(0, "", &[]).await
    }
}

/// Extension trait for typed table access on any [`Storage`].
pub trait TablesExt: Storage + Sized {
    fn table<R: Record>(&self) -> Table<'_, Self, R> {
        Table::new(self)
    }
}

impl<S: Storage> TablesExt for S {}
