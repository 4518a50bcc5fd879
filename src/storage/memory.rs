//! MemoryStorage - HashMap-backed storage for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{prepare_insert, Key, PrimaryKey, Storage};
use crate::document::{get_path, set_path};
use crate::error::{StorageError, StorageResult};
use crate::filter;
use crate::record::introspect::{self, Stamp};
use crate::record::Record;

/// A stored document plus its insertion sequence, used for eviction order.
struct Row {
    seq: u64,
    doc: Value,
}

#[derive(Default)]
struct MemTable {
    rows: HashMap<String, Row>,
    next_seq: u64,
}

impl MemTable {
    fn insert(&mut self, key: String, doc: Value) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.rows.insert(key, Row { seq, doc });
    }

    /// Drops the oldest rows until at most `max_length` remain.
    fn evict(&mut self, max_length: usize) -> usize {
        if max_length == 0 || self.rows.len() <= max_length {
            return 0;
        }
        let excess = self.rows.len() - max_length;
        let mut by_age: Vec<(u64, String)> = self
            .rows
            .iter()
            .map(|(key, row)| (row.seq, key.clone()))
            .collect();
        by_age.sort_unstable();
        for (_, key) in by_age.into_iter().take(excess) {
            self.rows.remove(&key);
        }
        excess
    }

    /// Rows in insertion order.
    fn ordered(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self.rows.values().collect();
        rows.sort_unstable_by_key(|row| row.seq);
        rows
    }
}

type Tables = Arc<RwLock<HashMap<String, MemTable>>>;

/// In-memory storage keeping one JSON document per row.
///
/// Rows are keyed by the encoded primary key. With a `max_length` each table
/// keeps only its newest rows: oldest rows are evicted right after an insert,
/// or by a background sweeper every `tick` when one is configured.
/// Clone-friendly via Arc.
#[derive(Clone)]
pub struct MemoryStorage {
    tables: Tables,
    max_length: usize,
    evict_inline: bool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Create a new, unbounded storage.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            max_length: 0,
            evict_inline: false,
        }
    }

    /// Caps every table at `max_length` rows (0 = unlimited).
    ///
    /// A zero `tick` evicts inline after each insert. Otherwise a sweeper
    /// task is spawned on the current tokio runtime and stops once every
    /// clone of the storage is dropped. Without a runtime eviction falls
    /// back to inline.
    pub fn bounded(max_length: usize, tick: Duration) -> Self {
        let mut storage = Self::new();
        storage.max_length = max_length;
        if max_length == 0 {
            return storage;
        }

        if tick.is_zero() {
            storage.evict_inline = true;
            return storage;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(sweep(Arc::downgrade(&storage.tables), max_length, tick));
            }
            Err(_) => {
                debug!(max_length, "no tokio runtime, evicting inline");
                storage.evict_inline = true;
            }
        }
        storage
    }

    /// Number of rows currently held by `table`.
    pub fn row_count(&self, table: &str) -> StorageResult<usize> {
        let tables = self.tables.read().map_err(|_| StorageError::Lock("row_count"))?;
        Ok(tables.get(table).map_or(0, |t| t.rows.len()))
    }

    fn encode_key(pk: &PrimaryKey) -> String {
        match &pk.range {
            Some((_, range)) => format!("{}\u{1f}{}", pk.hash.1, range),
            None => pk.hash.1.to_string(),
        }
    }

    fn ensure_table(&self, table: &str) -> StorageResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::Lock("create_table"))?;
        if !tables.contains_key(table) {
            tables.insert(table.to_string(), MemTable::default());
            debug!(table, "created table");
        }
        Ok(())
    }

    fn insert_row(&self, table: &str, pk: &PrimaryKey, doc: Value) -> StorageResult<()> {
        let key = Self::encode_key(pk);
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::Lock("create"))?;
        let rows = tables.entry(table.to_string()).or_default();

        if rows.rows.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                table: table.to_string(),
                key: pk.to_string(),
            });
        }

        rows.insert(key, doc);
        if self.evict_inline {
            rows.evict(self.max_length);
        }
        Ok(())
    }

    fn remove_row(&self, table: &str, pk: &PrimaryKey) -> StorageResult<()> {
        let key = Self::encode_key(pk);
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::Lock("delete"))?;
        if let Some(rows) = tables.get_mut(table) {
            rows.rows.remove(&key);
        }
        Ok(())
    }

    /// Merges `fields` into the row if its stored version is still `prior`.
    fn update_row(
        &self,
        table: &str,
        pk: &PrimaryKey,
        version_path: &str,
        prior: u64,
        fields: introspect::FieldMap,
    ) -> StorageResult<()> {
        let key = Self::encode_key(pk);
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::Lock("save"))?;

        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.rows.get_mut(&key))
            .filter(|row| get_path(&row.doc, version_path).and_then(Value::as_u64) == Some(prior));
        let Some(row) = row else {
            debug!(table, key = %pk, prior, "save precondition failed");
            return Err(StorageError::ExpiredValue);
        };

        for (path, value) in fields {
            set_path(&mut row.doc, &path, value);
        }
        Ok(())
    }

    fn apply_save<R: Record>(
        &self,
        record: &mut R,
        table: &str,
        pk: &PrimaryKey,
        version_path: &str,
    ) -> StorageResult<()> {
        introspect::stamp(record, Stamp::Updated)?;
        let prior = introspect::bump_version(record)?;
        let fields = introspect::field_map(record)?;
        self.update_row(table, pk, version_path, prior, fields)
    }

    fn read_row(&self, table: &str, pk: &PrimaryKey) -> StorageResult<Option<Value>> {
        let key = Self::encode_key(pk);
        let tables = self.tables.read().map_err(|_| StorageError::Lock("first"))?;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.rows.get(&key))
            .map(|row| row.doc.clone()))
    }

    fn scan(
        &self,
        table: &str,
        limit: i64,
        filter: Option<&filter::Expr>,
    ) -> StorageResult<Vec<Value>> {
        let tables = self.tables.read().map_err(|_| StorageError::Lock("find"))?;
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let cap = if limit > 0 { limit as usize } else { usize::MAX };
        Ok(rows
            .ordered()
            .into_iter()
            .filter(|row| filter.map_or(true, |expr| expr.matches(&row.doc)))
            .take(cap)
            .map(|row| row.doc.clone())
            .collect())
    }
}

async fn sweep(tables: Weak<RwLock<HashMap<String, MemTable>>>, max_length: usize, tick: Duration) {
    let mut ticker = tokio::time::interval(tick);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(live) = tables.upgrade() else {
            debug!("memory storage dropped, sweeper exiting");
            break;
        };
        if sweep_once(&live, max_length).is_err() {
            break;
        }
    }
}

fn sweep_once(tables: &RwLock<HashMap<String, MemTable>>, max_length: usize) -> StorageResult<()> {
    let mut tables = tables.write().map_err(|_| StorageError::Lock("sweep"))?;
    for (name, rows) in tables.iter_mut() {
        let evicted = rows.evict(max_length);
        if evicted > 0 {
            debug!(table = %name, evicted, "swept table");
        }
    }
    Ok(())
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_table<R: Record>(&self, table: Option<&str>) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        introspect::hash_and_range_key::<R>(true)?;
        self.ensure_table(&table)
    }

    async fn create<R: Record>(&self, record: &R, table: Option<&str>) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        let row = prepare_insert(record)?;
        let pk = PrimaryKey::of(&row)?;
        let doc = introspect::to_document(&row)?;
        self.insert_row(&table, &pk, doc)
    }

    async fn delete<R: Record>(&self, table: Option<&str>, key: Key) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        let pk = PrimaryKey::lookup::<R>(key)?;
        self.remove_row(&table, &pk)
    }

    async fn save<R: Record>(&self, record: &mut R, table: Option<&str>) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        let version_path =
            introspect::version_path::<R>().ok_or(StorageError::UnsupportedValueType)?;
        let pk = PrimaryKey::of(record)?;

        let original = record.clone();
        let result = self.apply_save(record, &table, &pk, version_path);
        if result.is_err() {
            *record = original;
        }
        result
    }

    async fn first<R: Record>(
        &self,
        out: &mut R,
        table: Option<&str>,
        key: Key,
    ) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        let pk = PrimaryKey::lookup::<R>(key)?;
        let doc = self.read_row(&table, &pk)?.ok_or(StorageError::NotFound)?;
        *out = serde_json::from_value(doc)?;
        Ok(())
    }

    async fn find<R: Record>(
        &self,
        out: &mut Vec<R>,
        table: Option<&str>,
        limit: i64,
        expr: &str,
        args: &[Value],
    ) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        let filter = filter::compile(expr, args)?;
        let docs = self.scan(&table, limit, filter.as_ref())?;
        *out = docs
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;
        Ok(())
    }
}
