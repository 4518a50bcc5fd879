//! MongoDB document-store backend.
//!
//! One collection per table, one document per record. Embedded records
//! nest in the document, so the version of a record embedding `Model` lives
//! at `model.version`. Every driver call is bounded by the storage's
//! per-operation timeout (10 s unless configured).

mod filter;
mod uri;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{StorageError, StorageResult};
use crate::record::introspect::{self, Stamp};
use crate::record::Record;
use crate::storage::{prepare_insert, Key, PrimaryKey, Storage};

pub use filter::{lower, operator_from_token, operator_token};
pub use uri::{connection_uri, DEFAULT_DATABASE};

/// Default bound on connection setup and on every operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Server error code for "collection already exists".
const NAMESPACE_EXISTS: i32 = 48;

#[derive(Clone, Debug)]
pub struct MongoStorage {
    db: Database,
    timeout: Duration,
}

impl MongoStorage {
    /// Connects and pings the server within [`DEFAULT_TIMEOUT`].
    ///
    /// `endpoint` may be a bare `host:port` or a full `mongodb://` /
    /// `mongodb+srv://` URI; credentials are added when both are set. An
    /// empty `database` selects [`DEFAULT_DATABASE`].
    pub async fn connect(
        endpoint: &str,
        user: &str,
        password: &str,
        database: &str,
    ) -> StorageResult<Self> {
        let uri = connection_uri(endpoint, user, password);
        let attempt = async {
            let client = Client::with_uri_str(&uri).await?;
            client
                .database("admin")
                .run_command(doc! { "ping": 1 }, None)
                .await?;
            Ok::<_, mongodb::error::Error>(client)
        };

        let client = match tokio::time::timeout(DEFAULT_TIMEOUT, attempt).await {
            Ok(Ok(client)) => client,
            Ok(Err(err)) => {
                error!(endpoint, error = %err, "mongodb connect failed");
                return Err(err.into());
            }
            Err(_) => {
                error!(endpoint, timeout = ?DEFAULT_TIMEOUT, "mongodb connect timed out");
                return Err(StorageError::Timeout(DEFAULT_TIMEOUT));
            }
        };

        let database = if database.is_empty() {
            DEFAULT_DATABASE
        } else {
            database
        };
        debug!(endpoint, database, "connected to mongodb");
        Ok(Self::from_database(client.database(database)))
    }

    /// Wraps an already configured database handle.
    pub fn from_database(db: Database) -> Self {
        Self {
            db,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the per-operation deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Drops the table's collection. Dropping a missing table succeeds.
    pub async fn drop_table<R: Record>(&self, table: Option<&str>) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        self.bounded(self.collection(&table).drop(None)).await
    }

    fn collection(&self, table: &str) -> Collection<Document> {
        self.db.collection(table)
    }

    async fn bounded<T, F>(&self, operation: F) -> StorageResult<T>
    where
        F: Future<Output = mongodb::error::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result.map_err(StorageError::from),
            Err(_) => Err(StorageError::Timeout(self.timeout)),
        }
    }

    async fn apply_save<R: Record>(
        &self,
        record: &mut R,
        table: &str,
        pk: &PrimaryKey,
        version_path: &str,
    ) -> StorageResult<()> {
        introspect::stamp(record, Stamp::Updated)?;
        let prior = introspect::bump_version(record)?;
        let prior = i64::try_from(prior).map_err(|_| StorageError::UnsupportedValueType)?;

        let mut query = key_filter(pk)?;
        query.insert(version_path, prior);

        let mut set = Document::new();
        for (path, value) in introspect::field_map(record)? {
            set.insert(path, to_bson(&value)?);
        }

        let result = self
            .bounded(
                self.collection(table)
                    .update_one(query, doc! { "$set": set }, None),
            )
            .await?;
        if result.matched_count == 0 {
            debug!(table, key = %pk, prior, "save precondition failed");
            return Err(StorageError::ExpiredValue);
        }
        Ok(())
    }
}

fn to_bson(value: &Value) -> StorageResult<Bson> {
    bson::to_bson(value).map_err(StorageError::serialization)
}

fn key_filter(pk: &PrimaryKey) -> StorageResult<Document> {
    let mut query = Document::new();
    query.insert(pk.hash.0.clone(), to_bson(&pk.hash.1)?);
    if let Some((name, value)) = &pk.range {
        query.insert(name.clone(), to_bson(value)?);
    }
    Ok(query)
}

fn decode<R: Record>(doc: Document) -> StorageResult<R> {
    bson::from_document(doc).map_err(StorageError::serialization)
}

fn is_namespace_exists(err: &StorageError) -> bool {
    match err {
        StorageError::Mongo(err) => {
            matches!(&*err.kind, ErrorKind::Command(command) if command.code == NAMESPACE_EXISTS)
        }
        _ => false,
    }
}

#[async_trait]
impl Storage for MongoStorage {
    async fn create_table<R: Record>(&self, table: Option<&str>) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        let (hash, range) = introspect::hash_and_range_key::<R>(true)?;

        match self.bounded(self.db.create_collection(&table, None)).await {
            Ok(()) => debug!(table = %table, "created collection"),
            Err(err) if is_namespace_exists(&err) => {
                warn!(table = %table, error = %err, "collection already exists")
            }
            Err(err) => return Err(err),
        }

        let mut keys = Document::new();
        keys.insert(hash, 1_i32);
        if let Some(range) = range {
            keys.insert(range, 1_i32);
        }
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.bounded(self.collection(&table).create_index(index, None))
            .await?;
        Ok(())
    }

    async fn create<R: Record>(&self, record: &R, table: Option<&str>) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        let row = prepare_insert(record)?;
        PrimaryKey::of(&row)?;
        let doc = bson::to_document(&row).map_err(StorageError::serialization)?;
        self.bounded(self.collection(&table).insert_one(doc, None))
            .await?;
        Ok(())
    }

    async fn delete<R: Record>(&self, table: Option<&str>, key: Key) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        let query = key_filter(&PrimaryKey::lookup::<R>(key)?)?;
        self.bounded(self.collection(&table).delete_one(query, None))
            .await?;
        Ok(())
    }

    async fn save<R: Record>(&self, record: &mut R, table: Option<&str>) -> StorageResult<()> {
        let table = introspect::resolve_table::<R>(table)?;
        let version_path =
            introspect::version_path::<R>().ok_or(StorageError::UnsupportedValueType)?;
        let pk = PrimaryKey::of(record)?;

        let original = record.clone();
        let result = self.apply_save(record, &table, &pk, version_path).await;
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
        let query = key_filter(&PrimaryKey::lookup::<R>(key)?)?;
        let found = self
            .bounded(self.collection(&table).find_one(query, None))
            .await?;
        *out = decode(found.ok_or(StorageError::NotFound)?)?;
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
        let query = match crate::filter::compile(expr, args)? {
            Some(expr) => lower(&expr)?,
            None => Document::new(),
        };
        let options = (limit > 0).then(|| FindOptions::builder().limit(limit).build());

        let cursor = self
            .bounded(self.collection(&table).find(query, options))
            .await?;
        let docs: Vec<Document> = self.bounded(cursor.try_collect()).await?;
        *out = docs
            .into_iter()
            .map(decode)
            .collect::<StorageResult<_>>()?;
        Ok(())
    }
}
