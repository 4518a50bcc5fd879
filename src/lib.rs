//! Typed record persistence over interchangeable backends.
//!
//! Records describe their own table layout through `#[derive(Record)]`:
//! table name, hash and range keys, defaults and the version attribute used
//! for optimistic concurrency. Every backend implements the same
//! [`Storage`] contract, and `find` takes a small filter language compiled
//! per backend.

#[allow(unused_extern_crates)]
extern crate self as storekit;

pub mod config;
pub mod document;
pub mod error;
pub mod filter;
#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod record;
pub mod storage;

pub use config::{StorageConfig, StorageType};
pub use error::{FilterError, StorageError, StorageResult};
pub use record::{AttributeDescriptor, Kind, Model, Record, Schema, TypeDescriptor};
pub use storage::{open, AnyStorage, Key, MemoryStorage, Storage, Table, TablesExt};

#[cfg(feature = "mongodb")]
pub use mongo::MongoStorage;

pub use storekit_macros::Record;
