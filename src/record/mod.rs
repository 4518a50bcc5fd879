//! Records - typed values persisted one row per value.
//!
//! A record type carries a static [`TypeDescriptor`] listing its attributes
//! and their tags. The descriptor is what the introspector walks to derive
//! the table name, primary key, version path and defaults; it is normally
//! generated by `#[derive(Record)]`.
//!
//! ## Example
//!
//! ```ignore
//! use storekit::{Model, Record};
//!
//! #[derive(Clone, Serialize, Deserialize, Record)]
//! struct Student {
//!     #[record(embed)]
//!     #[serde(default)]
//!     pub model: Model,
//!     #[record(hash)]
//!     pub id: String,
//!     pub age: i32,
//!     #[record(default = "0.1")]
//!     pub score: f32,
//! }
//!
//! let schema = Student::schema();
//! assert_eq!(schema.table_name(), "Student");
//! assert_eq!(schema.version_path(), Some("model.version"));
//! ```

pub mod introspect;
mod model;
mod schema;
mod tag;

use serde::{de::DeserializeOwned, Serialize};

pub use model::Model;
pub use schema::{FlatAttribute, Schema};
pub use tag::{Role, Tag};

/// Trait for types that can be stored as rows.
///
/// Implementations must serialize to a map whose keys are the attributes'
/// storage names; the derive checks this against serde's field names.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Static description of the record's attributes.
    fn descriptor() -> &'static TypeDescriptor;

    /// The flattened schema, built once from [`descriptor`](Record::descriptor).
    fn schema() -> &'static Schema;
}

/// Compile-time description of a record type.
#[derive(Debug)]
pub struct TypeDescriptor {
    /// Type identifier without module path.
    pub name: &'static str,
    /// Table name override.
    pub table: Option<&'static str>,
    pub attributes: &'static [AttributeDescriptor],
}

/// One declared attribute of a record type.
#[derive(Debug)]
pub struct AttributeDescriptor {
    /// Rust identifier of the field.
    pub ident: &'static str,
    /// Raw tag, `name? ("," role_or_option)*`.
    pub tag: &'static str,
    pub kind: Kind,
}

/// Value kind of an attribute, as far as defaulting and versioning care.
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Optional(&'static Kind),
    Sequence,
    Map,
    /// An embedded record whose attributes are flattened into the parent.
    Embedded(fn() -> &'static TypeDescriptor),
    Other,
}

impl Kind {
    pub fn is_embedded(&self) -> bool {
        matches!(self, Kind::Embedded(_))
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Optional(_) => "option",
            Kind::Sequence => "sequence",
            Kind::Map => "map",
            Kind::Embedded(_) => "embedded",
            Kind::Other => "other",
        }
    }
}
