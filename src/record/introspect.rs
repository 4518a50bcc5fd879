//! Introspector operations over a record's schema and serialized form.
//!
//! Everything here is pure: values are projected through `serde_json`, the
//! schema tells where each attribute lives.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::document::{get_path, set_path};
use crate::error::{StorageError, StorageResult};

use super::model::now_millis;
use super::{FlatAttribute, Kind, Record};

/// Storage path → attribute value, used as the `$set` payload of a save.
pub type FieldMap = BTreeMap<String, Value>;

/// Which `Model` timestamps to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    Created,
    Updated,
}

/// The record type's table name. The same name serves `Vec<R>` destinations.
pub fn table_name<R: Record>() -> StorageResult<String> {
    let name = R::schema().table_name();
    if name.is_empty() {
        return Err(StorageError::UnsupportedValueType);
    }
    Ok(name.to_string())
}

/// An explicit, non-empty table name wins over the derived one.
pub fn resolve_table<R: Record>(table: Option<&str>) -> StorageResult<String> {
    match table {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => table_name::<R>(),
    }
}

/// Storage names of the hash and range keys. With `use_tag` false the tag
/// names are ignored and lowercased identifiers are returned.
pub fn hash_and_range_key<R: Record>(use_tag: bool) -> StorageResult<(String, Option<String>)> {
    let schema = R::schema();
    let hash = schema.hash_key()?.name(use_tag).to_string();
    let range = schema
        .range_key()?
        .map(|attr| attr.name(use_tag).to_string());
    Ok((hash, range))
}

/// Live values of the hash and range keys.
pub fn hash_and_range_value<R: Record>(record: &R) -> StorageResult<(Value, Option<Value>)> {
    let schema = R::schema();
    let hash_key = schema.hash_key()?;
    let range_key = schema.range_key()?;
    let doc = to_document(record)?;

    let hash = match get_path(&doc, &hash_key.path) {
        Some(Value::Null) | None => return Err(StorageError::UnsupportedValueType),
        Some(value) => value.clone(),
    };
    let range = range_key.map(|attr| get_path(&doc, &attr.path).cloned().unwrap_or(Value::Null));
    Ok((hash, range))
}

/// Every leaf attribute except the hash and range keys.
pub fn field_map<R: Record>(record: &R) -> StorageResult<FieldMap> {
    let doc = to_document(record)?;
    Ok(R::schema()
        .leaves()
        .filter(|attr| !attr.is_key())
        .map(|attr| {
            let value = get_path(&doc, &attr.path).cloned().unwrap_or(Value::Null);
            (attr.path.clone(), value)
        })
        .collect())
}

/// Dotted storage path of the version attribute.
pub fn version_path<R: Record>() -> Option<&'static str> {
    R::schema().version_path()
}

/// Current version carried by the record.
pub fn version<R: Record>(record: &R) -> StorageResult<u64> {
    let path = version_path::<R>().ok_or(StorageError::UnsupportedValueType)?;
    let doc = to_document(record)?;
    read_version(&doc, path)
}

/// Populates unset attributes that carry a `default=` tag.
pub fn set_defaults<R: Record>(record: &mut R) -> StorageResult<()> {
    let schema = R::schema();
    let mut doc = to_document(record)?;
    let mut filled = None;

    for attr in schema.leaves() {
        let Some(literal) = &attr.tag.default else {
            continue;
        };
        if !needs_default(&attr.kind, get_path(&doc, &attr.path)) {
            continue;
        }
        let value = parse_default(attr, &attr.kind, literal)?;
        set_path(&mut doc, &attr.path, value);

        // Catches literals that parse but overflow the field, e.g. 300 for a u8.
        let parsed: R =
            serde_json::from_value(doc.clone()).map_err(|e| StorageError::InvalidDefault {
                attribute: attr.path.clone(),
                literal: literal.clone(),
                reason: e.to_string(),
            })?;
        filled = Some(parsed);
    }

    if let Some(parsed) = filled {
        *record = parsed;
    }
    Ok(())
}

/// Sets the version to prior + 1 and returns the prior version.
pub fn bump_version<R: Record>(record: &mut R) -> StorageResult<u64> {
    let path = version_path::<R>().ok_or(StorageError::UnsupportedValueType)?;
    let mut doc = to_document(record)?;
    let prior = read_version(&doc, path)?;
    let next = prior
        .checked_add(1)
        .ok_or(StorageError::UnsupportedValueType)?;
    set_path(&mut doc, path, Value::from(next));
    *record = serde_json::from_value(doc)?;
    Ok(prior)
}

/// Refreshes the embedded `Model` timestamps. No-op without a `Model`.
pub fn stamp<R: Record>(record: &mut R, stamp: Stamp) -> StorageResult<()> {
    let Some(model) = R::schema().model_path() else {
        return Ok(());
    };
    let mut doc = to_document(record)?;
    let now = Value::from(now_millis());

    let created_path = format!("{}.created_at", model);
    if stamp == Stamp::Created && is_unset(get_path(&doc, &created_path)) {
        set_path(&mut doc, &created_path, now.clone());
    }
    set_path(&mut doc, &format!("{}.updated_at", model), now);

    *record = serde_json::from_value(doc)?;
    Ok(())
}

/// Serializes a record; anything but a map is not a record.
pub fn to_document<R: Record>(record: &R) -> StorageResult<Value> {
    let doc = serde_json::to_value(record)?;
    if !doc.is_object() {
        return Err(StorageError::UnsupportedValueType);
    }
    Ok(doc)
}

fn read_version(doc: &Value, path: &str) -> StorageResult<u64> {
    match get_path(doc, path) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_u64().ok_or(StorageError::UnsupportedValueType),
    }
}

/// `None` is the only unset state of an optional attribute; `Some(0)` is set.
fn needs_default(kind: &Kind, value: Option<&Value>) -> bool {
    match kind {
        Kind::Optional(_) => matches!(value, None | Some(Value::Null)),
        _ => is_unset(value),
    }
}

/// Zero check for defaulting. An explicit zero reads as unset.
fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f == 0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
    }
}

fn parse_default(attr: &FlatAttribute, kind: &Kind, literal: &str) -> StorageResult<Value> {
    let invalid = |reason: String| StorageError::InvalidDefault {
        attribute: attr.path.clone(),
        literal: literal.to_string(),
        reason,
    };

    match kind {
        Kind::Int => literal
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| invalid(e.to_string())),
        Kind::Uint => literal
            .parse::<u64>()
            .map(Value::from)
            .map_err(|e| invalid(e.to_string())),
        Kind::Float => {
            let parsed = literal.parse::<f64>().map_err(|e| invalid(e.to_string()))?;
            Number::from_f64(parsed)
                .map(Value::Number)
                .ok_or_else(|| invalid("not a finite number".to_string()))
        }
        Kind::Bool => parse_bool(literal)
            .map(Value::Bool)
            .ok_or_else(|| invalid("invalid syntax".to_string())),
        Kind::String => Ok(Value::String(literal.to_string())),
        Kind::Optional(inner) => parse_default(attr, inner, literal),
        other => Err(invalid(format!(
            "unsupported default set field, kind: {}",
            other.name()
        ))),
    }
}

fn parse_bool(literal: &str) -> Option<bool> {
    match literal {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
