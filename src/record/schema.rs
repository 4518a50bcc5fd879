//! Schema - the flattened view of a record type.

use crate::error::{StorageError, StorageResult};

use super::{Kind, Model, Record, Role, Tag, TypeDescriptor};

/// An attribute after embedded records have been flattened.
#[derive(Debug, Clone)]
pub struct FlatAttribute {
    /// Dot-separated storage path, tag names winning over identifiers.
    pub path: String,
    /// Dot-separated path of lowercased identifiers, ignoring tag names.
    pub ident_path: String,
    pub tag: Tag,
    pub kind: Kind,
    /// Embedding depth; 0 for the record's own attributes.
    pub depth: usize,
}

impl FlatAttribute {
    pub fn is_leaf(&self) -> bool {
        !self.kind.is_embedded()
    }

    pub fn is_key(&self) -> bool {
        self.tag.is_key()
    }

    /// Storage path, or the identifier path when `use_tag` is false.
    pub fn name(&self, use_tag: bool) -> &str {
        if use_tag {
            &self.path
        } else {
            &self.ident_path
        }
    }
}

/// Table name, keys, attributes and version location derived from a
/// [`TypeDescriptor`] graph.
#[derive(Debug, Clone)]
pub struct Schema {
    type_name: &'static str,
    table_name: String,
    attributes: Vec<FlatAttribute>,
    version: Option<usize>,
    model_path: Option<String>,
}

impl Schema {
    pub fn of<R: Record>() -> &'static Schema {
        R::schema()
    }

    /// Walks the descriptor and every embedded descriptor below it.
    pub fn build(descriptor: &'static TypeDescriptor) -> Schema {
        let mut attributes = Vec::new();
        let mut model_path = None;
        flatten(descriptor, "", "", 0, &mut attributes, &mut model_path);

        let version = attributes
            .iter()
            .enumerate()
            .filter(|(_, attr)| is_version(attr))
            .min_by_key(|(_, attr)| attr.depth)
            .map(|(index, _)| index);

        Schema {
            type_name: descriptor.name,
            table_name: descriptor.table.unwrap_or(descriptor.name).to_string(),
            attributes,
            version,
            model_path,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// All flattened attributes in declaration order, embedded records
    /// included ahead of their children.
    pub fn attributes(&self) -> &[FlatAttribute] {
        &self.attributes
    }

    /// Attributes that hold values (everything but embedded records).
    pub fn leaves(&self) -> impl Iterator<Item = &FlatAttribute> {
        self.attributes.iter().filter(|attr| attr.is_leaf())
    }

    /// The single hash-tagged attribute.
    pub fn hash_key(&self) -> StorageResult<&FlatAttribute> {
        let mut keys = self.keys(Role::Hash);
        match (keys.next(), keys.next()) {
            (Some(key), None) => Ok(key),
            _ => Err(StorageError::UnsupportedValueType),
        }
    }

    /// The range-tagged attribute, if the table has a composite key.
    pub fn range_key(&self) -> StorageResult<Option<&FlatAttribute>> {
        let mut keys = self.keys(Role::Range);
        match (keys.next(), keys.next()) {
            (key, None) => Ok(key),
            _ => Err(StorageError::UnsupportedValueType),
        }
    }

    pub fn version_attribute(&self) -> Option<&FlatAttribute> {
        self.version.map(|index| &self.attributes[index])
    }

    pub fn version_path(&self) -> Option<&str> {
        self.version_attribute().map(|attr| attr.path.as_str())
    }

    /// Storage path of an embedded [`Model`], if there is one.
    pub fn model_path(&self) -> Option<&str> {
        self.model_path.as_deref()
    }

    fn keys(&self, role: Role) -> impl Iterator<Item = &FlatAttribute> {
        self.attributes
            .iter()
            .filter(move |attr| attr.is_leaf() && attr.tag.role == Some(role))
    }
}

fn is_version(attr: &FlatAttribute) -> bool {
    if !attr.is_leaf() {
        return false;
    }
    attr.tag.version
        || (matches!(attr.kind, Kind::Uint)
            && attr
                .ident_path
                .rsplit('.')
                .next()
                .is_some_and(|ident| ident == "version"))
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

fn flatten(
    descriptor: &'static TypeDescriptor,
    path: &str,
    ident_path: &str,
    depth: usize,
    out: &mut Vec<FlatAttribute>,
    model_path: &mut Option<String>,
) {
    for attribute in descriptor.attributes {
        let tag = Tag::parse(attribute.tag);
        let ident = attribute.ident.to_lowercase();
        let name = tag.name.clone().unwrap_or_else(|| ident.clone());
        let attr_path = join(path, &name);
        let attr_ident_path = join(ident_path, &ident);

        out.push(FlatAttribute {
            path: attr_path.clone(),
            ident_path: attr_ident_path.clone(),
            tag,
            kind: attribute.kind,
            depth,
        });

        if let Kind::Embedded(embedded) = attribute.kind {
            let embedded = embedded();
            if model_path.is_none() && std::ptr::eq(embedded, Model::descriptor()) {
                *model_path = Some(attr_path.clone());
            }
            flatten(
                embedded,
                &attr_path,
                &attr_ident_path,
                depth + 1,
                out,
                model_path,
            );
        }
    }
}
