mod record;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Record)] derive macro
// ============================================================================

/// Derive macro for the `Record` trait.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Record)]
/// struct Student {
///     #[record(embed)]
///     #[serde(default)]
///     pub model: Model,
///     #[record(hash)]
///     pub id: String,
///     pub age: i32,
///     #[record(default = "0.1")]
///     pub score: f32,
///     pub star: bool,
/// }
/// ```
///
/// Field attributes (structured form, canonicalized to a tag string):
/// - `#[record(hash)]` / `#[record(range)]` mark the primary key parts.
/// - `#[record(name = "...")]` overrides the storage name. A matching
///   `#[serde(rename = "...")]` is required so the wire shape agrees.
/// - `#[record(default = "...")]` populates the field on create when unset.
/// - `#[record(embed)]` flattens another `Record` type into this schema.
/// - `#[record(version)]` marks the version counter when it is not named `version`.
///
/// The verbatim tag form is accepted as well: `#[record(tag = "uid,range")]`.
///
/// Struct attribute: `#[record(table = "...")]` overrides the table name,
/// which otherwise is the struct identifier.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
