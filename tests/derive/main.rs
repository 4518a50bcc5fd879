//! Integration tests for `#[derive(Record)]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use storekit::record::introspect;
use storekit::{Kind, Model, Record, Schema};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Record)]
struct Profile {
    #[record(hash)]
    handle: String,
    #[record(embed)]
    #[serde(default)]
    model: Model,
    nickname: Option<String>,
    tags: Vec<String>,
    links: HashMap<String, String>,
    #[record(default = 3)]
    level: u8,
    #[record(tag = "label,default=none")]
    label: String,
    #[serde(skip)]
    scratch: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Record)]
#[record(table = "orders")]
struct Order {
    #[record(name = "cid", hash)]
    #[serde(rename = "cid")]
    customer: String,
    #[record(range)]
    placed_at: i64,
    #[record(version)]
    revision: u64,
    r#type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Record)]
struct Session {
    #[record(hash)]
    token: String,
    #[serde(skip_serializing)]
    secret: String,
    #[serde(default, skip_deserializing)]
    computed: u32,
    expires: i64,
}

fn tags_of<R: Record>() -> Vec<(&'static str, &'static str)> {
    R::descriptor()
        .attributes
        .iter()
        .map(|attr| (attr.ident, attr.tag))
        .collect()
}

#[test]
fn descriptor_lists_tags_in_declaration_order() {
    assert_eq!(
        tags_of::<Profile>(),
        vec![
            ("handle", ",hash"),
            ("model", ",embed"),
            ("nickname", ""),
            ("tags", ""),
            ("links", ""),
            ("level", ",default=3"),
            ("label", "label,default=none"),
        ]
    );
    assert_eq!(
        tags_of::<Order>(),
        vec![
            ("customer", "cid,hash"),
            ("placed_at", ",range"),
            ("revision", ",version"),
            ("type", ""),
        ]
    );
}

#[test]
fn table_names_come_from_the_type_or_attribute() {
    assert_eq!(Profile::descriptor().name, "Profile");
    assert_eq!(Profile::descriptor().table, None);
    assert_eq!(Schema::of::<Profile>().table_name(), "Profile");
    assert_eq!(Order::descriptor().table, Some("orders"));
    assert_eq!(introspect::table_name::<Order>().unwrap(), "orders");
}

#[test]
fn kinds_follow_field_types() {
    let kinds: Vec<&Kind> = Profile::descriptor()
        .attributes
        .iter()
        .map(|attr| &attr.kind)
        .collect();
    assert!(matches!(kinds[0], Kind::String));
    assert!(kinds[1].is_embedded());
    assert!(matches!(kinds[2], Kind::Optional(Kind::String)));
    assert!(matches!(kinds[3], Kind::Sequence));
    assert!(matches!(kinds[4], Kind::Map));
    assert!(matches!(kinds[5], Kind::Uint));
}

#[test]
fn schema_is_flattened_and_cached() {
    let schema = Profile::schema();
    assert!(std::ptr::eq(schema, Profile::schema()));

    let leaves: Vec<&str> = schema.leaves().map(|attr| attr.path.as_str()).collect();
    assert_eq!(
        leaves,
        vec![
            "handle",
            "model.version",
            "model.created_at",
            "model.updated_at",
            "nickname",
            "tags",
            "links",
            "level",
            "label",
        ]
    );
    assert_eq!(schema.version_path(), Some("model.version"));
    assert_eq!(schema.model_path(), Some("model"));
}

#[test]
fn renamed_keys_and_custom_version() {
    assert_eq!(
        introspect::hash_and_range_key::<Order>(true).unwrap(),
        ("cid".to_string(), Some("placed_at".to_string()))
    );
    assert_eq!(
        introspect::hash_and_range_key::<Order>(false).unwrap(),
        ("customer".to_string(), Some("placed_at".to_string()))
    );
    assert_eq!(introspect::version_path::<Order>(), Some("revision"));
    assert_eq!(Order::schema().model_path(), None);
}

#[test]
fn defaults_from_derived_tags() {
    let mut profile = Profile {
        handle: "ada".into(),
        ..Default::default()
    };
    introspect::set_defaults(&mut profile).unwrap();
    assert_eq!(profile.level, 3);
    assert_eq!(profile.label, "none");
    assert_eq!(profile.nickname, None);
}

#[test]
fn field_map_uses_storage_names() {
    let order = Order {
        customer: "c1".into(),
        placed_at: 7,
        revision: 4,
        r#type: "retail".into(),
    };
    let fields = introspect::field_map(&order).unwrap();
    let names: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["revision", "type"]);
    assert_eq!(fields["type"], serde_json::json!("retail"));
    assert_eq!(introspect::version(&order).unwrap(), 4);
}

#[test]
fn one_way_serde_skips_are_not_attributes() {
    assert_eq!(
        tags_of::<Session>(),
        vec![("token", ",hash"), ("expires", "")]
    );

    let session = Session {
        token: "t".into(),
        secret: "hunter2".into(),
        computed: 9,
        expires: 60,
    };
    let fields = introspect::field_map(&session).unwrap();
    let names: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["expires"]);
    assert!(fields.values().all(|value| !value.is_null()));
}
