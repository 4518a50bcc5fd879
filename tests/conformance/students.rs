use serde::{Deserialize, Serialize};
use storekit::{Model, Record};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Record)]
pub struct Student {
    #[record(embed)]
    #[serde(default)]
    pub model: Model,
    #[record(hash)]
    pub id: String,
    pub age: i32,
    #[record(default = "0.1")]
    pub score: f32,
    pub star: bool,
}

impl Student {
    pub fn new(id: &str, age: i32, star: bool) -> Self {
        Self {
            id: id.to_string(),
            age,
            star,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Record)]
pub struct Inner {
    #[record(hash)]
    pub id: String,
    #[record(embed)]
    #[serde(default)]
    pub model: Model,
}

/// Two-key record whose hash key and version live in an embedded record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Record)]
pub struct Classmates {
    #[record(embed)]
    pub inner: Inner,
    #[record(name = "uid", range)]
    #[serde(rename = "uid")]
    pub user_id: i32,
    pub note: String,
}

impl Classmates {
    pub fn new(id: &str, user_id: i32) -> Self {
        Self {
            inner: Inner {
                id: id.to_string(),
                ..Default::default()
            },
            user_id,
            ..Default::default()
        }
    }
}

/// Version counter under a custom name, no `Model`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Record)]
#[record(table = "tickets")]
pub struct Ticket {
    #[record(hash)]
    pub code: String,
    #[record(version)]
    pub revision: u64,
    pub title: String,
}
