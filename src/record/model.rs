use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use storekit_macros::Record;

/// Common bookkeeping embedded by application records.
///
/// Embedded as `#[record(embed)] model: Model`, the version lives at
/// `model.version` in storage. `created_at` and `updated_at` are Unix
/// milliseconds maintained by `create` and `save`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Record)]
pub struct Model {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

impl Model {
    pub fn version(&self) -> u64 {
        self.version
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
