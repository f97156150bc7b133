// Primitive value types shared by every module.
//
// Timestamps
// - All i64 values are epoch milliseconds, UTC.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type Timestamp = i64;

pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Opaque record identity. Generated once at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whole minutes between two timestamps, floored. Reversed intervals count as zero.
pub fn minutes_between(start: Timestamp, end: Timestamp) -> u64 {
    if end <= start {
        return 0;
    }
    ((end - start) / MILLIS_PER_MINUTE) as u64
}
