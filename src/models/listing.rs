//! Listing requests and pages exchanged with an object client.

use serde::{Deserialize, Serialize};

/// Upper bound on `max_keys` accepted by a single listing call.
pub const MAX_KEYS_LIMIT: usize = 1000;

/// Parameters of a single ListObjectsV2-style call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListObjectsParams {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub max_keys: Option<usize>,
    pub continuation_token: Option<String>,
}

impl ListObjectsParams {
    /// List everything under `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    pub fn continuation_token(mut self, token: Option<String>) -> Self {
        self.continuation_token = token;
        self
    }
}

/// Size of a listed or inspected object as reported by the backend.
///
/// Some backends report sizes as JSON numbers, others as numeric strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeValue {
    Integer(i64),
    Text(String),
}

impl SizeValue {
    /// Coerce to a byte count. Negative or non-numeric values yield `None`.
    pub fn coerce(&self) -> Option<u64> {
        match self {
            SizeValue::Integer(n) => u64::try_from(*n).ok(),
            SizeValue::Text(s) => s.trim().parse::<u64>().ok(),
        }
    }
}

impl From<i64> for SizeValue {
    fn from(value: i64) -> Self {
        SizeValue::Integer(value)
    }
}

impl From<&str> for SizeValue {
    fn from(value: &str) -> Self {
        SizeValue::Text(value.to_string())
    }
}

/// One entry of a listing page's contents.
///
/// Every field is optional because the record comes straight off the wire;
/// a record without a key is malformed and skipped by consumers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectRecord {
    /// Backend key, prefix included.
    pub key: Option<String>,
    pub size: Option<SizeValue>,
    /// Raw timestamp string as supplied by the backend.
    pub last_modified: Option<String>,
    #[serde(rename = "ETag")]
    pub etag: Option<String>,
    /// Passed through untouched.
    pub storage_class: Option<String>,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn size(mut self, size: impl Into<SizeValue>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn last_modified(mut self, last_modified: impl Into<String>) -> Self {
        self.last_modified = Some(last_modified.into());
        self
    }
}

/// A virtual-directory grouping boundary, always ending in the delimiter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommonPrefix {
    pub prefix: Option<String>,
}

impl CommonPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

/// One page of a listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListObjectsOutput {
    pub contents: Vec<ObjectRecord>,
    /// Only populated when the request carried a delimiter.
    pub common_prefixes: Vec<CommonPrefix>,
    pub is_truncated: bool,
    /// Presence means more pages exist.
    pub next_continuation_token: Option<String>,
    pub key_count: usize,
}
