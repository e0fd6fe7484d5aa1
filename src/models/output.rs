//! Result records of the non-listing object operations.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::listing::SizeValue;

/// Result of a metadata lookup (HEAD).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeadObjectOutput {
    pub content_length: Option<SizeValue>,
    pub content_type: Option<String>,
    /// Raw timestamp string as supplied by the backend.
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Result of a GET. `body` is `None` when the backend returned no usable payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetObjectOutput {
    pub body: Option<Bytes>,
    pub content_length: Option<SizeValue>,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutObjectOutput {
    pub etag: Option<String>,
    pub version_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteObjectOutput {
    pub delete_marker: bool,
    pub version_id: Option<String>,
}

/// Key (and optional version) addressed by a batch delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectIdentifier {
    pub key: String,
    pub version_id: Option<String>,
}

impl ObjectIdentifier {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: None,
        }
    }
}

/// Per-key failure reported inside a successful batch delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteObjectError {
    pub key: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteObjectsOutput {
    pub deleted: Vec<ObjectIdentifier>,
    pub errors: Vec<DeleteObjectError>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CopyObjectOutput {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub version_id: Option<String>,
}
