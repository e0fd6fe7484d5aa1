//! Represents an object stored by the local backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Metadata row for a single object (blob) within a bucket.
///
/// The payload bytes live on disk; this row only describes them.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct StoredObject {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Foreign key linking to the parent bucket.
    pub bucket_id: Uuid,

    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Content type (MIME type).
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 of the payload, hex encoded.
    pub etag: Option<String>,

    /// Names the payload file of this version. Changes on every write.
    pub payload_id: Uuid,

    /// Storage class (e.g., STANDARD).
    pub storage_class: String,

    /// Timestamp when object was last modified.
    pub last_modified: DateTime<Utc>,

    /// User metadata serialized as a JSON object of strings.
    pub metadata: String,

    /// Whether the object is marked as deleted (soft delete / delete marker).
    pub is_deleted: bool,
}

impl StoredObject {
    /// Decode the user metadata column. A corrupt column reads as empty.
    pub fn metadata_map(&self) -> BTreeMap<String, String> {
        serde_json::from_str(&self.metadata).unwrap_or_default()
    }
}
