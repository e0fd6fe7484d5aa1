//! Bucket rows of the local backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A storage bucket held by the local backend.
///
/// Buckets act as namespaces for objects. The filesystem adapter never sees
/// this record; it only ever addresses a bucket by name.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Bucket {
    /// Unique identifier for this bucket (UUID for internal DB use).
    pub id: Uuid,

    /// Bucket name (must conform to DNS naming rules).
    pub name: String,

    /// ID of the account that owns this bucket.
    pub owner_id: Uuid,

    /// Region the bucket was created in (e.g. "us-west-2").
    pub region: String,

    /// When this bucket was created.
    pub created_at: DateTime<Utc>,

    /// Optional bucket versioning flag.
    pub versioning_enabled: bool,
}
