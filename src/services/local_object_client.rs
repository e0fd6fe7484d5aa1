//! src/services/local_object_client.rs
//!
//! LocalObjectClient serves the object-store contract from local disk.
//! Object metadata lives in SQLite; payloads are written beneath
//! `base_path/{bucket}/{shard}/{shard}/{digest}-{payload_id}` where `digest`
//! is the MD5 of `bucket/key`. Keys never become filesystem paths, so
//! directory marker keys (`docs/`) and their children (`docs/a.txt`)
//! coexist without clashing.
//!
//! Every write lands in a fresh payload file. The row is switched over in a
//! transaction and only then is the previous payload removed, so a failed
//! overwrite leaves the old object readable. No cache, no versioning.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{
    collections::BTreeMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    bucket::Bucket,
    listing::{CommonPrefix, ListObjectsOutput, ListObjectsParams, MAX_KEYS_LIMIT, ObjectRecord, SizeValue},
    object::StoredObject,
    options::{MetadataDirective, ObjectOptions},
    output::{
        CopyObjectOutput, DeleteObjectError, DeleteObjectOutput, DeleteObjectsOutput,
        GetObjectOutput, HeadObjectOutput, ObjectIdentifier, PutObjectOutput,
    },
};
use crate::services::object_client::{BackendError, BackendResult, ObjectClient};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");
const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const STORAGE_CLASS: &str = "STANDARD";
const OBJECT_COLUMNS: &str = "id, bucket_id, key, content_type, size_bytes, etag, \
     payload_id, storage_class, last_modified, metadata, is_deleted";
const SUPPORTED_REGIONS: [&str; 16] = [
    "local",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "ap-northeast-1",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-northeast-2",
    "ap-northeast-3",
    "me-south-1",
];

/// One entry of a grouped listing, before pagination.
enum ListEntry {
    Object(StoredObject),
    Prefix(String),
}

impl ListEntry {
    fn sort_key(&self) -> &str {
        match self {
            ListEntry::Object(obj) => &obj.key,
            ListEntry::Prefix(prefix) => prefix,
        }
    }
}

#[derive(Clone)]
pub struct LocalObjectClient {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl LocalObjectClient {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Create the metadata tables if they do not exist yet.
    pub async fn migrate(&self) -> BackendResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        info!(statements = statements.len(), "running migrations");

        for stmt in statements {
            debug!(sql = stmt, "executing migration statement");
            sqlx::query(stmt).execute(&*self.db).await?;
        }

        Ok(())
    }

    /// Reject keys that are empty, oversized, rooted, contain a `..`
    /// segment, or carry control characters or backslashes.
    fn ensure_key_safe(&self, key: &str) -> BackendResult<()> {
        let invalid = || BackendError::InvalidObjectKey(key.to_string());
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(invalid());
        }
        if key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
            return Err(invalid());
        }
        if key.bytes().any(|b| b.is_ascii_control() || b == b'\\') {
            return Err(invalid());
        }
        Ok(())
    }

    /// Validate bucket name format.
    ///
    /// Enforces S3-like naming rules:
    /// - 3–63 characters
    /// - lowercase letters, digits, dots, hyphens only
    /// - cannot start/end with dot or hyphen
    /// - cannot contain consecutive dots or dot-hyphen patterns
    /// - cannot look like an IPv4 address
    fn ensure_bucket_name_safe(&self, name: &str) -> BackendResult<()> {
        let invalid = |reason: &str| BackendError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.trim() != name {
            return Err(invalid("cannot begin or end with whitespace"));
        }

        let len = name.len();
        if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
            return Err(invalid("must be between 3 and 63 characters"));
        }

        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
        {
            return Err(invalid(
                "allowed characters are lowercase letters, digits, dots, and hyphens",
            ));
        }

        if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
            return Err(invalid("must start and end with a lowercase letter or digit"));
        }

        if name.contains("..") || name.contains("-.") || name.contains(".-") {
            return Err(invalid(
                "cannot contain consecutive dots or dot-hyphen combinations",
            ));
        }

        if is_ipv4_like(name) {
            return Err(invalid("must not be formatted like an IP address"));
        }

        Ok(())
    }

    /// Case-insensitive check against SUPPORTED_REGIONS.
    fn ensure_region_valid(&self, region: &str) -> BackendResult<()> {
        if SUPPORTED_REGIONS
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(region))
        {
            Ok(())
        } else {
            Err(BackendError::UnsupportedRegion(region.to_string()))
        }
    }

    fn bucket_root(&self, bucket_name: &str) -> PathBuf {
        self.base_path.join(bucket_name)
    }

    /// Payload location of one version of `key`: two shard directories taken
    /// from the first two bytes of MD5(bucket/key), then the full digest and
    /// the payload id as file name.
    fn object_path(&self, bucket_name: &str, key: &str, payload_id: Uuid) -> PathBuf {
        let digest = md5::compute(format!("{}/{}", bucket_name, key));
        let mut path = self.bucket_root(bucket_name);
        path.push(format!("{:02x}", digest[0]));
        path.push(format!("{:02x}", digest[1]));
        path.push(format!("{:x}-{}", digest, payload_id.simple()));
        path
    }

    async fn fetch_bucket(&self, bucket: &str) -> BackendResult<Bucket> {
        self.ensure_bucket_name_safe(bucket)?;
        sqlx::query_as::<Sqlite, Bucket>(
            "SELECT id, name, owner_id, region, created_at, versioning_enabled
             FROM buckets WHERE name = ?",
        )
        .bind(bucket)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => BackendError::BucketNotFound(bucket.to_string()),
            other => BackendError::Database(other),
        })
    }

    /// Fetch a live (not soft-deleted) object row.
    async fn fetch_object(&self, bucket: &Bucket, key: &str) -> BackendResult<StoredObject> {
        sqlx::query_as::<_, StoredObject>(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects
             WHERE key = ? AND bucket_id = ? AND is_deleted = 0"
        ))
        .bind(key)
        .bind(bucket.id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => BackendError::ObjectNotFound {
                bucket: bucket.name.clone(),
                key: key.to_string(),
            },
            other => BackendError::Database(other),
        })
    }

    async fn read_payload(&self, bucket: &Bucket, object: &StoredObject) -> BackendResult<Bytes> {
        let file_path = self.object_path(&bucket.name, &object.key, object.payload_id);
        match fs::read(&file_path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(BackendError::ObjectNotFound {
                bucket: bucket.name.clone(),
                key: object.key.clone(),
            }),
            Err(err) => Err(BackendError::Io(err)),
        }
    }

    /// Durably write `body` to `file_path`.
    ///
    /// Writes to a temp file, fsyncs, then renames into place. The temp file
    /// is removed on every failure path.
    async fn write_payload(&self, file_path: &Path, body: &[u8]) -> BackendResult<()> {
        let parent = file_path.parent().ok_or_else(|| {
            BackendError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let written = match write_synced(&tmp_path, body).await {
            Ok(()) => fs::rename(&tmp_path, file_path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BackendError::Io(err));
        }

        Ok(())
    }

    /// Point the row of `key` at a new payload (S3-like overwrite semantics).
    ///
    /// Returns the stored row and the payload id it replaced, if any. Both
    /// statements run in one transaction so the replaced id is exactly the one
    /// this write superseded.
    async fn upsert_object(
        &self,
        bucket: &Bucket,
        key: &str,
        content_type: Option<String>,
        metadata: &BTreeMap<String, String>,
        body: &[u8],
        payload_id: Uuid,
    ) -> BackendResult<(StoredObject, Option<Uuid>)> {
        let metadata = serde_json::to_string(metadata).map_err(io::Error::other)?;
        let size_bytes = i64::try_from(body.len())
            .map_err(|_| io::Error::other("object too large"))?;
        let etag = format!("{:x}", md5::compute(body));
        let mut tx = self.db.begin().await?;

        let previous: Option<Uuid> =
            sqlx::query_scalar("SELECT payload_id FROM objects WHERE bucket_id = ? AND key = ?")
                .bind(bucket.id)
                .bind(key)
                .fetch_optional(&mut *tx)
                .await?;

        let stored = sqlx::query_as::<_, StoredObject>(&format!(
            r#"
            INSERT INTO objects (
                id, bucket_id, key, content_type, size_bytes, etag,
                payload_id, storage_class, last_modified, metadata, is_deleted
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(bucket_id, key) DO UPDATE SET
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                payload_id = excluded.payload_id,
                storage_class = excluded.storage_class,
                last_modified = excluded.last_modified,
                metadata = excluded.metadata,
                is_deleted = 0
            RETURNING {OBJECT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(bucket.id)
        .bind(key)
        .bind(content_type)
        .bind(size_bytes)
        .bind(etag)
        .bind(payload_id)
        .bind(STORAGE_CLASS)
        .bind(Utc::now())
        .bind(metadata)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((stored, previous))
    }

    /// Write a new payload for `key`, then switch the row over to it.
    ///
    /// If the row update fails the new payload is removed and the previous
    /// version stays intact. After a successful switch the previous payload
    /// is deleted.
    async fn store_object(
        &self,
        bucket: &Bucket,
        key: &str,
        body: &[u8],
        content_type: Option<String>,
        metadata: &BTreeMap<String, String>,
    ) -> BackendResult<StoredObject> {
        let payload_id = Uuid::new_v4();
        let file_path = self.object_path(&bucket.name, key, payload_id);
        self.write_payload(&file_path, body).await?;

        let (stored, previous) = match self
            .upsert_object(bucket, key, content_type, metadata, body, payload_id)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                let _ = self.remove_payload(bucket, key, payload_id).await;
                return Err(err);
            }
        };

        if let Some(previous) = previous.filter(|id| *id != payload_id) {
            if let Err(err) = self.remove_payload(bucket, key, previous).await {
                warn!(bucket = %bucket.name, key, error = %err, "failed to remove replaced payload");
            }
        }

        Ok(stored)
    }

    /// Remove one payload file and prune the shard directories it leaves empty.
    async fn remove_payload(&self, bucket: &Bucket, key: &str, payload_id: Uuid) -> BackendResult<()> {
        let file_path = self.object_path(&bucket.name, key, payload_id);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!(path = %file_path.display(), "removed payload file"),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %file_path.display(), "payload file already missing");
            }
            Err(err) => return Err(BackendError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            let bucket_root = self.bucket_root(&bucket.name);
            self.prune_empty_dirs(parent, &bucket_root).await;
        }

        Ok(())
    }

    /// Soft-delete a key and remove its payload. Missing keys are a no-op.
    async fn delete_key(&self, bucket: &Bucket, key: &str) -> BackendResult<bool> {
        self.ensure_key_safe(key)?;
        let payload_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE objects SET is_deleted = 1
             WHERE key = ? AND bucket_id = ? AND is_deleted = 0
             RETURNING payload_id",
        )
        .bind(key)
        .bind(bucket.id)
        .fetch_optional(&*self.db)
        .await?;

        let Some(payload_id) = payload_id else {
            debug!(bucket = %bucket.name, key, "object already absent");
            return Ok(false);
        };

        self.remove_payload(bucket, key, payload_id).await?;
        Ok(true)
    }

    /// Create a bucket and its directory.
    ///
    /// Validates name and region. Returns BucketAlreadyExists on a name conflict.
    pub async fn create_bucket(&self, name: &str, region: &str) -> BackendResult<Bucket> {
        self.ensure_bucket_name_safe(name)?;
        let normalized_region = region.to_lowercase();
        self.ensure_region_valid(&normalized_region)?;
        fs::create_dir_all(self.bucket_root(name)).await?;

        let bucket = Bucket {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id: Uuid::new_v4(),
            region: normalized_region,
            created_at: Utc::now(),
            versioning_enabled: false,
        };

        match sqlx::query(
            "INSERT INTO buckets (id, name, owner_id, region, created_at, versioning_enabled)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(bucket.id)
        .bind(&bucket.name)
        .bind(bucket.owner_id)
        .bind(&bucket.region)
        .bind(bucket.created_at)
        .bind(bucket.versioning_enabled)
        .execute(&*self.db)
        .await
        {
            Ok(_) => {
                info!(bucket = %bucket.name, region = %bucket.region, "created bucket");
                Ok(bucket)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(BackendError::BucketAlreadyExists(name.to_string()))
            }
            Err(err) => Err(BackendError::Database(err)),
        }
    }

    /// Delete a bucket, its object rows (cascade) and its payload directory.
    ///
    /// A missing payload directory is ignored.
    pub async fn delete_bucket(&self, name: &str) -> BackendResult<()> {
        self.ensure_bucket_name_safe(name)?;
        let result = sqlx::query("DELETE FROM buckets WHERE name = ?")
            .bind(name)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BackendError::BucketNotFound(name.to_string()));
        }

        let bucket_path = self.bucket_root(name);
        if let Err(err) = fs::remove_dir_all(&bucket_path).await {
            if err.kind() != ErrorKind::NotFound {
                debug!(
                    path = %bucket_path.display(),
                    error = %err,
                    "failed to remove bucket directory after delete"
                );
            }
        }

        Ok(())
    }

    /// Remove empty shard directories up to (not including) the bucket root.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!(path = %current.display(), error = %err, "failed to prune directory");
                    break;
                }
            }
        }
    }

    /// Live rows under `prefix`, ascending by key.
    async fn fetch_prefixed_objects(
        &self,
        bucket: &Bucket,
        prefix: Option<&str>,
    ) -> BackendResult<Vec<StoredObject>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE bucket_id = "
        ));
        builder.push_bind(bucket.id);
        builder.push(" AND is_deleted = 0");

        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            builder.push(" AND substr(key, 1, length(");
            builder.push_bind(prefix.to_string());
            builder.push(")) = ");
            builder.push_bind(prefix.to_string());
        }

        builder.push(" ORDER BY key ASC");

        let rows = builder
            .build_query_as::<StoredObject>()
            .fetch_all(&*self.db)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ObjectClient for LocalObjectClient {
    async fn head_object(&self, bucket: &str, key: &str) -> BackendResult<HeadObjectOutput> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self.fetch_object(&bucket_rec, key).await?;
        Ok(HeadObjectOutput {
            content_length: Some(SizeValue::Integer(object.size_bytes)),
            content_type: object.content_type.clone(),
            last_modified: Some(format_timestamp(&object)),
            etag: object.etag.as_deref().map(quote_etag),
            metadata: object.metadata_map(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: ObjectOptions,
    ) -> BackendResult<PutObjectOutput> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let content_type = options
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let metadata = options.metadata.unwrap_or_default();

        let stored = self
            .store_object(&bucket_rec, key, &body, Some(content_type), &metadata)
            .await?;

        debug!(bucket, key, size = stored.size_bytes, "stored object");
        Ok(PutObjectOutput {
            etag: stored.etag.as_deref().map(quote_etag),
            version_id: None,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<GetObjectOutput> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self.fetch_object(&bucket_rec, key).await?;
        let body = self.read_payload(&bucket_rec, &object).await?;

        Ok(GetObjectOutput {
            body: Some(body),
            content_length: Some(SizeValue::Integer(object.size_bytes)),
            content_type: object.content_type.clone(),
            last_modified: Some(format_timestamp(&object)),
            etag: object.etag.as_deref().map(quote_etag),
            metadata: object.metadata_map(),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<DeleteObjectOutput> {
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let delete_marker = self.delete_key(&bucket_rec, key).await?;
        Ok(DeleteObjectOutput {
            delete_marker,
            version_id: None,
        })
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: Vec<ObjectIdentifier>,
    ) -> BackendResult<DeleteObjectsOutput> {
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let mut output = DeleteObjectsOutput::default();

        for object in objects {
            match self.delete_key(&bucket_rec, &object.key).await {
                Ok(_) => output.deleted.push(object),
                Err(err) => output.errors.push(DeleteObjectError {
                    key: object.key,
                    message: err.to_string(),
                }),
            }
        }

        debug!(
            bucket,
            deleted = output.deleted.len(),
            failed = output.errors.len(),
            "batch delete finished"
        );
        Ok(output)
    }

    /// ListObjectsV2 semantics over the metadata table.
    ///
    /// With a delimiter, keys sharing the segment after `prefix` collapse into
    /// one common prefix, which counts as a single entry toward `max_keys`.
    /// The continuation token encodes the last returned entry.
    async fn list_objects(
        &self,
        bucket: &str,
        params: ListObjectsParams,
    ) -> BackendResult<ListObjectsOutput> {
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let max_keys = params.max_keys.unwrap_or(MAX_KEYS_LIMIT).clamp(1, MAX_KEYS_LIMIT);
        let prefix = params.prefix.as_deref();
        let delimiter = params.delimiter.as_deref().filter(|d| !d.is_empty());
        let start_after = params
            .continuation_token
            .as_deref()
            .map(decode_continuation_token);

        let rows = self.fetch_prefixed_objects(&bucket_rec, prefix).await?;

        let mut entries: Vec<ListEntry> = Vec::new();
        for obj in rows {
            if let Some(delim) = delimiter {
                if let Some(common) = compute_common_prefix(&obj.key, prefix, delim) {
                    let repeated = matches!(
                        entries.last(),
                        Some(ListEntry::Prefix(last)) if *last == common
                    );
                    if !repeated {
                        entries.push(ListEntry::Prefix(common));
                    }
                    continue;
                }
            }
            entries.push(ListEntry::Object(obj));
        }

        let mut remaining = entries
            .into_iter()
            .filter(|entry| {
                start_after
                    .as_deref()
                    .is_none_or(|token| entry.sort_key() > token)
            })
            .peekable();

        let mut output = ListObjectsOutput::default();
        let mut last_key = None;
        for entry in remaining.by_ref().take(max_keys) {
            last_key = Some(entry.sort_key().to_string());
            match entry {
                ListEntry::Object(obj) => output.contents.push(object_record(&obj)),
                ListEntry::Prefix(prefix) => output.common_prefixes.push(CommonPrefix::new(prefix)),
            }
        }

        output.key_count = output.contents.len() + output.common_prefixes.len();
        if remaining.peek().is_some() {
            output.is_truncated = true;
            output.next_continuation_token = last_key.as_deref().map(encode_continuation_token);
        }

        Ok(output)
    }

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        destination_bucket: &str,
        destination_key: &str,
        options: ObjectOptions,
    ) -> BackendResult<CopyObjectOutput> {
        self.ensure_key_safe(source_key)?;
        self.ensure_key_safe(destination_key)?;
        let source_rec = self.fetch_bucket(source_bucket).await?;
        let destination_rec = if source_bucket == destination_bucket {
            source_rec.clone()
        } else {
            self.fetch_bucket(destination_bucket).await?
        };

        let source = self.fetch_object(&source_rec, source_key).await?;
        let body = self.read_payload(&source_rec, &source).await?;

        let (content_type, metadata) = match options.metadata_directive.unwrap_or_default() {
            MetadataDirective::Copy => (
                options.content_type.or(source.content_type.clone()),
                source.metadata_map(),
            ),
            MetadataDirective::Replace => (
                options.content_type,
                options.metadata.unwrap_or_default(),
            ),
        };

        let stored = self
            .store_object(&destination_rec, destination_key, &body, content_type, &metadata)
            .await?;

        debug!(
            source_bucket,
            source_key,
            destination_bucket,
            destination_key,
            "copied object"
        );
        Ok(CopyObjectOutput {
            etag: stored.etag.as_deref().map(quote_etag),
            last_modified: Some(format_timestamp(&stored)),
            version_id: None,
        })
    }
}

async fn write_synced(path: &Path, body: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await
}

fn object_record(obj: &StoredObject) -> ObjectRecord {
    ObjectRecord {
        key: Some(obj.key.clone()),
        size: Some(SizeValue::Integer(obj.size_bytes)),
        last_modified: Some(format_timestamp(obj)),
        etag: obj.etag.as_deref().map(quote_etag),
        storage_class: Some(obj.storage_class.clone()),
    }
}

fn format_timestamp(obj: &StoredObject) -> String {
    obj.last_modified.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn quote_etag(etag: &str) -> String {
    format!("\"{}\"", etag)
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

/// Compute a synthetic "common prefix" for S3 list semantics.
///
/// Returns Some(prefix) if the key belongs to a grouped prefix, otherwise None.
fn compute_common_prefix(
    key: &str,
    requested_prefix: Option<&str>,
    delimiter: &str,
) -> Option<String> {
    let requested_prefix = requested_prefix.unwrap_or("");
    let after_prefix = key.strip_prefix(requested_prefix)?;
    let pos = after_prefix.find(delimiter)?;
    Some(format!(
        "{}{}",
        requested_prefix,
        &after_prefix[..pos + delimiter.len()]
    ))
}

fn encode_continuation_token(token: &str) -> String {
    general_purpose::STANDARD.encode(token)
}

fn decode_continuation_token(token: &str) -> String {
    general_purpose::STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| token.to_string())
}

/// Check if a string matches IPv4-like dotted decimal form.
/// Rejects names formatted like `1.2.3.4`.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefix_groups_by_first_delimiter() {
        assert_eq!(
            compute_common_prefix("photos/2025/img.jpg", Some("photos/"), "/"),
            Some("photos/2025/".to_string())
        );
        assert_eq!(compute_common_prefix("photos/img.jpg", Some("photos/"), "/"), None);
        assert_eq!(compute_common_prefix("docs/a.txt", None, "/"), Some("docs/".to_string()));
        assert_eq!(compute_common_prefix("other/a.txt", Some("photos/"), "/"), None);
    }

    #[test]
    fn continuation_tokens_round_trip() {
        let token = encode_continuation_token("docs/a.txt");
        assert_eq!(decode_continuation_token(&token), "docs/a.txt");
        assert_eq!(decode_continuation_token("%%not-base64"), "%%not-base64");
    }

    #[test]
    fn ipv4_like_names_are_detected() {
        assert!(is_ipv4_like("192.168.0.1"));
        assert!(!is_ipv4_like("my.bucket.name.x"));
        assert!(!is_ipv4_like("300.1.1.1"));
    }
}
