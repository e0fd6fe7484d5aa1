//! The narrow object-operations contract the filesystem adapter is built on.
//!
//! Any S3-compatible binding can implement [`ObjectClient`]; the crate ships
//! [`LocalObjectClient`](crate::services::local_object_client::LocalObjectClient)
//! for disk-backed use. Timeouts, retries and request signing all belong to
//! the implementation, never to the adapter.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

use crate::models::{
    listing::{ListObjectsOutput, ListObjectsParams},
    options::ObjectOptions,
    output::{
        CopyObjectOutput, DeleteObjectOutput, DeleteObjectsOutput, GetObjectOutput,
        HeadObjectOutput, ObjectIdentifier, PutObjectOutput,
    },
};

/// The single error kind an object client raises.
///
/// The adapter treats every variant as an opaque failure signal.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("region `{0}` is not supported")]
    UnsupportedRegion(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key `{0}`")]
    InvalidObjectKey(String),
    #[error("invalid response from object store: {0}")]
    InvalidResponse(String),
    #[error("object store request failed: {0}")]
    Request(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Fetch object metadata without the body.
    async fn head_object(&self, bucket: &str, key: &str) -> BackendResult<HeadObjectOutput>;

    /// Store `body` under `key`, replacing any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: ObjectOptions,
    ) -> BackendResult<PutObjectOutput>;

    /// Fetch the full object body together with its metadata.
    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<GetObjectOutput>;

    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<DeleteObjectOutput>;

    /// Delete several objects in one call. Per-key failures are reported in
    /// the output rather than as an error.
    async fn delete_objects(
        &self,
        bucket: &str,
        objects: Vec<ObjectIdentifier>,
    ) -> BackendResult<DeleteObjectsOutput>;

    /// Fetch one page of a ListObjectsV2-style listing.
    async fn list_objects(
        &self,
        bucket: &str,
        params: ListObjectsParams,
    ) -> BackendResult<ListObjectsOutput>;

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        destination_bucket: &str,
        destination_key: &str,
        options: ObjectOptions,
    ) -> BackendResult<CopyObjectOutput>;
}
