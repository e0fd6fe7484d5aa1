//! FilesystemAdapter: filesystem operations on top of a flat object store.
//!
//! Directories are virtual. A directory exists either as a zero-byte marker
//! object whose key ends in `/`, or implicitly as the common prefix of the
//! objects below it. Listings report directories only when they are shallow.
//!
//! The adapter holds no state besides the bucket, the key prefix and the
//! client handle. Every operation is a short sequence of client calls; none
//! is retried and none is transactional.

use bytes::{Bytes, BytesMut};
use futures::{
    Stream, StreamExt, TryStreamExt, pin_mut,
    stream::{self, BoxStream},
};
use std::{io, io::Cursor, sync::Arc};
use tracing::{debug, warn};

use crate::errors::{FilesystemError, FilesystemResult, MetadataKind, MoveStage};
use crate::models::{
    attributes::{FileAttributes, StorageAttributes, Visibility},
    listing::ListObjectsParams,
    options::{ObjectOptions, WriteConfig},
    output::HeadObjectOutput,
};
use crate::services::{
    object_client::{BackendError, ObjectClient},
    operation_helper::{
        DIRECTORY_DELIMITER, OperationHelper, extract_options_from_config, parse_timestamp,
    },
    path_prefixer::PathPrefixer,
};

/// A directory exists as soon as one object lives under its prefix.
const MAX_KEYS_FOR_DIRECTORY_CHECK: usize = 1;

const SET_VISIBILITY_UNSUPPORTED: &str =
    "the object store does not support visibility changes on individual objects";

/// Readable, seekable handle over an object's body, positioned at offset 0.
pub type ObjectReader = Cursor<Bytes>;

#[derive(Clone)]
pub struct FilesystemAdapter {
    client: Arc<dyn ObjectClient>,
    bucket: String,
    prefixer: PathPrefixer,
    helper: OperationHelper,
}

impl FilesystemAdapter {
    /// Build an adapter for `bucket`, mapping logical paths under `prefix`.
    ///
    /// Fails with [`FilesystemError::Configuration`] when the bucket is empty.
    pub fn new(
        client: Arc<dyn ObjectClient>,
        bucket: impl Into<String>,
        prefix: &str,
    ) -> FilesystemResult<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(FilesystemError::Configuration(
                "bucket name cannot be empty".into(),
            ));
        }

        let prefixer = PathPrefixer::new(prefix);
        let helper = OperationHelper::new(Arc::clone(&client), prefixer.clone());
        Ok(Self {
            client,
            bucket,
            prefixer,
            helper,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefixer(&self) -> &PathPrefixer {
        &self.prefixer
    }

    /// Whether an object exists at `path`. Any backend failure reads as `false`.
    pub async fn file_exists(&self, path: &str) -> bool {
        let location = self.prefixer.prefix_path(path);
        match self.client.head_object(&self.bucket, &location).await {
            Ok(_) => true,
            Err(err) => {
                debug!(path, error = %err, "file existence check failed");
                false
            }
        }
    }

    /// Whether anything lives under the directory `path`. Any backend failure reads as `false`.
    pub async fn directory_exists(&self, path: &str) -> bool {
        let location = self.prefixer.prefix_directory_path(path);
        let params = ListObjectsParams::with_prefix(location).max_keys(MAX_KEYS_FOR_DIRECTORY_CHECK);
        match self.client.list_objects(&self.bucket, params).await {
            Ok(page) => !page.contents.is_empty(),
            Err(err) => {
                debug!(path, error = %err, "directory existence check failed");
                false
            }
        }
    }

    pub async fn write(
        &self,
        path: &str,
        contents: impl Into<Bytes>,
        config: &WriteConfig,
    ) -> FilesystemResult<()> {
        let location = self.prefixer.prefix_path(path);
        let options = extract_options_from_config(config);
        self.client
            .put_object(&self.bucket, &location, contents.into(), options)
            .await
            .map_err(|err| FilesystemError::UnableToWriteFile {
                path: path.to_string(),
                source: err.into(),
            })?;

        debug!(path, %location, "wrote file");
        Ok(())
    }

    /// Drain `contents` into memory, then store it in a single put.
    ///
    /// A chunk error while draining fails the write before anything is sent.
    pub async fn write_stream<S>(
        &self,
        path: &str,
        contents: S,
        config: &WriteConfig,
    ) -> FilesystemResult<()>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let mut body = BytesMut::new();
        pin_mut!(contents);
        while let Some(chunk) = contents.next().await {
            let chunk = chunk.map_err(|err| FilesystemError::UnableToWriteFile {
                path: path.to_string(),
                source: Box::new(io::Error::new(
                    err.kind(),
                    format!("unable to read stream contents: {err}"),
                )),
            })?;
            body.extend_from_slice(&chunk);
        }

        self.write(path, body.freeze(), config).await
    }

    pub async fn read(&self, path: &str) -> FilesystemResult<Bytes> {
        let location = self.prefixer.prefix_path(path);
        let fail = |source: BackendError| FilesystemError::UnableToReadFile {
            path: path.to_string(),
            source: source.into(),
        };

        let output = self
            .client
            .get_object(&self.bucket, &location)
            .await
            .map_err(fail)?;
        output.body.ok_or_else(|| {
            fail(BackendError::InvalidResponse(
                "response carried no object body".into(),
            ))
        })
    }

    pub async fn read_stream(&self, path: &str) -> FilesystemResult<ObjectReader> {
        self.read(path).await.map(Cursor::new)
    }

    pub async fn delete(&self, path: &str) -> FilesystemResult<()> {
        let location = self.prefixer.prefix_path(path);
        self.client
            .delete_object(&self.bucket, &location)
            .await
            .map_err(|err| FilesystemError::UnableToDeleteFile {
                path: path.to_string(),
                source: err.into(),
            })?;

        debug!(path, %location, "deleted file");
        Ok(())
    }

    /// Delete every object below the directory `path`, marker included.
    pub async fn delete_directory(&self, path: &str) -> FilesystemResult<()> {
        let location = self.prefixer.prefix_directory_path(path);
        let deleted = self
            .helper
            .delete_directory_objects(&self.bucket, &location)
            .await
            .map_err(|err| FilesystemError::UnableToDeleteDirectory {
                path: path.to_string(),
                source: err.into(),
            })?;

        debug!(path, %location, deleted, "deleted directory");
        Ok(())
    }

    /// Write the zero-byte marker object of the directory `path`.
    pub async fn create_directory(&self, path: &str, _config: &WriteConfig) -> FilesystemResult<()> {
        let location = self.prefixer.prefix_directory_path(path);
        self.client
            .put_object(&self.bucket, &location, Bytes::new(), ObjectOptions::default())
            .await
            .map_err(|err| FilesystemError::UnableToCreateDirectory {
                path: path.to_string(),
                source: err.into(),
            })?;

        debug!(path, %location, "created directory marker");
        Ok(())
    }

    /// Always fails; the backend is never contacted.
    pub async fn set_visibility(&self, path: &str, visibility: Visibility) -> FilesystemResult<()> {
        warn!(path, %visibility, "rejected visibility change");
        Err(FilesystemError::UnableToSetVisibility {
            path: path.to_string(),
            reason: SET_VISIBILITY_UNSUPPORTED.to_string(),
        })
    }

    /// Every object is reported private; the backend is never contacted.
    pub async fn visibility(&self, path: &str) -> FileAttributes {
        FileAttributes {
            visibility: Some(Visibility::Private),
            ..FileAttributes::new(path)
        }
    }

    pub async fn mime_type(&self, path: &str) -> FilesystemResult<FileAttributes> {
        let head = self.head_for(path, MetadataKind::MimeType).await?;
        Ok(FileAttributes {
            mime_type: head.content_type,
            ..FileAttributes::new(path)
        })
    }

    pub async fn last_modified(&self, path: &str) -> FilesystemResult<FileAttributes> {
        let head = self.head_for(path, MetadataKind::LastModified).await?;
        Ok(FileAttributes {
            last_modified: head.last_modified.as_deref().and_then(parse_timestamp),
            ..FileAttributes::new(path)
        })
    }

    pub async fn file_size(&self, path: &str) -> FilesystemResult<FileAttributes> {
        let head = self.head_for(path, MetadataKind::FileSize).await?;
        Ok(FileAttributes {
            file_size: head.content_length.as_ref().and_then(|size| size.coerce()),
            ..FileAttributes::new(path)
        })
    }

    async fn head_for(&self, path: &str, kind: MetadataKind) -> FilesystemResult<HeadObjectOutput> {
        let location = self.prefixer.prefix_path(path);
        self.client
            .head_object(&self.bucket, &location)
            .await
            .map_err(|err| FilesystemError::UnableToRetrieveMetadata {
                path: path.to_string(),
                kind,
                source: err.into(),
            })
    }

    /// Lazily list the entries below the directory `path`.
    ///
    /// Pages are fetched on demand: dropping the stream early stops further
    /// requests. Shallow listings (`deep == false`) group by `/` and report
    /// directories; deep listings report files only. Directory marker objects
    /// are never reported as files. The first failed page ends the stream
    /// with [`FilesystemError::UnableToListContents`].
    pub fn list_contents(
        &self,
        path: &str,
        deep: bool,
    ) -> BoxStream<'static, FilesystemResult<StorageAttributes>> {
        let location = self.prefixer.prefix_directory_path(path);
        let client = Arc::clone(&self.client);
        let helper = self.helper.clone();
        let bucket = self.bucket.clone();
        let path = path.to_string();

        debug!(path, %location, deep, "listing contents");

        // State: `Some(token)` means another page is due, `None` means done.
        let pages = stream::try_unfold(Some(None::<String>), move |cursor| {
            let client = Arc::clone(&client);
            let helper = helper.clone();
            let bucket = bucket.clone();
            let location = location.clone();
            let path = path.clone();
            async move {
                let Some(token) = cursor else {
                    return Ok::<_, FilesystemError>(None);
                };

                let mut params = ListObjectsParams::with_prefix(location).continuation_token(token);
                if !deep {
                    params = params.delimiter(DIRECTORY_DELIMITER);
                }

                let page = client
                    .list_objects(&bucket, params)
                    .await
                    .map_err(|err| FilesystemError::UnableToListContents {
                        path,
                        source: err.into(),
                    })?;

                let mut entries: Vec<StorageAttributes> = helper
                    .process_object_contents(&page)
                    .map(StorageAttributes::File)
                    .collect();
                entries.extend(
                    helper
                        .process_directory_prefixes(&page, deep)
                        .map(StorageAttributes::Directory),
                );

                let next = page.next_continuation_token.map(Some);
                Ok(Some((entries, next)))
            }
        });

        pages
            .map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<_, FilesystemError>)))
            .try_flatten()
            .boxed()
    }

    /// Server-side copy within the bucket.
    pub async fn copy_file(
        &self,
        source: &str,
        destination: &str,
        config: &WriteConfig,
    ) -> FilesystemResult<()> {
        let source_location = self.prefixer.prefix_path(source);
        let destination_location = self.prefixer.prefix_path(destination);
        let options = extract_options_from_config(config);

        self.client
            .copy_object(
                &self.bucket,
                &source_location,
                &self.bucket,
                &destination_location,
                options,
            )
            .await
            .map_err(|err| FilesystemError::UnableToCopyFile {
                source_path: source.to_string(),
                destination: destination.to_string(),
                source: err.into(),
            })?;

        debug!(source, destination, "copied file");
        Ok(())
    }

    /// Copy, then delete the source. Not atomic.
    ///
    /// If the delete fails the destination has already been written and the
    /// source is still present; the error's [`MoveStage`] says which step failed.
    pub async fn move_file(
        &self,
        source: &str,
        destination: &str,
        config: &WriteConfig,
    ) -> FilesystemResult<()> {
        let fail = |stage: MoveStage, err: FilesystemError| FilesystemError::UnableToMoveFile {
            source_path: source.to_string(),
            destination: destination.to_string(),
            stage,
            source: Box::new(err),
        };

        self.copy_file(source, destination, config)
            .await
            .map_err(|err| fail(MoveStage::Copy, err))?;

        if let Err(err) = self.delete(source).await {
            warn!(
                source,
                destination,
                error = %err,
                "move left source in place after copying"
            );
            return Err(fail(MoveStage::DeleteSource, err));
        }

        Ok(())
    }
}
