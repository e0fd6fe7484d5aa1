//! Error types surfaced by the filesystem adapter and the URL generator.
//!
//! Backend failures are never interpreted here: whatever the object client
//! raised is boxed as the `source` of the operation-level variant, next to
//! the logical path(s) the caller asked about.

use std::fmt;
use thiserror::Error;

/// Boxed underlying cause of an operation failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type FilesystemResult<T> = Result<T, FilesystemError>;

/// Which attribute a failed metadata lookup was after.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataKind {
    MimeType,
    LastModified,
    FileSize,
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataKind::MimeType => f.write_str("mime type"),
            MetadataKind::LastModified => f.write_str("last modified"),
            MetadataKind::FileSize => f.write_str("file size"),
        }
    }
}

/// Step of a move that failed.
///
/// `DeleteSource` means the copy already succeeded: the destination exists
/// and the source was left in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveStage {
    Copy,
    DeleteSource,
}

impl fmt::Display for MoveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveStage::Copy => f.write_str("copy"),
            MoveStage::DeleteSource => f.write_str("delete source"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FilesystemError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("unable to write file at location: {path}. {source}")]
    UnableToWriteFile {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("unable to read file from location: {path}. {source}")]
    UnableToReadFile {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("unable to delete file located at: {path}. {source}")]
    UnableToDeleteFile {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("unable to delete directory located at: {path}. {source}")]
    UnableToDeleteDirectory {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("unable to create directory at location: {path}. {source}")]
    UnableToCreateDirectory {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("unable to copy file from {source_path} to {destination}. {source}")]
    UnableToCopyFile {
        source_path: String,
        destination: String,
        #[source]
        source: BoxError,
    },

    #[error("unable to move file from {source_path} to {destination} ({stage} failed)")]
    UnableToMoveFile {
        source_path: String,
        destination: String,
        stage: MoveStage,
        #[source]
        source: Box<FilesystemError>,
    },

    #[error("unable to retrieve the {kind} for file at location: {path}. {source}")]
    UnableToRetrieveMetadata {
        path: String,
        kind: MetadataKind,
        #[source]
        source: BoxError,
    },

    #[error("unable to set visibility for file {path}. {reason}")]
    UnableToSetVisibility { path: String, reason: String },

    #[error("unable to list contents at {path}. {source}")]
    UnableToListContents {
        path: String,
        #[source]
        source: BoxError,
    },
}

impl FilesystemError {
    /// Logical path the failed operation was addressing (the source, for copy and move).
    pub fn path(&self) -> Option<&str> {
        match self {
            FilesystemError::Configuration(_) => None,
            FilesystemError::UnableToWriteFile { path, .. }
            | FilesystemError::UnableToReadFile { path, .. }
            | FilesystemError::UnableToDeleteFile { path, .. }
            | FilesystemError::UnableToDeleteDirectory { path, .. }
            | FilesystemError::UnableToCreateDirectory { path, .. }
            | FilesystemError::UnableToRetrieveMetadata { path, .. }
            | FilesystemError::UnableToSetVisibility { path, .. }
            | FilesystemError::UnableToListContents { path, .. } => Some(path),
            FilesystemError::UnableToCopyFile { source_path, .. }
            | FilesystemError::UnableToMoveFile { source_path, .. } => Some(source_path),
        }
    }
}

/// Rejection of an unsafe path handed to the public URL generator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidPathError {
    #[error("path cannot be empty")]
    Empty,
    #[error("path contains invalid control characters")]
    ControlCharacters,
    #[error("path contains potentially dangerous traversal patterns")]
    Traversal,
    #[error("path exceeds maximum length limit of {max} bytes")]
    TooLong { max: usize },
}
