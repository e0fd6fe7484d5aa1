//! Filesystem-facing attribute records.
//!
//! These are what the adapter hands back to callers: logical paths with the
//! backend prefix already stripped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => f.write_str("public"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

/// Attributes of a file. Fields the producing operation did not look up stay `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub path: String,
    pub file_size: Option<u64>,
    pub visibility: Option<Visibility>,
    pub last_modified: Option<DateTime<Utc>>,
    pub mime_type: Option<String>,
}

impl FileAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// A virtual directory, reported without its trailing delimiter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryAttributes {
    pub path: String,
}

impl DirectoryAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// One entry produced by a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageAttributes {
    File(FileAttributes),
    Directory(DirectoryAttributes),
}

impl StorageAttributes {
    pub fn path(&self) -> &str {
        match self {
            StorageAttributes::File(file) => &file.path,
            StorageAttributes::Directory(dir) => &dir.path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, StorageAttributes::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, StorageAttributes::Directory(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_text_form_is_lowercase() {
        assert_eq!(Visibility::Public.to_string(), "public");
        assert_eq!(Visibility::Private.to_string(), "private");
        assert_eq!(serde_json::to_string(&Visibility::Private).unwrap(), "\"private\"");
    }

    #[test]
    fn storage_attributes_expose_path_and_kind() {
        let file = StorageAttributes::File(FileAttributes::new("docs/a.txt"));
        let dir = StorageAttributes::Directory(DirectoryAttributes::new("docs"));
        assert_eq!((file.path(), file.is_file(), file.is_dir()), ("docs/a.txt", true, false));
        assert_eq!((dir.path(), dir.is_file(), dir.is_dir()), ("docs", false, true));
    }
}
