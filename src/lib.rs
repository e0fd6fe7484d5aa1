//! Filesystem semantics over an S3-style object store.
//!
//! Files are objects, directories are key prefixes (plus optional marker
//! objects ending in `/`). The adapter talks to any [`ObjectClient`]; the
//! crate ships [`LocalObjectClient`], which keeps payloads on disk and
//! metadata in SQLite.

pub mod errors;
pub mod models;
pub mod services;

pub use errors::{FilesystemError, FilesystemResult, InvalidPathError, MetadataKind, MoveStage};
pub use models::attributes::{DirectoryAttributes, FileAttributes, StorageAttributes, Visibility};
pub use models::options::{MetadataDirective, ObjectOptions, WriteConfig};
pub use services::filesystem_adapter::{FilesystemAdapter, ObjectReader};
pub use services::local_object_client::LocalObjectClient;
pub use services::object_client::{BackendError, BackendResult, ObjectClient};
pub use services::path_prefixer::PathPrefixer;
pub use services::public_url::{AddressingStyle, PublicUrlGenerator};
