//! Data model for the object filesystem.
//!
//! Everything here is a transient request/response value: listing pages and
//! operation outputs exchanged with an [`ObjectClient`](crate::services::object_client::ObjectClient),
//! the filesystem-facing attribute records handed back to callers, and the
//! rows persisted by the local backend (`bucket`, `object`) which map to
//! SQLite tables via `sqlx::FromRow`.

pub mod attributes;
pub mod bucket;
pub mod listing;
pub mod object;
pub mod options;
pub mod output;
