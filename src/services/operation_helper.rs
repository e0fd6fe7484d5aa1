//! Pagination, record validation and option extraction shared by the
//! filesystem adapter.
//!
//! Listing pages arrive straight from the object client. Entries without a
//! key (or prefix) are dropped silently, directory marker objects are never
//! reported as files, and timestamps or sizes that cannot be interpreted are
//! reported as absent rather than failing the listing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::models::{
    attributes::{DirectoryAttributes, FileAttributes},
    listing::{CommonPrefix, ListObjectsOutput, ListObjectsParams, ObjectRecord},
    options::{ObjectOptions, WriteConfig},
    output::ObjectIdentifier,
};
use crate::services::{
    object_client::{BackendError, BackendResult, ObjectClient},
    path_prefixer::PathPrefixer,
};

pub(crate) const DIRECTORY_DELIMITER: &str = "/";

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Clone)]
pub struct OperationHelper {
    client: Arc<dyn ObjectClient>,
    prefixer: PathPrefixer,
}

impl OperationHelper {
    pub fn new(client: Arc<dyn ObjectClient>, prefixer: PathPrefixer) -> Self {
        Self { client, prefixer }
    }

    /// Delete every object whose key starts with `location`.
    ///
    /// Lists to exhaustion first, then issues a single batch delete with the
    /// full key list. An empty listing performs no delete call at all.
    /// Returns the number of keys submitted for deletion.
    pub async fn delete_directory_objects(
        &self,
        bucket: &str,
        location: &str,
    ) -> BackendResult<usize> {
        let objects = self.list_all_objects(bucket, location).await?;
        if objects.is_empty() {
            debug!(bucket, location, "no objects to delete");
            return Ok(0);
        }

        let count = objects.len();
        let result = self.client.delete_objects(bucket, objects).await?;
        if let Some(first) = result.errors.first() {
            return Err(BackendError::Request(format!(
                "failed to delete {} of {} objects (first: `{}`: {})",
                result.errors.len(),
                count,
                first.key,
                first.message
            )));
        }

        debug!(bucket, location, count, "deleted directory objects");
        Ok(count)
    }

    /// Collect every object key under `location`, following continuation
    /// tokens until the backend stops returning one.
    ///
    /// Keys are returned in page order, then in-page order.
    pub async fn list_all_objects(
        &self,
        bucket: &str,
        location: &str,
    ) -> BackendResult<Vec<ObjectIdentifier>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;
        let mut pages = 0usize;

        loop {
            let params = ListObjectsParams::with_prefix(location).continuation_token(continuation_token);
            let page = self.client.list_objects(bucket, params).await?;
            pages += 1;
            objects.extend(extract_object_keys(&page));

            match page.next_continuation_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        debug!(bucket, location, pages, keys = objects.len(), "listed all objects");
        Ok(objects)
    }

    /// File entries of one listing page, directory markers excluded.
    pub fn process_object_contents<'a>(
        &'a self,
        page: &'a ListObjectsOutput,
    ) -> impl Iterator<Item = FileAttributes> + 'a {
        page.contents
            .iter()
            .filter_map(|record| file_attributes_from_record(&self.prefixer, record))
    }

    /// Directory entries of one listing page; always empty for deep listings.
    pub fn process_directory_prefixes<'a>(
        &'a self,
        page: &'a ListObjectsOutput,
        deep: bool,
    ) -> impl Iterator<Item = DirectoryAttributes> + 'a {
        page.common_prefixes
            .iter()
            .filter(move |_| !deep)
            .filter_map(|prefix| directory_attributes_from_prefix(&self.prefixer, prefix))
    }
}

/// Keys of every well-formed record in a page.
pub fn extract_object_keys(page: &ListObjectsOutput) -> impl Iterator<Item = ObjectIdentifier> + '_ {
    page.contents
        .iter()
        .filter_map(|record| record.key.as_deref())
        .map(ObjectIdentifier::new)
}

/// Map a listed record to a file entry.
///
/// Returns `None` for malformed records and for directory markers (keys
/// ending in the delimiter).
pub fn file_attributes_from_record(
    prefixer: &PathPrefixer,
    record: &ObjectRecord,
) -> Option<FileAttributes> {
    let key = record.key.as_deref()?;
    if key.ends_with(DIRECTORY_DELIMITER) {
        return None;
    }

    Some(FileAttributes {
        path: prefixer.strip_prefix(key).to_string(),
        file_size: record.size.as_ref().and_then(|size| size.coerce()),
        last_modified: record.last_modified.as_deref().and_then(parse_timestamp),
        ..FileAttributes::default()
    })
}

pub fn directory_attributes_from_prefix(
    prefixer: &PathPrefixer,
    prefix: &CommonPrefix,
) -> Option<DirectoryAttributes> {
    let prefix = prefix.prefix.as_deref()?;
    Some(DirectoryAttributes::new(prefixer.strip_directory_prefix(prefix)))
}

/// Derive object options from a write configuration.
///
/// Only `ContentType` (string, non-null) and `metadata` (a map; non-string
/// values dropped) are recognised. A key missing from the input is missing
/// from the output.
pub fn extract_options_from_config(config: &WriteConfig) -> ObjectOptions {
    let content_type = match config.get("ContentType") {
        Some(Value::String(content_type)) => Some(content_type.clone()),
        _ => None,
    };

    let metadata = match config.get("metadata") {
        Some(Value::Object(map)) => Some(
            map.iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
                .collect(),
        ),
        _ => None,
    };

    ObjectOptions {
        content_type,
        metadata,
        metadata_directive: None,
    }
}

/// Parse a backend timestamp. Unrecognised input yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing::SizeValue;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn records_map_to_files_with_prefix_stripped() {
        let prefixer = PathPrefixer::new("root");
        let record = ObjectRecord::new("root/docs/a.txt")
            .size(1024_i64)
            .last_modified("2023-01-01T12:00:00+00:00");

        let file = file_attributes_from_record(&prefixer, &record).expect("file entry");
        assert_eq!(file.path, "docs/a.txt");
        assert_eq!(file.file_size, Some(1024));
        assert_eq!(
            file.last_modified,
            Some(Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(file.visibility, None);
    }

    #[test]
    fn directory_markers_are_not_files() {
        let prefixer = PathPrefixer::new("");
        assert!(file_attributes_from_record(&prefixer, &ObjectRecord::new("docs/")).is_none());
    }

    #[test]
    fn keyless_records_are_dropped() {
        let prefixer = PathPrefixer::new("");
        let record = ObjectRecord {
            size: Some(SizeValue::Integer(1)),
            ..ObjectRecord::default()
        };
        assert!(file_attributes_from_record(&prefixer, &record).is_none());
    }

    #[test]
    fn unparseable_size_and_timestamp_become_absent() {
        let prefixer = PathPrefixer::new("");
        let record = ObjectRecord::new("a.txt").size("lots").last_modified("yesterday-ish");
        let file = file_attributes_from_record(&prefixer, &record).expect("file entry");
        assert_eq!(file.file_size, None);
        assert_eq!(file.last_modified, None);
    }

    #[test]
    fn size_accepts_integers_and_numeric_strings() {
        assert_eq!(SizeValue::Integer(1024).coerce(), Some(1024));
        assert_eq!(SizeValue::from("1024").coerce(), Some(1024));
        assert_eq!(SizeValue::from("12kb").coerce(), None);
        assert_eq!(SizeValue::Integer(-1).coerce(), None);
    }

    #[test]
    fn prefixes_map_to_directories_without_delimiter() {
        let prefixer = PathPrefixer::new("test");
        let dir = directory_attributes_from_prefix(&prefixer, &CommonPrefix::new("test/valid-dir/"))
            .expect("directory entry");
        assert_eq!(dir.path, "valid-dir");
        assert!(directory_attributes_from_prefix(&prefixer, &CommonPrefix::default()).is_none());

        let nested = directory_attributes_from_prefix(&prefixer, &CommonPrefix::new("test/a/b//"))
            .expect("directory entry");
        assert_eq!(nested.path, "a/b");
        let foreign = directory_attributes_from_prefix(&prefixer, &CommonPrefix::new("other/"))
            .expect("directory entry");
        assert_eq!(foreign.path, "other");
    }

    #[test]
    fn options_extraction_is_exact() {
        assert!(extract_options_from_config(&WriteConfig::new()).is_empty());

        let options = extract_options_from_config(&WriteConfig::new().with("ContentType", "text/plain"));
        assert_eq!(options.content_type.as_deref(), Some("text/plain"));
        assert_eq!(options.metadata, None);

        let options = extract_options_from_config(&WriteConfig::new().with("ContentType", Value::Null));
        assert!(options.is_empty());

        let options = extract_options_from_config(&WriteConfig::new().with("metadata", "invalid"));
        assert!(options.is_empty());
    }

    #[test]
    fn options_extraction_ignores_unknown_keys() {
        let config = WriteConfig::new()
            .with("ContentType", "image/png")
            .with("metadata", json!({ "type": "image", "count": 3 }))
            .with("visibility", "public")
            .with("other", "value");

        let options = extract_options_from_config(&config);
        let expected: BTreeMap<String, String> = [("type".to_string(), "image".to_string())].into();
        assert_eq!(options.content_type.as_deref(), Some("image/png"));
        assert_eq!(options.metadata, Some(expected));
        assert_eq!(options.metadata_directive, None);
    }

    #[test]
    fn timestamps_in_common_formats_parse() {
        let expected = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(parse_timestamp("2015-10-21T07:28:00Z"), Some(expected));
        assert_eq!(parse_timestamp("Wed, 21 Oct 2015 07:28:00 GMT"), Some(expected));
        assert_eq!(parse_timestamp("2015-10-21 07:28:00"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not a date"), None);
    }
}
