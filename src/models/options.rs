//! Caller-supplied write configuration and the object options derived from it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Generic, loosely typed configuration passed to write-like operations.
///
/// Only a few keys mean anything to the object store (see
/// [`extract_options_from_config`](crate::services::operation_helper::extract_options_from_config));
/// everything else is carried along and ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteConfig(Map<String, Value>);

impl WriteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for WriteConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for WriteConfig {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Whether a copy keeps the source metadata or replaces it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MetadataDirective {
    #[default]
    Copy,
    Replace,
}

impl fmt::Display for MetadataDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataDirective::Copy => f.write_str("COPY"),
            MetadataDirective::Replace => f.write_str("REPLACE"),
        }
    }
}

/// Options understood by put and copy. Absent fields mean "not specified".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectOptions {
    pub content_type: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub metadata_directive: Option<MetadataDirective>,
}

impl ObjectOptions {
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none() && self.metadata.is_none() && self.metadata_directive.is_none()
    }
}
