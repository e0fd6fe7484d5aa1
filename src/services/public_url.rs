//! Public URLs for stored objects.
//!
//! Two addressing styles are supported:
//! - bucket subdomain: `https://{bucket}.{host}/{path}` for native endpoints
//! - direct domain: `https://{host}/{path}` for CDN or custom domains
//!
//! Paths are validated before any URL is produced and every `/`-separated
//! segment is percent-encoded on its own.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info};

use crate::errors::InvalidPathError;
use crate::models::options::WriteConfig;

const MAX_PATH_LEN: usize = 1024;

/// RFC 3986 unreserved characters stay bare; everything else is encoded.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingStyle {
    BucketSubdomain,
    DirectDomain,
}

#[derive(Clone, Debug)]
pub struct PublicUrlGenerator {
    base_url: String,
    bucket: String,
    prefix: String,
}

impl PublicUrlGenerator {
    /// `host` may carry a scheme (`https://cdn.example.com`); it is dropped.
    pub fn new(host: &str, bucket: &str, prefix: &str, style: AddressingStyle) -> Self {
        let host = strip_scheme(host);
        let base_url = match style {
            AddressingStyle::BucketSubdomain => format!("https://{bucket}.{host}"),
            AddressingStyle::DirectDomain => format!("https://{host}"),
        };

        debug!(
            host,
            bucket,
            prefix,
            ?style,
            base_url = %base_url,
            "initialized public url generator"
        );

        Self {
            base_url,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the public URL of `path`. The config is accepted for interface
    /// symmetry with write operations and does not affect the result.
    ///
    /// A configured prefix is joined with a single `/`; a prefix that
    /// already ends in `/` therefore yields `//` in the URL.
    pub fn public_url(&self, path: &str, _config: &WriteConfig) -> Result<String, InvalidPathError> {
        validate_path(path)?;

        let object_path = if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.prefix, path.trim_start_matches('/'))
        };

        let encoded_path = object_path
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string())
            .collect::<Vec<_>>()
            .join("/");

        info!(
            original_path = path,
            object_path = %object_path,
            bucket = %self.bucket,
            url_prefix = %self.base_url,
            "public url generated"
        );

        Ok(format!("{}/{}", self.base_url, encoded_path))
    }
}

/// Reject paths that are empty, contain control characters, could escape
/// the bucket root, or exceed the key length limit.
pub fn validate_path(path: &str) -> Result<(), InvalidPathError> {
    if path.is_empty() {
        return Err(InvalidPathError::Empty);
    }
    if path.chars().any(|c| matches!(c, '\u{00}'..='\u{1F}' | '\u{7F}')) {
        return Err(InvalidPathError::ControlCharacters);
    }
    if path.contains("..") || path.starts_with('/') || path.contains("//") {
        return Err(InvalidPathError::Traversal);
    }
    if path.len() > MAX_PATH_LEN {
        return Err(InvalidPathError::TooLong { max: MAX_PATH_LEN });
    }
    Ok(())
}

fn strip_scheme(host: &str) -> &str {
    match host.split_once("://") {
        Some((scheme, rest))
            if scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            rest
        }
        _ => host,
    }
}
