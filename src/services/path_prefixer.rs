//! Mapping between logical paths and backend keys.
//!
//! This is the only place a configured key prefix is added or removed.

const SEPARATOR: char = '/';

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathPrefixer {
    prefix: String,
}

impl PathPrefixer {
    /// Normalise `prefix` so that a non-empty prefix ends in exactly one `/`.
    pub fn new(prefix: &str) -> Self {
        let mut normalized = prefix.trim_end_matches(is_separator).to_string();
        if !normalized.is_empty() || prefix == "/" {
            normalized.push(SEPARATOR);
        }
        Self { prefix: normalized }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn prefix_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches(is_separator))
    }

    pub fn strip_prefix<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }

    pub fn strip_directory_prefix<'a>(&self, key: &'a str) -> &'a str {
        self.strip_prefix(key).trim_end_matches(is_separator)
    }

    /// Key prefix of a virtual directory: always ends in `/` unless empty.
    pub fn prefix_directory_path(&self, path: &str) -> String {
        let mut prefixed = self.prefix_path(path.trim_end_matches(is_separator));
        if !prefixed.is_empty() && !prefixed.ends_with(SEPARATOR) {
            prefixed.push(SEPARATOR);
        }
        prefixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_separators() {
        assert_eq!(PathPrefixer::new("uploads").prefix(), "uploads/");
        assert_eq!(PathPrefixer::new("uploads//").prefix(), "uploads/");
        assert_eq!(PathPrefixer::new("uploads\\").prefix(), "uploads/");
        assert_eq!(PathPrefixer::new("").prefix(), "");
        assert_eq!(PathPrefixer::new("/").prefix(), "/");
    }

    #[test]
    fn strip_inverts_prefix() {
        for prefix in ["", "uploads", "a/b/", "deep/nested/prefix"] {
            let prefixer = PathPrefixer::new(prefix);
            for path in ["file.txt", "dir/file.txt", "中文/文件.txt", "dir/"] {
                let key = prefixer.prefix_path(path);
                assert_eq!(prefixer.strip_prefix(&key), path, "prefix {prefix:?}");
            }
        }
    }

    #[test]
    fn leading_separators_are_dropped_from_paths() {
        let prefixer = PathPrefixer::new("root");
        assert_eq!(prefixer.prefix_path("/file.txt"), "root/file.txt");
    }

    #[test]
    fn directory_paths_end_with_separator() {
        let prefixer = PathPrefixer::new("root");
        assert_eq!(prefixer.prefix_directory_path("docs"), "root/docs/");
        assert_eq!(prefixer.prefix_directory_path("docs/"), "root/docs/");
        assert_eq!(prefixer.prefix_directory_path(""), "root/");

        let bare = PathPrefixer::new("");
        assert_eq!(bare.prefix_directory_path(""), "");
        assert_eq!(bare.prefix_directory_path("docs"), "docs/");
    }

    #[test]
    fn strip_directory_prefix_drops_trailing_separator() {
        let prefixer = PathPrefixer::new("root");
        assert_eq!(prefixer.strip_directory_prefix("root/docs/"), "docs");
    }

    #[test]
    fn foreign_keys_pass_through_strip() {
        let prefixer = PathPrefixer::new("root");
        assert_eq!(prefixer.strip_prefix("other/file.txt"), "other/file.txt");
    }
}
