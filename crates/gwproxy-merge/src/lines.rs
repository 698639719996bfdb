//! Line Entry Merger
//!
//! Keeps exactly one `prefix=value` line in a flat config file such as
//! `.npmrc`. All other non-blank lines are preserved in order; blank lines
//! are dropped.

use crate::error::MergeError;
use crate::file::{overwrite, read_optional};
use crate::render_lines;
use std::path::Path;
use tracing::{debug, info};

/// Reserved line prefix used by default
pub const DEFAULT_ENTRY_PREFIX: &str = "proxy=";

/// Merger for a single prefixed line
#[derive(Debug, Clone)]
pub struct LineEntryMerger {
    prefix: String,
}

impl Default for LineEntryMerger {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_PREFIX)
    }
}

impl LineEntryMerger {
    /// Create a merger for the given prefix (including the `=`)
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The reserved prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn is_entry(&self, line: &str) -> bool {
        line.trim().starts_with(&self.prefix)
    }

    /// Drop existing entries and blank lines, then append one entry for `value`.
    pub fn apply<'a, I>(&self, lines: I, value: Option<&str>) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out: Vec<String> = lines
            .into_iter()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty() && !self.is_entry(l))
            .map(str::to_owned)
            .collect();

        if let Some(value) = value {
            out.push(format!("{}{}", self.prefix, value));
        }

        out
    }

    /// Apply to whole-file content and render it.
    pub fn apply_content(&self, content: &str, value: Option<&str>) -> String {
        render_lines(&self.apply(content.lines(), value))
    }

    /// Value of the last entry line, if any
    pub fn value<'a>(&self, content: &'a str) -> Option<&'a str> {
        content
            .lines()
            .filter_map(|l| l.trim().strip_prefix(self.prefix.as_str()))
            .last()
            .map(str::trim)
    }

    /// Apply to a file on disk. A missing file is treated as empty.
    ///
    /// Returns `true` if the file content changed.
    pub fn apply_to_file(&self, path: &Path, value: Option<&str>) -> Result<bool, MergeError> {
        let current = read_optional(path)?;
        let updated = self.apply_content(&current, value);

        if updated == current {
            debug!("{} already up to date", path.display());
            return Ok(false);
        }

        overwrite(path, &updated)?;
        info!(
            "{} '{}' entry in {}",
            if value.is_some() { "Wrote" } else { "Removed" },
            self.prefix.trim_end_matches('='),
            path.display()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_enable_appends_entry() {
        let merger = LineEntryMerger::default();
        let out = merger.apply_content("registry=https://registry.npmjs.org/\n", Some("http://10.0.0.1:10808"));

        assert_eq!(
            out,
            "registry=https://registry.npmjs.org/\nproxy=http://10.0.0.1:10808\n"
        );
    }

    #[test]
    fn test_replaces_all_existing_entries() {
        let merger = LineEntryMerger::default();
        let content = "proxy=http://old:1\nfoo=bar\n  proxy=http://older:2\n";

        let out = merger.apply_content(content, Some("http://new:3"));
        assert_eq!(out, "foo=bar\nproxy=http://new:3\n");
    }

    #[test]
    fn test_disable_removes_entry_and_blanks() {
        let merger = LineEntryMerger::default();
        let content = "a=1\n\nproxy=http://h:1\n\nb=2\n";

        let out = merger.apply_content(content, None);
        assert_eq!(out, "a=1\nb=2\n");
    }

    #[test]
    fn test_does_not_touch_similar_keys() {
        let merger = LineEntryMerger::default();
        let content = "https-proxy=http://h:1\nnoproxy=localhost\n";

        let out = merger.apply_content(content, None);
        assert_eq!(out, content);
    }

    #[test]
    fn test_empty_result_has_no_newline() {
        let merger = LineEntryMerger::default();
        assert_eq!(merger.apply_content("proxy=http://h:1\n", None), "");
    }

    #[test]
    fn test_idempotent() {
        let merger = LineEntryMerger::default();
        let once = merger.apply_content("x=1\r\n", Some("http://h:1"));
        let twice = merger.apply_content(&once, Some("http://h:1"));
        assert_eq!(once, twice);
        assert_eq!(once, "x=1\nproxy=http://h:1\n");
    }

    #[test]
    fn test_value() {
        let merger = LineEntryMerger::default();
        assert_eq!(merger.value("a=1\nproxy=http://h:1\n"), Some("http://h:1"));
        assert_eq!(merger.value("a=1\n"), None);
    }

    #[test]
    fn test_apply_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".npmrc");
        let merger = LineEntryMerger::default();

        assert!(merger.apply_to_file(&path, Some("http://h:1")).unwrap());
        assert!(!merger.apply_to_file(&path, Some("http://h:1")).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "proxy=http://h:1\n");

        assert!(merger.apply_to_file(&path, None).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
