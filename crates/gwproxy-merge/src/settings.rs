//! Structured Settings Merger
//!
//! Sets or removes a single reserved key in a JSON settings document
//! (e.g. an editor's `settings.json`) and leaves every other key alone.
//!
//! Reading is best-effort: a missing, empty, corrupt or non-object document is
//! read as an empty object. Writing is strict and propagates errors.

use crate::error::MergeError;
use crate::file::{overwrite, read_bytes_optional};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// Reserved key used by default
pub const DEFAULT_PROXY_KEY: &str = "http.proxy";

/// A settings document
pub type Document = Map<String, Value>;

/// Merger for one reserved key of a JSON object
#[derive(Debug, Clone)]
pub struct StructuredSettingsMerger {
    key: String,
}

impl Default for StructuredSettingsMerger {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_KEY)
    }
}

impl StructuredSettingsMerger {
    /// Create a merger for the given key
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// The reserved key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Parse a document, falling back to an empty object.
    pub fn parse(content: &str) -> Document {
        if content.trim().is_empty() {
            return Document::new();
        }

        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                warn!("Settings document is not an object ({}), starting from empty", type_name(&other));
                Document::new()
            }
            Err(e) => {
                warn!("Settings document is not valid JSON ({}), starting from empty", e);
                Document::new()
            }
        }
    }

    /// Set the reserved key to `value`, or remove it when `None`.
    pub fn apply(&self, mut document: Document, value: Option<&str>) -> Document {
        match value {
            Some(value) => {
                document.insert(self.key.clone(), Value::String(value.to_string()));
            }
            None => {
                document.remove(&self.key);
            }
        }
        document
    }

    /// Current value of the reserved key, if it is a string
    pub fn get<'a>(&self, document: &'a Document) -> Option<&'a str> {
        document.get(&self.key).and_then(Value::as_str)
    }

    /// Serialize a document with stable pretty formatting
    pub fn render(document: &Document) -> Result<String, MergeError> {
        let mut out = serde_json::to_string_pretty(document)?;
        out.push('\n');
        Ok(out)
    }

    /// Read a settings file. Only I/O failures other than "not found" are
    /// errors; content that is not UTF-8 reads as an empty object.
    pub fn read_file(&self, path: &Path) -> Result<Document, MergeError> {
        let bytes = read_bytes_optional(path)?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(_) => {
                warn!("{} is not valid UTF-8, starting from empty", path.display());
                Ok(Document::new())
            }
        }
    }

    /// Apply to a file on disk and rewrite it.
    pub fn apply_to_file(&self, path: &Path, value: Option<&str>) -> Result<(), MergeError> {
        let document = self.read_file(path)?;

        let up_to_date = match value {
            Some(value) => self.get(&document) == Some(value),
            None => !document.contains_key(&self.key),
        };
        if up_to_date {
            debug!("{} already up to date", path.display());
            return Ok(());
        }

        let document = self.apply(document, value);
        overwrite(path, &Self::render(&document)?)?;

        info!(
            "{} '{}' in {}",
            if value.is_some() { "Set" } else { "Removed" },
            self.key,
            path.display()
        );
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
