//! Merge errors

use std::path::PathBuf;

/// Errors raised while reading or rewriting a target file.
///
/// Corrupt structured documents are not an error: they are read as empty.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("Failed to create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl MergeError {
    /// Path of the file involved, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            MergeError::Create { path, .. }
            | MergeError::Read { path, .. }
            | MergeError::Write { path, .. } => Some(path),
            MergeError::Serialize(_) => None,
        }
    }
}
