//! File primitives
//!
//! Each merger call opens, fully reads, fully rewrites and closes its target.
//! Nothing is held open between calls.

use crate::error::MergeError;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read a file, creating it (and its parent directories) empty if missing.
pub fn read_or_create(path: &Path) -> Result<String, MergeError> {
    if !path.exists() {
        debug!("Creating {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| MergeError::Create {
                path: path.to_path_buf(),
                source,
            })?;
        }

        fs::File::create(path).map_err(|source| MergeError::Create {
            path: path.to_path_buf(),
            source,
        })?;
    }

    fs::read_to_string(path).map_err(|source| MergeError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a file, treating a missing file as empty content.
pub fn read_optional(path: &Path) -> Result<String, MergeError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(MergeError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read raw bytes, treating a missing file as empty content.
pub fn read_bytes_optional(path: &Path) -> Result<Vec<u8>, MergeError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(MergeError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Replace the whole file with `content` in a single write.
pub fn overwrite(path: &Path, content: &str) -> Result<(), MergeError> {
    fs::write(path, content).map_err(|source| MergeError::Write {
        path: path.to_path_buf(),
        source,
    })
}
