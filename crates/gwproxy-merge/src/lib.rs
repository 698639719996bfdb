//! gwproxy merge engine
//!
//! Surgical, idempotent edits of a machine-managed fragment inside a
//! user-owned file. Everything outside the fragment passes through untouched.
//!
//! Three formats are covered:
//!
//! | Merger | Format | Managed fragment |
//! |--------|--------|------------------|
//! | [`ScriptBlockMerger`] | Line-oriented script | Block between two sentinel lines |
//! | [`StructuredSettingsMerger`] | JSON object | One reserved key |
//! | [`LineEntryMerger`] | Flat `key=value` lines | One prefixed line |
//!
//! Each merger exposes a pure `apply` over in-memory content plus an
//! `apply_to_file` wrapper that performs one read and at most one write.

mod error;
mod file;
mod lines;
mod script;
mod settings;

pub use error::MergeError;
pub use file::{read_bytes_optional, read_or_create, read_optional, overwrite};
pub use lines::{LineEntryMerger, DEFAULT_ENTRY_PREFIX};
pub use script::{ScriptBlockMerger, ScanState, DEFAULT_SENTINEL};
pub use settings::{StructuredSettingsMerger, Document, DEFAULT_PROXY_KEY};

/// Join lines with `\n`, terminating with a newline when non-empty.
pub(crate) fn render_lines<S: AsRef<str>>(lines: &[S]) -> String {
    if lines.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}
