//! Script Block Merger
//!
//! Maintains one managed block inside a line-oriented script (shell or
//! PowerShell profile). The block is delimited by the same sentinel line on
//! both ends:
//!
//! ```text
//! alias ll='ls -l'          <- user content, preserved
//!
//! # Proxy Setting           <- opens
//! export http_proxy=...     <- managed body, replaced on every apply
//! # Proxy Setting           <- closes
//! ```
//!
//! # Scanner
//!
//! ```text
//!            sentinel
//!   Outside ──────────▶ Inside
//!      ▲                  │
//!      └──────────────────┘
//!            sentinel
//! ```
//!
//! A file with an odd number of sentinels ends the scan `Inside`: everything
//! after the unmatched sentinel is treated as managed and dropped.

use crate::error::MergeError;
use crate::file::{overwrite, read_or_create};
use crate::render_lines;
use std::path::Path;
use tracing::{debug, info, warn};

/// Sentinel line used by default
pub const DEFAULT_SENTINEL: &str = "# Proxy Setting";

/// Scanner position relative to the managed block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Line belongs to the user
    Outside,
    /// Line belongs to the managed block
    Inside,
}

impl ScanState {
    /// Transition on a sentinel line
    pub fn on_sentinel(self) -> Self {
        match self {
            ScanState::Outside => ScanState::Inside,
            ScanState::Inside => ScanState::Outside,
        }
    }

    /// Is the scanner inside the managed block?
    pub fn is_inside(&self) -> bool {
        matches!(self, ScanState::Inside)
    }
}

/// Result of one pass over a script
struct Scan<'a> {
    /// Lines outside any managed block, `\r` stripped
    kept: Vec<&'a str>,
    /// Body of the first managed block, if one was opened
    body: Option<Vec<&'a str>>,
    /// State after the last line
    end: ScanState,
}

/// Merger for sentinel-delimited script blocks
#[derive(Debug, Clone)]
pub struct ScriptBlockMerger {
    sentinel: String,
}

impl Default for ScriptBlockMerger {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL)
    }
}

impl ScriptBlockMerger {
    /// Create a merger for the given sentinel line
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    /// The sentinel line
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    fn is_sentinel(&self, line: &str) -> bool {
        line.trim() == self.sentinel
    }

    fn scan<'a>(&self, content: &'a str) -> Scan<'a> {
        let mut state = ScanState::Outside;
        let mut kept = Vec::new();
        let mut body: Option<Vec<&'a str>> = None;
        let mut blocks = 0usize;

        for line in content.lines() {
            let line = line.trim_end_matches('\r');

            if self.is_sentinel(line) {
                state = state.on_sentinel();
                if state.is_inside() {
                    blocks += 1;
                    if body.is_none() {
                        body = Some(Vec::new());
                    }
                }
                continue;
            }

            match state {
                ScanState::Outside => kept.push(line),
                ScanState::Inside if blocks == 1 => {
                    if let Some(lines) = body.as_mut() {
                        lines.push(line);
                    }
                }
                ScanState::Inside => {}
            }
        }

        if blocks > 1 {
            debug!("Found {} managed blocks, collapsing to one", blocks);
        }

        Scan { kept, body, end: state }
    }

    /// Compute new content with the managed block set to `body`, or removed
    /// when `body` is `None`.
    pub fn apply(&self, content: &str, body: Option<&str>) -> String {
        let scan = self.scan(content);

        if scan.end.is_inside() {
            warn!(
                "Unterminated '{}' block; dropping everything after it",
                self.sentinel
            );
        }

        let mut lines: Vec<&str> = scan.kept;

        if let Some(body) = body {
            if lines.last().is_some_and(|l| !l.trim().is_empty()) {
                lines.push("");
            }
            lines.push(&self.sentinel);
            lines.extend(body.lines().map(|l| l.trim_end_matches('\r')));
            lines.push(&self.sentinel);
        }

        render_lines(&lines)
    }

    /// Body lines of the managed block, if present and terminated.
    pub fn extract<'a>(&self, content: &'a str) -> Option<Vec<&'a str>> {
        let scan = self.scan(content);
        if scan.end.is_inside() {
            return None;
        }
        scan.body
    }

    /// Apply to a file on disk. A missing file is created first.
    ///
    /// Returns `true` if the file content changed.
    pub fn apply_to_file(&self, path: &Path, body: Option<&str>) -> Result<bool, MergeError> {
        let current = read_or_create(path)?;
        let updated = self.apply(&current, body);

        if updated == current {
            debug!("{} already up to date", path.display());
            return Ok(false);
        }

        overwrite(path, &updated)?;
        info!(
            "{} managed block in {}",
            if body.is_some() { "Wrote" } else { "Removed" },
            path.display()
        );
        Ok(true)
    }
}
