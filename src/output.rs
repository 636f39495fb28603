//! CLI output formatting for build and check runs.
//!
//! # Information-First Display
//!
//! Output is grouped by config file. Each config file gets a header line with
//! its path, followed by one indented line per generated file: positional
//! index, output path, then size and a short content digest. Digests let two
//! runs be compared at a glance; identical builds print identical listings.
//!
//! # Output Format
//!
//! ```text
//! site/tateru.config.json
//!     001 index.html (html, 1.4 KB, sha256:5f1c0e2a)
//!     002 about.html (html, 1.3 KB, sha256:a9d0417b)
//!     Generated 2 files
//! broken/tateru.config.json
//!     Error: [tateru-stage] Invalid JSON config file
//!
//! Built 2 files from 1 config, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each listing has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::host::FileItem;
use crate::item::PipelineItem;
use crate::pipeline::PipelineSummary;
use crate::stage::StageError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Pluralize a count: `1 file`, `2 files`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Human-readable byte size.
///
/// ```text
/// 512 B
/// 1.4 KB
/// 2.0 MB
/// ```
fn human_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

/// First 8 hex digits of the SHA-256 of `contents`.
pub fn short_digest(contents: &[u8]) -> String {
    let hash = Sha256::digest(contents);
    let hex = format!("{:x}", hash);
    hex[..8].to_string()
}

/// Path shown for a file: relative to `root` when inside it.
pub fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

// ============================================================================
// Generated files
// ============================================================================

/// What the listing shows about one generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    /// Output path relative to its base.
    pub relative: PathBuf,
    /// Where the file was written, if it was.
    pub written: Option<PathBuf>,
    /// Extension of the output, used as its display kind.
    pub kind: Option<String>,
    pub size: usize,
    pub digest: String,
}

impl OutputEntry {
    pub fn new(item: &FileItem, written: Option<PathBuf>) -> Self {
        let contents = item.contents().unwrap_or_default();
        let relative = item.relative().to_path_buf();
        let kind = relative
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_owned);
        Self {
            relative,
            written,
            kind,
            size: contents.len(),
            digest: short_digest(contents),
        }
    }
}

/// Format one generated file line.
///
/// ```text
/// 001 index.html (html, 1.4 KB, sha256:5f1c0e2a)
/// 002 CNAME (12 B, sha256:0b7e9c11)
/// ```
fn output_line(index: usize, entry: &OutputEntry) -> String {
    let mut details = Vec::new();
    if let Some(kind) = &entry.kind {
        details.push(kind.clone());
    }
    details.push(human_size(entry.size));
    details.push(format!("sha256:{}", entry.digest));
    format!(
        "{} {} ({})",
        format_index(index),
        entry.relative.to_string_lossy().replace('\\', "/"),
        details.join(", ")
    )
}

// ============================================================================
// Per-config report
// ============================================================================

/// Format the report for one config file.
///
/// `source` is the already shortened display path. Outputs are listed even
/// when the item failed, since files pushed before a failure were written.
pub fn format_item_report(
    source: &str,
    outputs: &[OutputEntry],
    error: Option<&StageError>,
) -> Vec<String> {
    let mut lines = vec![source.to_string()];
    for (i, entry) in outputs.iter().enumerate() {
        lines.push(format!("{}{}", indent(1), output_line(i + 1, entry)));
    }
    match error {
        Some(error) => lines.push(format!("{}Error: {}", indent(1), error.report())),
        None => lines.push(format!(
            "{}Generated {}",
            indent(1),
            plural(outputs.len(), "file")
        )),
    }
    lines
}

/// Print the report for one config file to stdout.
pub fn print_item_report(source: &str, outputs: &[OutputEntry], error: Option<&StageError>) {
    for line in format_item_report(source, outputs, error) {
        println!("{}", line);
    }
}

// ============================================================================
// Run summary
// ============================================================================

/// Format the closing summary of a run.
///
/// `verb` is `Built` for builds and `Checked` for dry runs.
pub fn format_summary(verb: &str, summary: &PipelineSummary) -> Vec<String> {
    let mut line = format!(
        "{} {} from {}",
        verb,
        plural(summary.emitted, "file"),
        plural(summary.completed, "config")
    );
    if summary.failed > 0 {
        line.push_str(&format!(", {} failed", summary.failed));
    }
    let mut lines = vec![String::new(), line];
    if summary.halted {
        lines.push("Stopped after the first failure (halt_on_error)".to_string());
    }
    lines
}

/// Print the closing summary of a run to stdout.
pub fn print_summary(verb: &str, summary: &PipelineSummary) {
    for line in format_summary(verb, summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
