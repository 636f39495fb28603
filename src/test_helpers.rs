//! Shared test utilities for the tateru-stage test suite.
//!
//! Provides item builders for config fixtures and extractors over the items
//! a stage emitted.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let stage = TransformStage::new(SiteGenerator::new(), StageOptions::new());
//! let mut sink = Vec::new();
//! stage.transform(fixture_item(), &mut sink).await.unwrap();
//!
//! assert_eq!(relative_paths(&sink)[0], "index.html");
//! assert!(find_output(&sink, "about.html").text().contains("<h2>Page About</h2>"));
//! ```

use std::path::{Path, PathBuf};

use crate::host::{CONFIG_FILE_NAME, FileItem};
use crate::item::PipelineItem;

// =========================================================================
// Input items
// =========================================================================

/// A buffered config item rooted at `/site`.
pub fn config_item(body: &str) -> FileItem {
    FileItem::buffer(
        "/site",
        "/site",
        Path::new("/site").join(CONFIG_FILE_NAME),
        body.as_bytes().to_vec(),
    )
}

/// Path of the checked-in site fixture.
pub fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(CONFIG_FILE_NAME)
}

/// The site fixture as a buffered item, with the fixture directory as base.
pub fn fixture_item() -> FileItem {
    let path = fixture_path();
    let body = std::fs::read(&path).unwrap();
    let dir = path.parent().unwrap().to_path_buf();
    FileItem::buffer(dir.clone(), dir, path, body)
}

// =========================================================================
// Output extractors
// =========================================================================

/// Contents of every item, as text.
pub fn texts(items: &[FileItem]) -> Vec<String> {
    items.iter().map(FileItem::text).collect()
}

/// Output paths relative to their base, `/`-separated.
pub fn relative_paths(items: &[FileItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.relative().to_string_lossy().replace('\\', "/"))
        .collect()
}

/// Find an output by relative path. Panics if not found.
pub fn find_output<'a>(items: &'a [FileItem], relative: &str) -> &'a FileItem {
    items
        .iter()
        .find(|item| item.relative() == Path::new(relative))
        .unwrap_or_else(|| {
            panic!(
                "output '{relative}' not found. Available: {:?}",
                relative_paths(items)
            )
        })
}
