//! Filesystem host adapter.
//!
//! Implements the [`PipelineItem`] protocol for plain files and provides the
//! two ends of a filesystem pipeline: [`src`] reads config files into items,
//! [`dest`] writes emitted items under an output directory.
//!
//! ## Paths
//!
//! Items carry three paths, mirroring how a build tool tracks files:
//!
//! ```text
//! cwd   /home/me/site                       working directory
//! base  /home/me/site                       directory outputs are relative to
//! path  /home/me/site/cs/about.html         full path of the item
//! ```
//!
//! [`dest`] writes `path` relative to `base` under the output directory, so
//! the item above lands at `dist/cs/about.html`. An item whose relative path
//! is absolute or climbs with `..` is refused rather than written outside
//! the output directory.

use crate::item::PipelineItem;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;
use walkdir::WalkDir;

/// File name picked up when a directory is passed to [`src`].
pub const CONFIG_FILE_NAME: &str = "tateru.config.json";

#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Output path escapes the output directory: {}", .0.display())]
    OutsideOutput(PathBuf),
}

/// Payload of a [`FileItem`].
pub enum Contents {
    /// Placeholder without payload (e.g. a directory entry).
    Null,
    /// Fully buffered bytes.
    Buffer(Vec<u8>),
    /// Incrementally delivered bytes.
    Stream(Pin<Box<dyn AsyncRead + Send + Sync>>),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Null => f.write_str("Null"),
            Contents::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Contents::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A file travelling through the pipeline.
#[derive(Debug)]
pub struct FileItem {
    pub contents: Contents,
    pub cwd: PathBuf,
    pub base: PathBuf,
    pub path: PathBuf,
}

impl FileItem {
    pub fn null(cwd: impl Into<PathBuf>, base: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        Self {
            contents: Contents::Null,
            cwd: cwd.into(),
            base: base.into(),
            path: path.into(),
        }
    }

    pub fn buffer(
        cwd: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        contents: Vec<u8>,
    ) -> Self {
        Self {
            contents: Contents::Buffer(contents),
            cwd: cwd.into(),
            base: base.into(),
            path: path.into(),
        }
    }

    pub fn stream(
        cwd: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        reader: impl AsyncRead + Send + Sync + 'static,
    ) -> Self {
        Self {
            contents: Contents::Stream(Box::pin(reader)),
            cwd: cwd.into(),
            base: base.into(),
            path: path.into(),
        }
    }

    /// Buffered contents as UTF-8 text (lossy). Empty for null and streams.
    pub fn text(&self) -> String {
        self.contents()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

impl PipelineItem for FileItem {
    fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream(_))
    }

    fn contents(&self) -> Option<&[u8]> {
        match &self.contents {
            Contents::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    fn cwd(&self) -> &Path {
        &self.cwd
    }

    fn base(&self) -> &Path {
        &self.base
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn create(contents: Vec<u8>, cwd: PathBuf, base: PathBuf, path: PathBuf) -> Self {
        Self {
            contents: Contents::Buffer(contents),
            cwd,
            base,
            path,
        }
    }
}

/// Read config files into buffered items.
///
/// Each entry in `paths` is resolved against `cwd`. A file becomes one item
/// whose base is its parent directory. A directory is walked for files named
/// [`CONFIG_FILE_NAME`], each with the walked directory as base. Items come
/// back in argument order, walked files sorted by path.
pub async fn src(paths: &[PathBuf], cwd: &Path) -> Result<Vec<FileItem>, HostError> {
    let mut items = Vec::new();
    for entry in paths {
        let full = cwd.join(entry);
        if full.is_dir() {
            for config_path in find_configs(&full)? {
                items.push(read_item(cwd, &full, config_path).await?);
            }
        } else if full.is_file() {
            let base = full.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
            items.push(read_item(cwd, &base, full).await?);
        } else {
            return Err(HostError::NotFound(full));
        }
    }
    Ok(items)
}

fn find_configs(dir: &Path) -> Result<Vec<PathBuf>, HostError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == CONFIG_FILE_NAME {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

async fn read_item(cwd: &Path, base: &Path, path: PathBuf) -> Result<FileItem, HostError> {
    let bytes = tokio::fs::read(&path).await?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read config");
    Ok(FileItem::buffer(cwd, base, path, bytes))
}

/// Write a buffered item under `out_dir`, returning the written path.
///
/// Null and streaming items have nothing to write and return `Ok(None)`.
/// A relative path that is empty, absolute, or contains `..` is rejected
/// with [`HostError::OutsideOutput`].
pub async fn dest(item: &FileItem, out_dir: &Path) -> Result<Option<PathBuf>, HostError> {
    let Some(bytes) = item.contents() else {
        return Ok(None);
    };
    let relative = item.relative();
    if !stays_inside(relative) {
        return Err(HostError::OutsideOutput(relative.to_path_buf()));
    }
    let target = out_dir.join(relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, bytes).await?;
    tracing::debug!(path = %target.display(), bytes = bytes.len(), "wrote output");
    Ok(Some(target))
}

/// True when joining `relative` onto a directory stays inside it.
fn stays_inside(relative: &Path) -> bool {
    let mut has_name = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => has_name = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    has_name
}
