//! The pipeline item protocol.
//!
//! The transform stage never sees a concrete file object. Whatever the host
//! pipeline passes around (an in-memory file, a virtual file, a message on a
//! queue) only has to answer a handful of questions and be constructible
//! from generated content. An adapter per host implements [`PipelineItem`];
//! the filesystem adapter lives in [`crate::host`].
//!
//! ## Classification
//!
//! Every incoming item falls into exactly one class:
//!
//! | Class | Predicate | Stage behavior |
//! |-------|-----------|----------------|
//! | Null | [`is_null`](PipelineItem::is_null) | passed through unchanged |
//! | Streaming | [`is_stream`](PipelineItem::is_stream) | rejected |
//! | Buffered | neither | decoded and generated from |
//!
//! Null wins over streaming: a placeholder item is never inspected further.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// One item flowing through a host pipeline.
pub trait PipelineItem: Send + Sized {
    /// True for marker items that carry no payload at all.
    fn is_null(&self) -> bool;

    /// True when the payload is delivered incrementally instead of buffered.
    fn is_stream(&self) -> bool;

    /// The fully buffered payload. `None` for null and streaming items.
    fn contents(&self) -> Option<&[u8]>;

    /// Working directory the item was read relative to.
    fn cwd(&self) -> &Path;

    /// Base directory; output paths are written relative to it.
    fn base(&self) -> &Path;

    /// Full path of the item.
    fn path(&self) -> &Path;

    /// Path relative to [`base`](PipelineItem::base), falling back to the
    /// full path when the item does not live under its base.
    fn relative(&self) -> &Path {
        self.path().strip_prefix(self.base()).unwrap_or(self.path())
    }

    /// Build a new buffered item. Used by the stage to emit generated files.
    fn create(contents: Vec<u8>, cwd: PathBuf, base: PathBuf, path: PathBuf) -> Self;
}

/// Classification of an incoming item, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
    Null,
    Streaming,
    Buffered,
}

impl ItemClass {
    pub fn of<I: PipelineItem>(item: &I) -> Self {
        if item.is_null() {
            ItemClass::Null
        } else if item.is_stream() {
            ItemClass::Streaming
        } else {
            ItemClass::Buffered
        }
    }
}

/// Downstream receiver of emitted items.
///
/// Pushing is async so that bounded channels can apply backpressure; the
/// stage awaits each push before processing the next descriptor.
#[async_trait]
pub trait ItemSink<I: Send>: Send {
    async fn push(&mut self, item: I);
}

#[async_trait]
impl<I: Send> ItemSink<I> for Vec<I> {
    async fn push(&mut self, item: I) {
        Vec::push(self, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FileItem;

    #[test]
    fn classify_null_item() {
        let item = FileItem::null("/work", "/work", "/work/marker");
        assert_eq!(ItemClass::of(&item), ItemClass::Null);
    }

    #[test]
    fn classify_streaming_item() {
        let item = FileItem::stream(
            "/work",
            "/work",
            "/work/tateru.config.json",
            tokio::io::empty(),
        );
        assert_eq!(ItemClass::of(&item), ItemClass::Streaming);
    }

    #[test]
    fn classify_buffered_item() {
        let item = FileItem::buffer("/work", "/work", "/work/tateru.config.json", b"{}".to_vec());
        assert_eq!(ItemClass::of(&item), ItemClass::Buffered);
    }

    #[test]
    fn relative_strips_base() {
        let item = FileItem::buffer("/work", "/work/src", "/work/src/cs/index.html", vec![]);
        assert_eq!(item.relative(), Path::new("cs/index.html"));
    }

    #[test]
    fn relative_outside_base_is_full_path() {
        let item = FileItem::buffer("/work", "/elsewhere", "/work/index.html", vec![]);
        assert_eq!(item.relative(), Path::new("/work/index.html"));
    }

    #[tokio::test]
    async fn vec_sink_keeps_push_order() {
        let mut sink: Vec<u32> = Vec::new();
        ItemSink::push(&mut sink, 1).await;
        ItemSink::push(&mut sink, 2).await;
        assert_eq!(sink, vec![1, 2]);
    }
}
