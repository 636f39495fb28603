//! The transform stage.
//!
//! Turns one config item into zero or more generated items. Per item:
//!
//! ```text
//! Received ─▶ Null ──────▶ passthrough ─▶ Done
//!          ├▶ Streaming ─▶ Failed(StreamingUnsupported)
//!          └▶ Buffered ──▶ decode ─▶ generate ─▶ for each file:
//!                            │          │          formatter → minify → push
//!                            ▼          ▼                       │
//!               Failed(InvalidConfig)  Failed(GenerationFailed) ├▶ Failed(PostProcessingFailed)
//!                                                               ▼
//!                                                             Done
//! ```
//!
//! [`TransformStage::transform`] returns exactly one `Result` per item, so an
//! item either completes or fails, once. Files are processed and pushed one
//! at a time in engine order. When a hook fails mid fan-out, the files
//! already pushed stay pushed and nothing after the failure is emitted.
//!
//! ## Paths of generated items
//!
//! | Field | Value |
//! |-------|-------|
//! | `cwd` | input item's `cwd` |
//! | `base` | file's base override, else input item's `base` |
//! | `path` | `base` joined with the file's relative path |

use crate::engine::{BoxError, GeneratedFile, Generator, within};
use crate::hooks::{HookChain, HookKind};
use crate::item::{ItemClass, ItemSink, PipelineItem};
use crate::options::StageOptions;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Identity reported with every stage error.
pub const PLUGIN_NAME: &str = "tateru-stage";

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Streaming not supported")]
    StreamingUnsupported,
    #[error("Invalid JSON config file")]
    InvalidConfig,
    #[error("Generation failed: {source}")]
    GenerationFailed {
        plugin: &'static str,
        source: BoxError,
    },
    #[error("{hook} failed for {}: {source}", .path.display())]
    PostProcessingFailed {
        plugin: &'static str,
        hook: HookKind,
        path: PathBuf,
        source: BoxError,
    },
}

/// Tag for matching on the failure class without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StreamingUnsupported,
    InvalidConfig,
    GenerationFailed,
    PostProcessingFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::StreamingUnsupported => "StreamingUnsupported",
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::GenerationFailed => "GenerationFailed",
            ErrorKind::PostProcessingFailed => "PostProcessingFailed",
        };
        f.write_str(name)
    }
}

impl StageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StageError::StreamingUnsupported => ErrorKind::StreamingUnsupported,
            StageError::InvalidConfig => ErrorKind::InvalidConfig,
            StageError::GenerationFailed { .. } => ErrorKind::GenerationFailed,
            StageError::PostProcessingFailed { .. } => ErrorKind::PostProcessingFailed,
        }
    }

    pub fn plugin(&self) -> &'static str {
        match self {
            StageError::GenerationFailed { plugin, .. }
            | StageError::PostProcessingFailed { plugin, .. } => *plugin,
            _ => PLUGIN_NAME,
        }
    }

    /// One-line message attributed to the stage, for host error reporters.
    pub fn report(&self) -> String {
        format!("[{}] {}", self.plugin(), self)
    }
}

/// Converts config items into generated items through a [`Generator`].
pub struct TransformStage<G> {
    generator: G,
    options: StageOptions,
    hooks: HookChain,
}

impl<G: fmt::Debug> fmt::Debug for TransformStage<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformStage")
            .field("generator", &self.generator)
            .field("options", &self.options)
            .finish()
    }
}

impl<G: Generator> TransformStage<G> {
    pub fn new(generator: G, options: StageOptions) -> Self {
        let hooks = options.hook_chain();
        Self {
            generator,
            options,
            hooks,
        }
    }

    pub fn options(&self) -> &StageOptions {
        &self.options
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Process one item, pushing results to `sink`.
    ///
    /// Returns the number of generated items pushed. A passed-through null
    /// item counts as zero.
    pub async fn transform<I, S>(&self, item: I, sink: &mut S) -> Result<usize, StageError>
    where
        I: PipelineItem,
        S: ItemSink<I> + ?Sized,
    {
        let source = item.path().to_path_buf();
        let result = self.run(item, sink).await;
        match &result {
            Ok(emitted) => info!(path = %source.display(), emitted, "item done"),
            Err(err) => warn!(path = %source.display(), kind = %err.kind(), "{}", err.report()),
        }
        result
    }

    async fn run<I, S>(&self, item: I, sink: &mut S) -> Result<usize, StageError>
    where
        I: PipelineItem,
        S: ItemSink<I> + ?Sized,
    {
        let class = ItemClass::of(&item);
        debug!(path = %item.path().display(), ?class, "received item");
        match class {
            ItemClass::Null => {
                sink.push(item).await;
                return Ok(0);
            }
            ItemClass::Streaming => return Err(StageError::StreamingUnsupported),
            ItemClass::Buffered => {}
        }

        let config = decode(item.contents())?;
        let cwd = item.cwd().to_path_buf();
        let base = item.base().to_path_buf();
        drop(item);

        let files = self.generate(&config, &cwd).await?;
        debug!(count = files.len(), "generated files");

        let mut emitted = 0;
        for file in files {
            let output: I = self.post_process(file, &cwd, &base).await?;
            sink.push(output).await;
            emitted += 1;
        }
        Ok(emitted)
    }

    async fn generate(&self, config: &Value, cwd: &Path) -> Result<Vec<GeneratedFile>, StageError> {
        let options = self.options.derive();
        let call = self.generator.generate(config, &options, cwd);
        let result = match within(self.options.timeout, call).await {
            Ok(result) => result,
            Err(elapsed) => Err(Box::new(elapsed) as BoxError),
        };
        result.map_err(|source| StageError::GenerationFailed {
            plugin: PLUGIN_NAME,
            source,
        })
    }

    async fn post_process<I: PipelineItem>(
        &self,
        file: GeneratedFile,
        cwd: &Path,
        base: &Path,
    ) -> Result<I, StageError> {
        let contents = self
            .hooks
            .apply(file.contents, file.file_type.as_deref())
            .await
            .map_err(|failure| StageError::PostProcessingFailed {
                plugin: PLUGIN_NAME,
                hook: failure.kind,
                path: file.path.clone(),
                source: failure.error,
            })?;
        let base = file.base.unwrap_or_else(|| base.to_path_buf());
        let path = base.join(&file.path);
        debug!(path = %path.display(), file_type = ?file.file_type, "emit");
        Ok(I::create(contents.into_bytes(), cwd.to_path_buf(), base, path))
    }
}

/// Parse buffered content as a JSON object.
fn decode(contents: Option<&[u8]>) -> Result<Value, StageError> {
    let bytes = contents.ok_or(StageError::InvalidConfig)?;
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => {
            debug!("config is valid JSON but not an object");
            Err(StageError::InvalidConfig)
        }
        Err(err) => {
            debug!(error = %err, "config parse failed");
            Err(StageError::InvalidConfig)
        }
    }
}
