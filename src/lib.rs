//! # Tateru Stage
//!
//! A build-pipeline stage that turns site configuration files into generated
//! site files. One JSON config goes in; every page it describes comes out as
//! its own item, optionally formatted and minified on the way.
//!
//! # Architecture: One Item In, Many Items Out
//!
//! ```text
//! host::src  config files  →  FileItem (buffered JSON)
//! stage      FileItem      →  Generator::generate  →  hooks  →  FileItem × N
//! host::dest FileItem      →  out_dir/relative path
//! ```
//!
//! The stage knows nothing about templates or the filesystem. It sees items
//! through the [`PipelineItem`] trait, hands the parsed config to a
//! [`Generator`], and pushes each result to an [`ItemSink`] as soon as it has
//! been post-processed. Hosts decide where items come from and where they go.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`stage`] | The transform stage: classification, decoding, fan-out, error kinds |
//! | [`engine`] | The `Generator` contract and the `GeneratedFile` descriptor |
//! | [`hooks`] | Formatter and minify hooks, the ordered hook chain, built-in hooks |
//! | [`options`] | Stage options and the per-item engine options derived from them |
//! | [`item`] | The item protocol (`PipelineItem`) and output sinks (`ItemSink`) |
//! | [`host`] | Filesystem items: reading configs (`src`) and writing outputs (`dest`) |
//! | [`pipeline`] | Drives a stage over many items, reporting data, error, and finish events |
//! | [`site`] | Reference engine: renders pages, JSON data, and manifests with Maud |
//! | [`config`] | `tateru.toml` loading, validation, and merging for the CLI |
//! | [`output`] | CLI output formatting: per-config listings with content digests |
//!
//! # Design Decisions
//!
//! ## Stream As You Go
//!
//! Generated files are post-processed and pushed one at a time, in engine
//! order. If a hook fails on the third file, the first two have already been
//! pushed and stay pushed; the item then fails. Downstream stages see output
//! as soon as it exists instead of waiting for a whole site.
//!
//! ## Hooks Are Plain Async Functions
//!
//! A hook is `Fn(String, Option<String>) -> Future<Result<String, _>>`. The
//! stage passes the file type tag along so one hook can treat HTML and JSON
//! differently. The formatter always runs before minify, regardless of the
//! order they were configured in.
//!
//! ## Errors Carry a Kind
//!
//! Every failure is a [`StageError`] with a stable [`ErrorKind`] tag and the
//! plugin identity `tateru-stage`, so hosts can route errors without
//! matching on message text.

pub mod config;
pub mod engine;
pub mod hooks;
pub mod host;
pub mod item;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod site;
pub mod stage;

pub use engine::{BoxError, GenerateOptions, GeneratedFile, Generator, from_fn};
pub use hooks::{Hook, HookKind, hook};
pub use host::FileItem;
pub use item::{ItemSink, PipelineItem};
pub use options::StageOptions;
pub use site::SiteGenerator;
pub use stage::{ErrorKind, PLUGIN_NAME, StageError, TransformStage};

#[cfg(test)]
pub(crate) mod test_helpers;
