//! The generation engine contract.
//!
//! The transform stage hands a parsed config to a [`Generator`] and gets back
//! a list of [`GeneratedFile`] descriptors. What the engine does in between
//! (template lookup, translations, environment handling) is its own business.
//!
//! Engines may be async (implement [`Generator`] directly) or plain
//! functions (wrap them with [`from_fn`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Opaque error raised by engines and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A generation or hook call that ran past the stage's timeout.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("timed out after {0:?}")]
pub struct TimedOut(pub Duration);

/// Await `fut`, giving up after `limit` when one is set.
pub(crate) async fn within<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = T>,
) -> Result<T, TimedOut> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| TimedOut(limit)),
        None => Ok(fut.await),
    }
}

/// Filters forwarded to the engine for one item.
///
/// `None` means unfiltered: every environment default, every language,
/// every page, as the engine interprets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub env: Option<String>,
    pub lang: Option<String>,
    pub page: Option<String>,
}

/// One file produced by the engine, before post-processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub contents: String,
    /// Content tag passed to hooks, e.g. `html`, `json`, `manifest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Output path, relative to the base.
    pub path: PathBuf,
    /// Replaces the input item's base for this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<PathBuf>,
}

impl GeneratedFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            file_type: None,
            path: path.into(),
            base: None,
        }
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        config: &Value,
        options: &GenerateOptions,
        cwd: &Path,
    ) -> Result<Vec<GeneratedFile>, BoxError>;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Arc<G> {
    async fn generate(
        &self,
        config: &Value,
        options: &GenerateOptions,
        cwd: &Path,
    ) -> Result<Vec<GeneratedFile>, BoxError> {
        (**self).generate(config, options, cwd).await
    }
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Box<G> {
    async fn generate(
        &self,
        config: &Value,
        options: &GenerateOptions,
        cwd: &Path,
    ) -> Result<Vec<GeneratedFile>, BoxError> {
        (**self).generate(config, options, cwd).await
    }
}

/// A synchronous engine wrapped as a [`Generator`].
pub struct FnGenerator<F>(F);

/// Wrap a synchronous engine function.
pub fn from_fn<F>(f: F) -> FnGenerator<F>
where
    F: Fn(&Value, &GenerateOptions, &Path) -> Result<Vec<GeneratedFile>, BoxError> + Send + Sync,
{
    FnGenerator(f)
}

#[async_trait]
impl<F> Generator for FnGenerator<F>
where
    F: Fn(&Value, &GenerateOptions, &Path) -> Result<Vec<GeneratedFile>, BoxError> + Send + Sync,
{
    async fn generate(
        &self,
        config: &Value,
        options: &GenerateOptions,
        cwd: &Path,
    ) -> Result<Vec<GeneratedFile>, BoxError> {
        (self.0)(config, options, cwd)
    }
}
