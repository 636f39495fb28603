//! Post-processing hooks applied to each generated file.
//!
//! A hook takes the file contents and its type tag and resolves to new
//! contents. Hooks run as an ordered [`HookChain`]: the formatter first,
//! then minify, each awaited before the next starts. Adding another step
//! later means adding another [`HookKind`], not touching the fan-out.
//!
//! Two built-in hooks back the CLI's `--format` and `--minify` flags:
//! [`tidy`] and [`compact`].

use crate::engine::{BoxError, within};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// An async unary transform over file contents.
pub type Hook =
    Arc<dyn Fn(String, Option<String>) -> BoxFuture<'static, Result<String, BoxError>> + Send + Sync>;

/// Build a [`Hook`] from an async closure.
///
/// ```ignore
/// let formatter = hook(|contents, file_type| async move {
///     Ok(format!("FORMATTED ({}): {contents}", file_type.unwrap_or_default()))
/// });
/// ```
pub fn hook<F, Fut>(f: F) -> Hook
where
    F: Fn(String, Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
{
    Arc::new(
        move |contents: String, file_type: Option<String>| -> BoxFuture<'static, Result<String, BoxError>> {
            Box::pin(f(contents, file_type))
        },
    )
}

/// Which post-processing step a hook fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Formatter,
    Minify,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Formatter => f.write_str("formatter"),
            HookKind::Minify => f.write_str("minify"),
        }
    }
}

/// Hooks in application order.
#[derive(Clone, Default)]
pub struct HookChain {
    steps: Vec<(HookKind, Hook)>,
    timeout: Option<Duration>,
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|(kind, _)| kind))
            .finish()
    }
}

/// A hook failure, tagged with the step that raised it.
#[derive(Debug)]
pub struct HookFailure {
    pub kind: HookKind,
    pub error: BoxError,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every step by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn push(&mut self, kind: HookKind, hook: Hook) {
        self.steps.push((kind, hook));
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn kinds(&self) -> Vec<HookKind> {
        self.steps.iter().map(|(kind, _)| *kind).collect()
    }

    /// Run every step left to right, feeding each step the previous output.
    pub async fn apply(
        &self,
        mut contents: String,
        file_type: Option<&str>,
    ) -> Result<String, HookFailure> {
        for (kind, hook) in &self.steps {
            let step = hook(contents, file_type.map(str::to_owned));
            contents = match within(self.timeout, step).await {
                Ok(result) => result.map_err(|error| HookFailure { kind: *kind, error })?,
                Err(elapsed) => {
                    return Err(HookFailure {
                        kind: *kind,
                        error: Box::new(elapsed),
                    });
                }
            };
        }
        Ok(contents)
    }
}

// ============================================================================
// Built-in hooks
// ============================================================================

/// Formatter: pretty-print JSON, otherwise strip trailing whitespace per line
/// and end with exactly one newline.
pub fn tidy() -> Hook {
    hook(|contents, file_type| async move { tidy_text(&contents, file_type.as_deref()) })
}

/// Minify: compact JSON and collapse whitespace in markup. Other file types
/// pass through unchanged.
pub fn compact() -> Hook {
    hook(|contents, file_type| async move { compact_text(&contents, file_type.as_deref()) })
}

fn is_json(file_type: Option<&str>) -> bool {
    matches!(file_type, Some("json" | "manifest"))
}

pub(crate) fn tidy_text(contents: &str, file_type: Option<&str>) -> Result<String, BoxError> {
    if is_json(file_type) {
        let value: serde_json::Value = serde_json::from_str(contents)?;
        let mut out = serde_json::to_string_pretty(&value)?;
        out.push('\n');
        return Ok(out);
    }
    let mut out = String::with_capacity(contents.len() + 1);
    for line in contents.trim_end().lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    Ok(out)
}

pub(crate) fn compact_text(contents: &str, file_type: Option<&str>) -> Result<String, BoxError> {
    if is_json(file_type) {
        let value: serde_json::Value = serde_json::from_str(contents)?;
        return Ok(serde_json::to_string(&value)?);
    }
    if !is_markup(file_type) {
        return Ok(contents.to_string());
    }
    let mut out = String::with_capacity(contents.len());
    let mut rest = contents;
    // <pre> blocks keep their whitespace.
    while let Some(start) = find_pre(rest) {
        collapse_whitespace(&rest[..start], &mut out);
        let block = &rest[start..];
        let end = block
            .find("</pre>")
            .map_or(block.len(), |i| i + "</pre>".len());
        out.push_str(&block[..end]);
        rest = &block[end..];
    }
    collapse_whitespace(rest, &mut out);
    Ok(out.trim().to_string())
}

fn is_markup(file_type: Option<&str>) -> bool {
    matches!(file_type, Some("html" | "htm" | "xml" | "svg"))
}

fn find_pre(text: &str) -> Option<usize> {
    text.match_indices("<pre").map(|(i, _)| i).find(|&i| {
        text[i + 4..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c.is_whitespace())
    })
}

/// Append `text` to `out` with each whitespace run reduced to one space.
/// A run between `>` and `<` is dropped entirely.
fn collapse_whitespace(text: &str, out: &mut String) {
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() && !(out.ends_with('>') && c == '<') {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    // A run at the end of a segment is followed by a <pre> tag or the end.
    if pending_space && !out.is_empty() && !out.ends_with('>') {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper() -> Hook {
        hook(|contents, _| async move { Ok::<_, BoxError>(contents.to_uppercase()) })
    }

    fn tag() -> Hook {
        hook(|contents, file_type| async move {
            Ok::<_, BoxError>(format!("{}:{contents}", file_type.unwrap_or_default()))
        })
    }

    #[tokio::test]
    async fn empty_chain_is_identity() {
        let chain = HookChain::new();
        assert_eq!(chain.apply("abc".into(), None).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn chain_applies_left_to_right() {
        let mut chain = HookChain::new();
        chain.push(HookKind::Formatter, tag());
        chain.push(HookKind::Minify, upper());
        let out = chain.apply("page".into(), Some("html")).await.unwrap();
        assert_eq!(out, "HTML:PAGE");
    }

    #[tokio::test]
    async fn failure_names_the_step() {
        let mut chain = HookChain::new();
        chain.push(HookKind::Formatter, upper());
        chain.push(
            HookKind::Minify,
            hook(|_, _| async move { Err::<String, BoxError>("boom".into()) }),
        );
        let failure = chain.apply("x".into(), None).await.unwrap_err();
        assert_eq!(failure.kind, HookKind::Minify);
        assert_eq!(failure.error.to_string(), "boom");
    }

    #[tokio::test]
    async fn slow_step_times_out() {
        let mut chain = HookChain::new().with_timeout(Some(Duration::from_millis(10)));
        chain.push(
            HookKind::Formatter,
            hook(|contents, _| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, BoxError>(contents)
            }),
        );
        let failure = chain.apply("x".into(), None).await.unwrap_err();
        assert_eq!(failure.kind, HookKind::Formatter);
        assert_eq!(failure.error.to_string(), "timed out after 10ms");
    }

    #[test]
    fn hook_kind_display() {
        assert_eq!(HookKind::Formatter.to_string(), "formatter");
        assert_eq!(HookKind::Minify.to_string(), "minify");
    }

    #[test]
    fn chain_debug_lists_kinds() {
        let mut chain = HookChain::new();
        chain.push(HookKind::Minify, upper());
        assert_eq!(format!("{chain:?}"), "[Minify]");
    }

    #[test]
    fn tidy_trims_trailing_whitespace() {
        let out = tidy_text("<p>a</p>   \n<p>b</p>\n\n\n", Some("html")).unwrap();
        assert_eq!(out, "<p>a</p>\n<p>b</p>\n");
    }

    #[test]
    fn tidy_pretty_prints_json() {
        let out = tidy_text(r#"{"a":1}"#, Some("json")).unwrap();
        assert_eq!(out, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn tidy_rejects_broken_json() {
        assert!(tidy_text("{", Some("json")).is_err());
    }

    #[test]
    fn compact_collapses_markup_whitespace() {
        let out = compact_text("<div>\n  <p>Hello   world</p>\n</div>\n", Some("html")).unwrap();
        assert_eq!(out, "<div><p>Hello world</p></div>");
    }

    #[test]
    fn compact_minifies_json() {
        let out = compact_text("{\n  \"a\": [1, 2]\n}", Some("manifest")).unwrap();
        assert_eq!(out, r#"{"a":[1,2]}"#);
    }

    #[tokio::test]
    async fn builtin_hooks_are_async_wrappers() {
        let out = compact()("<ul>\n  <li> a </li>\n</ul>".into(), Some("html".into()))
            .await
            .unwrap();
        assert_eq!(out, "<ul><li> a </li></ul>");
    }

    #[test]
    fn compact_keeps_space_around_inline_tags() {
        let html = "<p>Vítejte na <strong>Tateru</strong> dnes.</p>\n<p>B</p>\n";
        let out = compact_text(html, Some("html")).unwrap();
        assert_eq!(out, "<p>Vítejte na <strong>Tateru</strong> dnes.</p><p>B</p>");
    }

    #[test]
    fn compact_preserves_pre_blocks() {
        let html = "<div>\n  <pre><code>fn main() {\n    run();\n}\n</code></pre>\n  <p>a  b</p>\n</div>";
        let out = compact_text(html, Some("html")).unwrap();
        assert_eq!(
            out,
            "<div><pre><code>fn main() {\n    run();\n}\n</code></pre><p>a b</p></div>"
        );
    }

    #[test]
    fn compact_leaves_plain_text_alone() {
        let robots = "User-agent: *\nDisallow: /private\n";
        assert_eq!(compact_text(robots, Some("txt")).unwrap(), robots);
        assert_eq!(compact_text(robots, None).unwrap(), robots);
    }
}
