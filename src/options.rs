//! Stage options.
//!
//! [`StageOptions`] is fixed when a stage is built and shared read-only by
//! every item the stage processes. The engine never sees it directly: each
//! item gets a fresh [`GenerateOptions`] from [`StageOptions::derive`], and the
//! hooks stay with the stage as a [`HookChain`].

use crate::engine::GenerateOptions;
use crate::hooks::{Hook, HookChain, HookKind};
use std::fmt;
use std::time::Duration;

#[derive(Clone, Default)]
pub struct StageOptions {
    /// Environment name, e.g. `dev` or `prod`.
    pub env: Option<String>,
    /// Language code, e.g. `cs`.
    pub lang: Option<String>,
    /// Page identifier, e.g. `about`.
    pub page: Option<String>,
    pub formatter: Option<Hook>,
    pub minify: Option<Hook>,
    /// Upper bound for the generation call and for each hook call.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for StageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageOptions")
            .field("env", &self.env)
            .field("lang", &self.lang)
            .field("page", &self.page)
            .field("formatter", &self.formatter.is_some())
            .field("minify", &self.minify.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn formatter(mut self, formatter: Hook) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn minify(mut self, minify: Hook) -> Self {
        self.minify = Some(minify);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Engine options for one item.
    pub fn derive(&self) -> GenerateOptions {
        GenerateOptions {
            env: self.env.clone(),
            lang: self.lang.clone(),
            page: self.page.clone(),
        }
    }

    /// Configured hooks, formatter before minify.
    pub fn hook_chain(&self) -> HookChain {
        let mut chain = HookChain::new().with_timeout(self.timeout);
        if let Some(formatter) = &self.formatter {
            chain.push(HookKind::Formatter, formatter.clone());
        }
        if let Some(minify) = &self.minify {
            chain.push(HookKind::Minify, minify.clone());
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks;

    #[test]
    fn default_options_are_unfiltered() {
        let options = StageOptions::new();
        assert_eq!(options.derive(), GenerateOptions::default());
        assert!(options.hook_chain().is_empty());
    }

    #[test]
    fn derive_copies_filters() {
        let options = StageOptions::new().env("prod").lang("cs").page("index");
        let derived = options.derive();
        assert_eq!(derived.env.as_deref(), Some("prod"));
        assert_eq!(derived.lang.as_deref(), Some("cs"));
        assert_eq!(derived.page.as_deref(), Some("index"));
    }

    #[test]
    fn derive_returns_independent_values() {
        let options = StageOptions::new().page("about");
        let mut first = options.derive();
        first.page = Some("contact".into());
        assert_eq!(options.derive().page.as_deref(), Some("about"));
    }

    #[test]
    fn hook_chain_puts_formatter_first() {
        // Set minify before formatter to show order comes from the role.
        let options = StageOptions::new()
            .minify(hooks::compact())
            .formatter(hooks::tidy());
        assert_eq!(
            options.hook_chain().kinds(),
            vec![HookKind::Formatter, HookKind::Minify]
        );
    }

    #[test]
    fn hook_chain_with_only_minify() {
        let options = StageOptions::new().minify(hooks::compact());
        assert_eq!(options.hook_chain().kinds(), vec![HookKind::Minify]);
    }

    #[test]
    fn debug_hides_hook_closures() {
        let options = StageOptions::new().formatter(hooks::tidy());
        let debug = format!("{options:?}");
        assert!(debug.contains("formatter: true"));
        assert!(debug.contains("minify: false"));
    }
}
