//! Reference site engine.
//!
//! A small deterministic [`Generator`] that renders a multilingual static
//! site from a JSON config. It is what the CLI runs and what the fixtures
//! exercise; any other engine can be plugged into the stage instead.
//!
//! ## Config Schema
//!
//! ```json
//! {
//!   "site": { "name": "Tateru Demo", "theme_color": "#111111" },
//!   "env": {
//!     "dev":  { "base_url": "http://localhost:8080" },
//!     "prod": { "base_url": "https://example.com" }
//!   },
//!   "translations": { "cs": { "nav": "Navigace" } },
//!   "pages": {
//!     "cs": {
//!       "index": { "title": "Homepage", "output": "index.html", "body": "# Vítejte" },
//!       "about": { "title": "About", "output": "about.html", "body_file": "content/about.md" },
//!       "feed":  { "title": "Feed", "output": "feed.json", "data": { "items": [] } }
//!     }
//!   }
//! }
//! ```
//!
//! ## Selection
//!
//! Languages and pages are visited in config order. The `lang` and `page`
//! filters narrow the set; a filter that matches nothing produces no files.
//! `env` picks an entry of the `env` table, and naming an environment that
//! does not exist is an error. Without `env`, no environment data is used.
//!
//! ## Output Types
//!
//! | Extension | File type | Contents |
//! |-----------|-----------|----------|
//! | `.html`, `.htm` | `html` | full document: nav, `<h2>Page {title}</h2>`, markdown body |
//! | `.json` | `json` | the page's `data` value, pretty-printed |
//! | `.webmanifest` | `manifest` | web app manifest built from `site` |
//! | anything else | extension | body verbatim |
//!
//! HTML is rendered with [maud](https://maud.lambda.xyz/), markdown with
//! pulldown-cmark.

use crate::engine::{BoxError, GenerateOptions, GeneratedFile, Generator};
use async_trait::async_trait;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CSS: &str = include_str!("../static/site.css");

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Invalid site config: {0}")]
    Schema(#[from] serde_json::Error),
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),
    #[error("pages.{0} must be an object of pages")]
    Language(String),
    #[error("Invalid page {lang}.{page}: {source}")]
    Page {
        lang: String,
        page: String,
        source: serde_json::Error,
    },
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteMeta,
    #[serde(default)]
    pub env: BTreeMap<String, EnvConfig>,
    #[serde(default)]
    pub translations: BTreeMap<String, BTreeMap<String, String>>,
    /// Language code → page id → page. Kept as a JSON map to preserve order.
    #[serde(default)]
    pub pages: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteMeta {
    pub name: String,
    pub description: Option<String>,
    pub theme_color: Option<String>,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            name: "Tateru".to_string(),
            description: None,
            theme_color: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvConfig {
    /// Absolute site URL used for canonical links and manifest `start_url`.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageSpec {
    pub title: String,
    /// Output path relative to the base.
    pub output: PathBuf,
    /// Inline markdown (html pages) or verbatim text (other types).
    #[serde(default)]
    pub body: String,
    /// Markdown file read relative to the working directory; wins over `body`.
    #[serde(default)]
    pub body_file: Option<PathBuf>,
    /// Payload of `.json` pages.
    #[serde(default)]
    pub data: Value,
    /// Base directory override for this page's output.
    #[serde(default)]
    pub base: Option<PathBuf>,
}

/// One page with its resolved body.
struct Page {
    id: String,
    spec: PageSpec,
    body: String,
}

/// Environment selected for a run.
struct Env<'a> {
    name: &'a str,
    config: &'a EnvConfig,
}

/// Rendering context shared by all pages of one language.
struct LangContext<'a> {
    lang: &'a str,
    site: &'a SiteMeta,
    env: Option<&'a Env<'a>>,
    nav_label: &'a str,
    pages: &'a [Page],
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SiteGenerator;

impl SiteGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render every selected page of `config`.
    pub async fn render(
        &self,
        config: &Value,
        options: &GenerateOptions,
        cwd: &Path,
    ) -> Result<Vec<GeneratedFile>, SiteError> {
        let site = SiteConfig::deserialize(config)?;

        let env_storage;
        let env = match &options.env {
            Some(name) => {
                let config = site
                    .env
                    .get(name)
                    .ok_or_else(|| SiteError::UnknownEnvironment(name.clone()))?;
                env_storage = Env {
                    name: name.as_str(),
                    config,
                };
                Some(&env_storage)
            }
            None => None,
        };

        let mut files = Vec::new();
        for (lang, pages) in &site.pages {
            if options.lang.as_ref().is_some_and(|wanted| wanted != lang) {
                continue;
            }
            let pages = load_pages(lang, pages, cwd).await?;
            let nav_label = site
                .translations
                .get(lang)
                .and_then(|t| t.get("nav"))
                .map(String::as_str)
                .unwrap_or("Navigation");
            let ctx = LangContext {
                lang,
                site: &site.site,
                env,
                nav_label,
                pages: &pages,
            };
            for page in &pages {
                if options.page.as_ref().is_some_and(|wanted| *wanted != page.id) {
                    continue;
                }
                files.push(render_page(&ctx, page));
            }
        }
        tracing::debug!(count = files.len(), ?options, "site rendered");
        Ok(files)
    }
}

#[async_trait]
impl Generator for SiteGenerator {
    async fn generate(
        &self,
        config: &Value,
        options: &GenerateOptions,
        cwd: &Path,
    ) -> Result<Vec<GeneratedFile>, BoxError> {
        Ok(self.render(config, options, cwd).await?)
    }
}

async fn load_pages(lang: &str, pages: &Value, cwd: &Path) -> Result<Vec<Page>, SiteError> {
    let pages = pages
        .as_object()
        .ok_or_else(|| SiteError::Language(lang.to_string()))?;
    let mut loaded = Vec::with_capacity(pages.len());
    for (id, raw) in pages {
        let spec = PageSpec::deserialize(raw).map_err(|source| SiteError::Page {
            lang: lang.to_string(),
            page: id.clone(),
            source,
        })?;
        let body = match &spec.body_file {
            Some(file) => {
                let path = cwd.join(file);
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| SiteError::Io { path, source })?
            }
            None => spec.body.clone(),
        };
        loaded.push(Page {
            id: id.clone(),
            spec,
            body,
        });
    }
    Ok(loaded)
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

fn is_html(path: &Path) -> bool {
    matches!(extension(path), Some("html" | "htm"))
}

/// URL path of an output, always with forward slashes.
fn href(output: &Path) -> String {
    let mut url = String::from("/");
    let parts: Vec<_> = output
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    url.push_str(&parts.join("/"));
    url
}

fn render_page(ctx: &LangContext<'_>, page: &Page) -> GeneratedFile {
    let output = &page.spec.output;
    let (contents, file_type) = match extension(output) {
        Some("html" | "htm") => (render_html(ctx, page).into_string(), Some("html")),
        Some("json") => (pretty(&page.spec.data), Some("json")),
        Some("webmanifest") => (render_manifest(ctx), Some("manifest")),
        other => (page.body.clone(), other),
    };
    let mut file = GeneratedFile::new(output.clone(), contents);
    file.file_type = file_type.map(str::to_owned);
    file.base = page.spec.base.clone();
    file
}

fn pretty(value: &Value) -> String {
    // Serializing a Value cannot fail.
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// ============================================================================
// HTML Components
// ============================================================================

fn render_html(ctx: &LangContext<'_>, page: &Page) -> Markup {
    let parser = Parser::new(&page.body);
    let mut body_html = String::new();
    md_html::push_html(&mut body_html, parser);

    let content = html! {
        header.site-header {
            span.site-name { (ctx.site.name) }
            (render_nav(ctx, &page.id))
        }
        main {
            h2 { "Page " (page.spec.title) }
            (PreEscaped(body_html))
        }
    };
    let title = format!("{} | {}", page.spec.title, ctx.site.name);
    base_document(ctx, &title, &page.spec.output, content)
}

/// Renders the base HTML document structure
fn base_document(ctx: &LangContext<'_>, title: &str, output: &Path, content: Markup) -> Markup {
    let canonical = ctx
        .env
        .and_then(|env| env.config.base_url.as_deref())
        .map(|url| format!("{}{}", url.trim_end_matches('/'), href(output)));
    html! {
        (DOCTYPE)
        html lang=(ctx.lang) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                @if let Some(description) = &ctx.site.description {
                    meta name="description" content=(description);
                }
                @if let Some(env) = ctx.env {
                    meta name="environment" content=(env.name);
                }
                @if let Some(canonical) = canonical {
                    link rel="canonical" href=(canonical);
                }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

/// Renders links to every html page of the language.
fn render_nav(ctx: &LangContext<'_>, current: &str) -> Markup {
    html! {
        nav.site-nav aria-label=(ctx.nav_label) {
            ul {
                @for page in ctx.pages.iter().filter(|p| is_html(&p.spec.output)) {
                    li class=[(page.id == current).then_some("current")] {
                        a href=(href(&page.spec.output)) { (page.spec.title) }
                    }
                }
            }
        }
    }
}

fn render_manifest(ctx: &LangContext<'_>) -> String {
    let start_url = ctx
        .env
        .and_then(|env| env.config.base_url.clone())
        .unwrap_or_else(|| "/".to_string());
    let mut manifest = json!({
        "name": ctx.site.name,
        "lang": ctx.lang,
        "start_url": start_url,
        "display": "standalone",
    });
    if let Some(color) = &ctx.site.theme_color {
        manifest["theme_color"] = json!(color);
    }
    pretty(&manifest)
}

// ============================================================================
// Tests
// ============================================================================
