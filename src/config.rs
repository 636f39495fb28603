//! Build configuration module.
//!
//! Handles loading and validating `tateru.toml`. Keys missing from the file
//! take their defaults, and command-line flags override both.
//!
//! ## Config File Location
//!
//! Place `tateru.toml` in the directory `tateru` is run from:
//!
//! ```text
//! project/
//! ├── tateru.toml              # Build config (optional)
//! └── site/
//!     └── tateru.config.json   # Site config consumed by the stage
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output = "dist"           # Directory generated files are written to
//! # env = "prod"            # Environment forwarded to the engine
//! # lang = "cs"             # Only generate this language
//! # page = "index"          # Only generate this page
//! halt_on_error = false     # Stop at the first failed config file
//! # timeout_secs = 30       # Bound for generation and each hook call
//!
//! [post_process]
//! format = false            # Run the built-in formatter on every file
//! minify = false            # Run the built-in minifier on every file
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::hooks;
use crate::options::StageOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the build config file looked up in the project directory.
pub const BUILD_CONFIG_FILE: &str = "tateru.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `tateru.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory generated files are written to.
    pub output: PathBuf,
    /// Environment name forwarded to the engine.
    pub env: Option<String>,
    /// Language filter forwarded to the engine.
    pub lang: Option<String>,
    /// Page filter forwarded to the engine.
    pub page: Option<String>,
    /// Stop processing further config files after the first failure.
    pub halt_on_error: bool,
    /// Seconds allowed for the generation call and for each hook call.
    pub timeout_secs: Option<u64>,
    pub post_process: PostProcessConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("dist"),
            env: None,
            lang: None,
            page: None,
            halt_on_error: false,
            timeout_secs: None,
            post_process: PostProcessConfig::default(),
        }
    }
}

/// Built-in post-processing hooks to enable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostProcessConfig {
    /// Tidy every generated file (pretty JSON, trimmed lines).
    pub format: bool,
    /// Compact every generated file (compact JSON, collapsed whitespace).
    pub minify: bool,
}

impl BuildConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Validation("output must not be empty".into()));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        for (key, value) in [("env", &self.env), ("lang", &self.lang), ("page", &self.page)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "{key} must not be blank when set"
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Stage options for this build: filters, timeout, and built-in hooks.
    pub fn to_stage_options(&self) -> StageOptions {
        let mut options = StageOptions {
            env: self.env.clone(),
            lang: self.lang.clone(),
            page: self.page.clone(),
            timeout: self.timeout(),
            ..StageOptions::default()
        };
        if self.post_process.format {
            options = options.formatter(hooks::tidy());
        }
        if self.post_process.minify {
            options = options.minify(hooks::compact());
        }
        options
    }
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse and validate `tateru.toml` contents.
pub fn parse_config(content: &str) -> Result<BuildConfig, ConfigError> {
    let config: BuildConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `tateru.toml` in the given directory.
///
/// Returns the defaults when no `tateru.toml` exists. Rejects unknown keys
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<BuildConfig, ConfigError> {
    let config_path = dir.join(BUILD_CONFIG_FILE);
    if !config_path.exists() {
        return Ok(BuildConfig::default());
    }
    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `tateru.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Tateru Build Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override the values in this file.
# Unknown keys will cause an error.

# Directory generated files are written to.
output = "dist"

# Environment forwarded to the engine (must exist under "env" in the site config).
# env = "prod"

# Only generate pages of this language.
# lang = "cs"

# Only generate this page.
# page = "index"

# Stop at the first config file that fails instead of continuing with the rest.
halt_on_error = false

# Seconds allowed for generation and for each post-processing hook.
# Omit to wait indefinitely.
# timeout_secs = 30

# ---------------------------------------------------------------------------
# Post-processing
# ---------------------------------------------------------------------------
[post_process]
# Tidy every generated file: pretty JSON, trailing whitespace removed.
format = false

# Compact every generated file: compact JSON, collapsed whitespace.
minify = false
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookKind;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = BuildConfig::default();
        assert_eq!(config.output, PathBuf::from("dist"));
        assert_eq!(config.env, None);
        assert!(!config.halt_on_error);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.post_process, PostProcessConfig::default());
    }

    #[test]
    fn parse_partial_config() {
        let config: BuildConfig = toml::from_str(
            r#"
env = "prod"

[post_process]
minify = true
"#,
        )
        .unwrap();
        assert_eq!(config.env.as_deref(), Some("prod"));
        assert!(config.post_process.minify);
        // Defaults preserved
        assert!(!config.post_process.format);
        assert_eq!(config.output, PathBuf::from("dist"));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(BUILD_CONFIG_FILE),
            r#"
output = "public"
lang = "cs"
timeout_secs = 5
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.output, PathBuf::from("public"));
        assert_eq!(config.lang.as_deref(), Some("cs"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.page, None);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(BUILD_CONFIG_FILE), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(BUILD_CONFIG_FILE), "timeout_secs = 0").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<BuildConfig, _> = toml::from_str("halt_on_eror = true");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<BuildConfig, _> = toml::from_str(
            r#"
[post_process]
prettify = true
"#,
        );
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(BuildConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_empty_output() {
        let config = BuildConfig {
            output: PathBuf::new(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output"));
    }

    #[test]
    fn validate_blank_filter() {
        let config = BuildConfig {
            page: Some("  ".into()),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("page"));
    }

    // =========================================================================
    // parse_config tests
    // =========================================================================

    #[test]
    fn parse_config_empty_is_default() {
        assert_eq!(parse_config("").unwrap(), BuildConfig::default());
    }

    #[test]
    fn parse_config_keeps_unset_nested_defaults() {
        let config = parse_config("[post_process]\nminify = true\n").unwrap();
        assert!(config.post_process.minify);
        assert!(!config.post_process.format);
        assert_eq!(config.output, PathBuf::from("dist"));
    }

    #[test]
    fn parse_config_validates() {
        let result = parse_config("output = \"\"");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Stage options
    // =========================================================================

    #[test]
    fn to_stage_options_carries_filters_and_timeout() {
        let config = BuildConfig {
            env: Some("prod".into()),
            lang: Some("cs".into()),
            page: Some("index".into()),
            timeout_secs: Some(3),
            ..Default::default()
        };
        let options = config.to_stage_options();
        assert_eq!(options.env.as_deref(), Some("prod"));
        assert_eq!(options.lang.as_deref(), Some("cs"));
        assert_eq!(options.page.as_deref(), Some("index"));
        assert_eq!(options.timeout, Some(Duration::from_secs(3)));
        assert!(options.hook_chain().is_empty());
    }

    #[test]
    fn to_stage_options_enables_builtin_hooks() {
        let config = BuildConfig {
            post_process: PostProcessConfig {
                format: true,
                minify: true,
            },
            ..Default::default()
        };
        assert_eq!(
            config.to_stage_options().hook_chain().kinds(),
            vec![HookKind::Formatter, HookKind::Minify]
        );
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: BuildConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn stock_config_toml_mentions_every_key() {
        let content = stock_config_toml();
        for key in [
            "output",
            "env",
            "lang",
            "page",
            "halt_on_error",
            "timeout_secs",
            "[post_process]",
            "format",
            "minify",
        ] {
            assert!(content.contains(key), "missing {key}");
        }
    }
}
