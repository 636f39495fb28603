use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tateru_stage::config::{self, BuildConfig};
use tateru_stage::output::{self, OutputEntry};
use tateru_stage::pipeline::{self, PipelineOptions, PipelineSummary, StageEvent};
use tateru_stage::{SiteGenerator, TransformStage, host};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "tateru")]
#[command(about = "Build static sites from JSON site configs")]
#[command(long_about = "\
Build static sites from JSON site configs

Each tateru.config.json is handed to the site engine, which produces any
number of pages. Every page is optionally formatted and minified, then
written under the output directory.

Project structure:

  project/
  ├── tateru.toml                  # Build config (optional)
  └── site/
      ├── tateru.config.json       # Site config: site, env, translations, pages
      └── content/about.md         # Markdown referenced by body_file

Site config outline:

  {
    \"site\": { \"name\": \"Demo\" },
    \"env\": { \"prod\": { \"base_url\": \"https://example.org\" } },
    \"translations\": { \"cs\": { \"nav\": \"Navigace\" } },
    \"pages\": { \"cs\": { \"index\": { \"title\": \"Homepage\", \"output\": \"index.html\" } } }
  }

Run 'tateru gen-config' to generate a documented tateru.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Log progress of every step (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by `build` and `check`. Each one overrides `tateru.toml`.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Config files or directories to search for tateru.config.json
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Output directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Environment forwarded to the engine
    #[arg(long)]
    env: Option<String>,

    /// Only generate this language
    #[arg(long)]
    lang: Option<String>,

    /// Only generate this page
    #[arg(long)]
    page: Option<String>,

    /// Run the built-in formatter on every file
    #[arg(long)]
    format: bool,

    /// Run the built-in minifier on every file
    #[arg(long)]
    minify: bool,

    /// Stop at the first config file that fails
    #[arg(long)]
    halt_on_error: bool,

    /// Seconds allowed for generation and for each hook
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate every config and write the outputs
    Build(RunArgs),
    /// Generate every config without writing anything
    Check(RunArgs),
    /// Print a stock tateru.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Build(args) => run(&args, true).await,
        Command::Check(args) => run(&args, false).await,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return;
        }
    };

    match result {
        Ok(summary) if summary.failed > 0 => std::process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "tateru_stage=debug,tateru=debug"
    } else {
        "tateru_stage=info,tateru=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Merge command-line flags over the loaded build config.
fn apply_args(mut config: BuildConfig, args: &RunArgs) -> BuildConfig {
    if let Some(out) = &args.out {
        config.output = out.clone();
    }
    if args.env.is_some() {
        config.env = args.env.clone();
    }
    if args.lang.is_some() {
        config.lang = args.lang.clone();
    }
    if args.page.is_some() {
        config.page = args.page.clone();
    }
    if args.timeout.is_some() {
        config.timeout_secs = args.timeout;
    }
    config.post_process.format |= args.format;
    config.post_process.minify |= args.minify;
    config.halt_on_error |= args.halt_on_error;
    config
}

/// Run every config through the stage, writing outputs when `write` is set.
async fn run(args: &RunArgs, write: bool) -> Result<PipelineSummary, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let config = apply_args(config::load_config(&cwd)?, args);
    config.validate()?;
    let out_dir = cwd.join(&config.output);

    let items = host::src(&args.paths, &cwd).await?;
    if items.is_empty() {
        warn!("no {} found", host::CONFIG_FILE_NAME);
    }
    info!(configs = items.len(), ?config, "starting run");

    let stage = Arc::new(TransformStage::new(
        SiteGenerator::new(),
        config.to_stage_options(),
    ));
    let options = PipelineOptions {
        halt_on_error: config.halt_on_error,
        ..PipelineOptions::default()
    };
    let (tx, rx) = mpsc::channel(options.capacity);
    let (mut events, handle) = pipeline::spawn(stage, rx, options);

    let feeder = tokio::spawn(async move {
        for item in items {
            // Closed when the pipeline halted.
            if tx.send(item).await.is_err() {
                break;
            }
        }
    });

    let mut outputs = Vec::new();
    while let Some(event) = events.recv().await {
        match event {
            StageEvent::Data(item) => {
                let written = if write {
                    host::dest(&item, &out_dir).await?
                } else {
                    None
                };
                outputs.push(OutputEntry::new(&item, written));
            }
            StageEvent::Finished { source, .. } => {
                output::print_item_report(&shown(&source, &cwd), &outputs, None);
                outputs.clear();
            }
            StageEvent::Error { source, error } => {
                output::print_item_report(&shown(&source, &cwd), &outputs, Some(&error));
                outputs.clear();
            }
        }
    }

    feeder.await?;
    let summary = handle.await?;
    output::print_summary(if write { "Built" } else { "Checked" }, &summary);
    if write && summary.emitted > 0 {
        println!("==> Output: {}", out_dir.display());
    }
    Ok(summary)
}

fn shown(source: &Path, cwd: &Path) -> String {
    output::display_path(source, cwd)
}
