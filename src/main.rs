#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, ValueEnum};
use modelsync::app::Updater;
use modelsync::config::{Config, RunOptions, UpdateMethod};
use modelsync::error::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modelsync")]
#[command(about = "Check installed models against the registry and pull outdated ones", long_about = None)]
#[command(version)]
struct Cli {
    /// Model names or digests to skip (comma-separated, repeatable)
    #[arg(long, value_name = "NAMES")]
    skip: Vec<String>,

    /// Ask before updating
    #[arg(long)]
    confirm: bool,

    /// Print a per-model status table after checking
    #[arg(short, long)]
    verbose: bool,

    /// Update all outdated models at once with progress bars
    #[arg(short, long)]
    parallel: bool,

    /// Check only, never update
    #[arg(long)]
    dry_run: bool,

    /// Max concurrent registry requests (0 = unbounded)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// How to pull updates
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Config file (default: ~/.config/modelsync/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Command,
    Stream,
}

impl From<MethodArg> for UpdateMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Command => Self::Command,
            MethodArg::Stream => Self::Stream,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(jobs) = cli.jobs {
        config.registry.max_concurrent_checks = jobs;
    }
    if let Some(method) = cli.method {
        config.update.method = method.into();
    }
    tracing::debug!("Using config: {config:?}");

    let options = RunOptions {
        skip: RunOptions::parse_skip(&cli.skip),
        confirm: cli.confirm,
        verbose: cli.verbose,
        parallel: cli.parallel,
        dry_run: cli.dry_run,
    };

    let summary = Updater::from_config(&config, options).run().await?;

    Ok(summary.exit_code())
}
