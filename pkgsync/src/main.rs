mod commands;
mod formatting;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pkgsync_core::{FailurePolicy, FieldSet, SyncConfig};
use tracing_subscriber::EnvFilter;

use crate::commands::SyncOptions;
use crate::formatting::print_error;

#[derive(Parser)]
#[command(name = "pkgsync")]
#[command(version)]
#[command(about = "Sync package.json fields and shared files from a monorepo root into its packages")]
struct Cli {
    /// Files or globs to copy into every package
    files: Vec<String>,

    /// Source package.json, or a directory containing one
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Dirs or globs of destination packages (default: workspaces / lerna.json)
    #[arg(short, long = "package")]
    packages: Vec<String>,

    /// Field to sync (repeatable)
    #[arg(short, long = "field")]
    fields: Vec<String>,

    /// Path to lerna.json
    #[arg(short, long)]
    lerna: Option<PathBuf>,

    /// Print what would change without writing anything
    #[arg(short = 'D', long, action)]
    dry_run: bool,

    /// Overwrite existing files in packages
    #[arg(long, action)]
    force: bool,

    /// Skip package.json field sync
    #[arg(long, action)]
    no_package_json: bool,

    /// Skip the summary
    #[arg(long, action)]
    no_summary: bool,

    /// Keep going when a destination manifest cannot be read or written
    #[arg(long, action)]
    continue_on_error: bool,

    /// Maximum number of manifests read at once
    #[arg(short = 'j', long)]
    parallel: Option<usize>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, action)]
    quiet: bool,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 | 1 => "warn",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_options(cli: Cli) -> Result<SyncOptions> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let config = SyncConfig::discover(&cwd)?.unwrap_or_default();

    let fields = if cli.fields.is_empty() {
        config.field_set().unwrap_or_default()
    } else {
        FieldSet::new(cli.fields)
    };

    let packages = if cli.packages.is_empty() {
        config.package_patterns().unwrap_or_default()
    } else {
        cli.packages
    };

    let files = if cli.files.is_empty() {
        config.file_patterns().unwrap_or_default()
    } else {
        cli.files
    };

    let policy = if cli.continue_on_error {
        FailurePolicy::Isolate
    } else {
        FailurePolicy::Abort
    };

    Ok(SyncOptions {
        source: cli.source.or_else(|| config.source_path()),
        lerna: cli.lerna.or_else(|| config.lerna_path()),
        force: cli.force || config.force.unwrap_or(false),
        cwd,
        packages,
        fields,
        files,
        dry_run: cli.dry_run,
        sync_manifests: !cli.no_package_json,
        summary: !cli.no_summary,
        verbose: cli.verbose > 0,
        policy,
        parallel: cli.parallel,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let outcome = build_options(cli).and_then(commands::cmd_sync);

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
