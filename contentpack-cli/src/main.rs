//! contentpack CLI - inspect and manage content packs
//!
//! Reads host settings, builds a pack loader for the configured root and
//! dispatches to a subcommand.

mod commands;
mod error;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use contentpack::loader::PackLoader;
use contentpack::settings::{default_settings_path, HostSettings};
use tracing_subscriber::EnvFilter;

use commands::Command;

/// Inspect, toggle and provision content packs.
#[derive(Parser, Debug)]
#[command(name = "contentpack", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Pack root directory (overrides settings).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Settings file.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Host build number packs are checked against (overrides settings).
    #[arg(long, global = true)]
    host_build: Option<i64>,

    /// Drop packs that target another host build.
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.settings.clone().or_else(default_settings_path) {
        Some(path) => HostSettings::load_or_defaults(path).into_value(),
        None => HostSettings::defaults().into_value(),
    };

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    tracing::debug!(version = contentpack::VERSION, "contentpack CLI starting");

    let mut config = settings.to_loader_config();
    if let Some(root) = cli.root {
        config.root = root;
    }
    if let Some(build) = cli.host_build {
        config = config.with_host_build(build);
    }
    if cli.strict {
        config = config.with_force_load(false);
    }
    tracing::debug!(root = %config.root.display(), "Using pack root");

    let mut loader = PackLoader::new(config);
    let result = commands::run(cli.command, &mut loader, &mut io::stdout().lock());
    loader.dispose();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
    }
}
