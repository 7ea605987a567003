//! Binary entry point for stockpile.
//!
//! This binary provides the CLI for exporting and importing an inventory.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stockpile::config::StockpileConfig;
use stockpile::io::CancellationToken;
use stockpile::observability;

/// Stockpile - bulk export and import for warehouse inventory.
#[derive(Parser)]
#[command(name = "stockpile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "STOCKPILE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Export items, transactions, and images.
    Export {
        /// Directory receiving the export (default: configured export directory).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output layout: archive, folder, or auto.
        #[arg(short, long, default_value = "archive")]
        layout: String,
    },

    /// Import an export archive or folder.
    Import {
        /// Archive file or extracted export folder.
        path: PathBuf,
    },

    /// Check whether an archive can be imported in memory.
    Probe {
        /// Archive file.
        archive: PathBuf,
    },

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    config.logging = config.logging.with_verbose(cli.verbose);

    if let Err(e) = observability::init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nCancelling at the next batch boundary...");
        handler_token.cancel();
    }) {
        tracing::warn!(error = %e, "Could not install interrupt handler");
    }

    match run_command(cli.command, config, cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(
    command: Commands,
    config: StockpileConfig,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Export { output_dir, layout } => {
            commands::cmd_export(&config, output_dir, &layout, cancel)?;
        },
        Commands::Import { path } => commands::cmd_import(&config, &path, cancel)?,
        Commands::Probe { archive } => commands::cmd_probe(&config, &archive)?,
        Commands::Config { show } => commands::cmd_config(&config, show),
    }
    Ok(())
}

/// Loads configuration from an explicit path or the default location.
fn load_config(path: Option<&Path>) -> stockpile::Result<StockpileConfig> {
    path.map_or_else(
        || Ok(StockpileConfig::load_default()),
        StockpileConfig::load_from_file,
    )
}
