//! Wio CLI - export spending from the Wio banking app

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{Directive, EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

mod commands;
mod output;

use commands::{config, scrape, show};

/// HTTP client internals are only interesting when something breaks
const QUIET_TARGETS: [&str; 2] = ["hyper=warn", "reqwest=warn"];

/// Wio - export spending transactions from the Wio app via Appium
#[derive(Parser)]
#[command(name = "wio", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the transaction list and export spending to CSV
    Scrape {
        /// Scrape the built-in sample feed instead of a device
        #[arg(long)]
        demo: bool,
        /// Directory for the CSV file (overrides settings)
        #[arg(long, short)]
        output_dir: Option<PathBuf>,
        /// File name instead of the timestamped default
        #[arg(long, short)]
        filename: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an exported CSV file
    Show {
        /// Path to the exported CSV
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Write the effective configuration, environment overrides included,
        /// to settings.json
        #[arg(long)]
        write: bool,
    },
}

fn init_tracing() {
    // `RUST_LOG` overrides the INFO default, e.g. `RUST_LOG=wio_core=debug`
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    for target in QUIET_TARGETS {
        if let Ok(directive) = target.parse::<Directive>() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    // Logs go to stderr so `--json` output on stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .with(env_filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {e}"));
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {cause}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scrape {
            demo,
            output_dir,
            filename,
            json,
        } => scrape::run(demo, output_dir, filename, json),
        Commands::Show { file, json } => show::run(&file, json),
        Commands::Config { json, write } => config::run(json, write),
    }
}
