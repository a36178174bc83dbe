//! Lineage CLI - Provenance checks for derived documents
//!
//! A command-line interface over a project snapshot exported as JSON: build
//! and validate the lineage graph, resolve the canonical version of every
//! document slot, and list what an edit made stale.
//!
//! # Usage
//!
//! ```bash
//! # Validate a snapshot and print graph statistics
//! lineage check project.json
//!
//! # Show the canonical document per slot
//! lineage canonical project.json --json
//!
//! # What does an outline edit invalidate?
//! lineage stale project.json --edit outline:$.tone
//! ```

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lineage_config::{ConfigOverrides, LogFormat, LoggingConfig};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

/// Lineage - Provenance graph, canonical versions and stale detection
#[derive(Parser, Debug)]
#[command(name = "lineage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Project directory used to find `.lineage/config.toml`
    #[arg(long, short = 'p', global = true, env = "LINEAGE_PROJECT_DIR")]
    project_dir: Option<PathBuf>,

    /// Path to configuration file (skips global and project config)
    #[arg(long, short = 'c', global = true, env = "LINEAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Fail graph construction on any integrity warning
    #[arg(long, global = true)]
    strict: bool,

    /// Ignore outputs of pending transforms during resolution
    #[arg(long, global = true)]
    exclude_pending: bool,

    /// Log format (text, json)
    #[arg(long, global = true, env = "LINEAGE_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

/// Parse log format from string
fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse()
        .map_err(|e: lineage_config::ConfigError| e.to_string())
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error".to_string())
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            None
        };

        ConfigOverrides {
            strict_integrity: self.strict.then_some(true),
            include_pending: self.exclude_pending.then_some(false),
            log_level,
            log_format: self.log_format,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the lineage graph and report integrity problems
    Check(commands::check::CheckArgs),

    /// Resolve the canonical document for every slot
    Canonical(commands::canonical::CanonicalArgs),

    /// List documents invalidated by one or more edits
    Stale(commands::stale::StaleArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;

    let (writer, ansi) = match logging.file {
        Some(ref path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (
            BoxMakeWriter::new(std::io::stderr),
            std::io::stderr().is_terminal(),
        ),
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);

    match logging.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(&cli.global)?;
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Check(args) => commands::check::execute(args, &config, &cli.global),
        Commands::Canonical(args) => commands::canonical::execute(args, &config),
        Commands::Stale(args) => commands::stale::execute(args, &config, &cli.global),
        Commands::Config(cmd) => commands::config::execute(cmd, &config, &cli.global),
    }
}
