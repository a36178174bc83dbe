//! Config command - View and manage configuration
//!
//! Provides commands for viewing and creating Lineage configuration:
//! - Show the effective configuration after merging every source
//! - Show configuration file paths
//! - Create a default config file (local or global)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use lineage_config::{ConfigLoader, LineageConfig};
use serde::Serialize;

use super::{print_info, print_json, resolve_project_dir};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Show configuration file paths
    Path(PathArgs),

    /// Write a default config file if none exists
    Init(InitArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    json: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create the global config (~/.lineage/config.toml) instead of the project one
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, config: &LineageConfig, global: &GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, config),
        ConfigCommand::Path(args) => execute_path(args, global),
        ConfigCommand::Init(args) => execute_init(args, global),
    }
}

fn execute_show(args: ShowArgs, config: &LineageConfig) -> Result<()> {
    if args.json {
        return print_json(config);
    }

    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

fn execute_path(args: PathArgs, global: &GlobalOptions) -> Result<()> {
    let project = resolve_project_dir(global)?;
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&project);
    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
    };

    if args.json {
        return print_json(&paths);
    }

    match paths.global {
        Some(ref path) => println!(
            "Global: {} ({})",
            path.display(),
            exists_label(paths.global_exists)
        ),
        None => println!("Global: (no home directory)"),
    }
    println!(
        "Local:  {} ({})",
        paths.local.display(),
        exists_label(paths.local_exists)
    );
    Ok(())
}

fn execute_init(args: InitArgs, global: &GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();

    let (target, created) = if args.global {
        let existed = loader.global_config_path().is_some_and(|p| p.exists());
        let path = loader
            .init_global()
            .context("Failed to create global config")?;
        (path, !existed)
    } else {
        let project = resolve_project_dir(global)?;
        let existed = loader.local_config_path(&project).exists();
        let path = loader
            .init_local(&project)
            .context("Failed to create project config")?;
        (path, !existed)
    };

    if created {
        println!("Created {}", target.display());
    } else {
        print_info(
            &format!("Config already exists at {}; left unchanged", target.display()),
            global.quiet,
        );
    }
    Ok(())
}

fn exists_label(exists: bool) -> &'static str {
    if exists {
        "exists"
    } else {
        "not found"
    }
}
