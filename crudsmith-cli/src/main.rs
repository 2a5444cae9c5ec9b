//! crudsmith CLI tool

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::cognitive_complexity)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crudsmith::config::CrudsmithConfig;
use crudsmith_cli_lib::commands::{GenerateCommand, NewCommand, TargetsCommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crudsmith")]
#[command(version)]
#[command(about = "Schema-driven CRUD page generator", long_about = None)]
struct Cli {
    /// Configuration file (default: ./crudsmith.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging when RUST_LOG is not set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate CRUD pages from entity metadata
    Generate(GenerateCommand),
    /// Write a starter metadata document
    New(NewCommand),
    /// List emission targets
    Targets,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    crudsmith::observability::init(cli.verbose)?;

    let config = CrudsmithConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::debug!(
        targets = ?config.generator.targets,
        output_dir = %config.generator.output_dir.display(),
        "configuration loaded"
    );

    match cli.command {
        Commands::Generate(command) => {
            let report = command.execute(&config)?;
            if !report.is_clean() {
                bail!(
                    "{} page(s) differ from the generated output",
                    report.drifted.len()
                );
            }
        }
        Commands::New(command) => {
            command.execute()?;
        }
        Commands::Targets => TargetsCommand.execute(),
    }

    Ok(())
}
