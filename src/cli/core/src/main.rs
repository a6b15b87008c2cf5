/* src/cli/core/src/main.rs */

mod build;
mod check;
mod clean;
mod compile;
mod config;
mod diagnostics;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use config::{Project, find_sugar_config, load_sugar_config};

#[derive(Parser)]
#[command(name = "sugar", version, about = "Sugar template compiler")]
struct Cli {
  /// Path to sugar.toml (auto-detected if omitted)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,
  /// Increase log verbosity (-v debug, -vv trace)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Compile one template and print the generated PHP
  Compile {
    /// Template path relative to a template root (suffix optional)
    template: String,
    /// Write the PHP to this file instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
  },
  /// Compile every template into the cache directory
  Build,
  /// Compile templates without writing anything and report errors
  Check {
    /// Templates to check (all templates if omitted)
    templates: Vec<String>,
  },
  /// Remove the compiled template cache
  Clean,
}

fn init_logger(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
    .format_timestamp(None)
    .init();
}

/// Resolve config path (explicit or auto-detected) and parse it
fn resolve_project(explicit: Option<PathBuf>) -> Result<Project> {
  let path = match explicit {
    Some(p) => p,
    None => {
      let cwd = std::env::current_dir().context("failed to get cwd")?;
      find_sugar_config(&cwd)?
    }
  };
  let config = load_sugar_config(&path)?;
  log::debug!("using {}", path.display());
  Ok(Project::new(&path, config))
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logger(cli.verbose);
  let project = resolve_project(cli.config)?;

  match cli.command {
    Command::Compile { template, out } => {
      compile::run_compile(&project, &template, out.as_deref())?;
    }
    Command::Build => build::run_build(&project)?,
    Command::Check { templates } => check::run_check(&project, &templates)?,
    Command::Clean => clean::run_clean(&project)?,
  }

  Ok(())
}
