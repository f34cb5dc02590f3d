mod checks;
mod commands;
mod core;
mod pipeline;
mod schedule;
mod ui;
mod utils;

use clap::{Parser, Subcommand};
use core::error::{NightlyError, print_error};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Build and publish nightly source distributions, only from the canonical repository
#[derive(Parser)]
#[command(name = "nightly-rail")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Path to nightly.toml (default: search the current directory)
  #[arg(long, global = true, env = "NIGHTLY_RAIL_CONFIG")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Pipeline
  // ============================================================================
  /// Execute one job run now (gate, build, publish)
  Run {
    /// Repository identity the run executes in (owner/name)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,
    /// Show the gate decision and planned steps without executing them
    #[arg(long)]
    dry_run: bool,
    /// Output the run record in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Run the pipeline every day at the configured UTC time
  Schedule {
    /// Repository identity the runs execute in (owner/name)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,
    /// Stop after this many fired runs
    #[arg(long)]
    max_runs: Option<usize>,
    /// Output run records in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show when the next scheduled run fires
  Next {
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  // ============================================================================
  // Setup & Inspection
  // ============================================================================
  /// Run health checks and diagnostics
  Doctor {
    /// Repository identity to check against the canonical one
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,
    /// Run thorough checks (includes network tests)
    #[arg(long)]
    thorough: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Write a default nightly.toml in the current directory
  Init {
    /// Canonical repository identity (default: derived from the origin remote)
    #[arg(long)]
    canonical: Option<String>,
    /// Overwrite an existing configuration
    #[arg(long)]
    force: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Log events go to stderr so `--json` stdout stays parseable
fn init_tracing() {
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "nightly_rail=info".into()))
    .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing();

  let config = cli.config.as_deref();
  let result = match cli.command {
    // Pipeline
    Commands::Run {
      repository,
      dry_run,
      json,
    } => commands::run_once(config, repository, dry_run, json),
    Commands::Schedule {
      repository,
      max_runs,
      json,
    } => commands::run_schedule(config, repository, max_runs, json),
    Commands::Next { json } => commands::run_next(config, json),

    // Setup & Inspection
    Commands::Doctor {
      repository,
      thorough,
      json,
    } => commands::run_doctor(config, repository, thorough, json),
    Commands::Init { canonical, force } => commands::run_init(canonical, force),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: NightlyError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
