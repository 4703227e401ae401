//! # sonar-cli
//!
//! Keeps the dependencies of a JavaScript monorepo consistent.
//!
//! This is the entry point of the `sonar` binary. It parses the command line,
//! sets up logging, resolves the run configuration and dispatches to the
//! `sync`, `update` and `validate` handlers.

use clap::{Args, Parser, Subcommand};
use sonar_config::ConfigOverrides;
use sonar_core::error::{SonarError, SonarResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{CommandContext, Outcome};
use output::errors::ErrorFormatter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("BUILD_DATE"),
    ", ",
    env!("RUSTC_VERSION"),
    ")"
);

/// Keep the dependencies of a JavaScript monorepo consistent
#[derive(Parser)]
#[command(name = "sonar", version, long_version = LONG_VERSION)]
#[command(after_help = "Examples:\n  sonar sync --help\n  sonar update --help\n  sonar validate --help")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Flags shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Update the package.json files if updates are found
    #[arg(long, global = true)]
    pub fix: bool,

    /// Return a failure (exit code 1) if updates are found
    #[arg(long, global = true)]
    pub fail: bool,

    /// Where to look for package.json files
    #[arg(long, global = true, value_name = "DIR")]
    pub folder: Option<String>,

    /// How many network requests and file operations can run at once
    #[arg(long, global = true, value_name = "N")]
    pub concurrency: Option<usize>,

    /// npm registry to resolve versions from
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    /// Config file to use instead of searching for one
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Answer every prompt with its first choice
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync your local workspace
    Sync(commands::sync::SyncArgs),
    /// Update your workspace dependencies
    Update(commands::update::UpdateArgs),
    /// Validate your workspace dependency versions
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Config values given on the command line
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            folder: self.common.folder.clone(),
            concurrency: self.common.concurrency,
            registry: self.common.registry.clone(),
            ..ConfigOverrides::default()
        };
        if let Commands::Update(args) = &self.command {
            overrides.internal_scopes = args.internal_scopes.clone();
            overrides.ignore_scopes = args.ignore_scopes.clone();
        }
        overrides
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.common.verbose);
    setup_panic_handler();

    info!("Starting Sonar v{}", env!("CARGO_PKG_VERSION"));

    let fail = cli.common.fail;
    match run_cli(cli) {
        Ok(outcome) => outcome.exit_code(fail),
        Err(error) => {
            eprintln!("{}", ErrorFormatter::new().format_error(&error));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> SonarResult<Outcome> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| SonarError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let overrides = cli.overrides();
        let ctx = CommandContext::new(&cli.common, &overrides).await?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            ["sonar_cli", "sonar_core", "sonar_config", "sonar_registry", "sonar_workspace", "sonar_usage"]
                .iter()
                .map(|target| format!("{target}={level}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Sonar encountered an unexpected error: {}", panic_info);
        eprintln!("Sonar crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
