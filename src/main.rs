//! Buildpack Packager - Cloud Foundry buildpack release archive assembly
//!
//! CLI entry point that dispatches to subcommands.

use buildpack_packager::cli::{Cli, Commands};
use buildpack_packager::error::PackagerResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> PackagerResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn (progress output only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("buildpack_packager=warn"),
        1 => EnvFilter::new("buildpack_packager=info"),
        _ => EnvFilter::new("buildpack_packager=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Build(args) => buildpack_packager::cli::commands::build(args),
        Commands::List(args) => buildpack_packager::cli::commands::list(args),
        Commands::Defaults(args) => buildpack_packager::cli::commands::defaults(args),
    }
}
