//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Buildpack Packager - assemble Cloud Foundry buildpack release archives
///
/// Resolves the dependencies declared in a buildpack's manifest.yml,
/// verifies them against their sha256 checksums, and packages the
/// buildpack tree into a versioned zip archive.
#[derive(Parser, Debug)]
#[command(name = "buildpack-packager")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a buildpack archive
    Build(BuildArgs),

    /// List the dependencies declared in the manifest
    List(ListArgs),

    /// Show the manifest's default dependency versions
    Defaults(DefaultsArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug)]
#[command(group(clap::ArgGroup::new("stack_choice").required(true).args(["stack", "any_stack"])))]
pub struct BuildArgs {
    /// Buildpack source directory (defaults to current directory)
    pub buildpack_dir: Option<PathBuf>,

    /// Target a single root filesystem stack (e.g. cflinuxfs4)
    #[arg(long)]
    pub stack: Option<String>,

    /// Build a stack-agnostic archive
    #[arg(long)]
    pub any_stack: bool,

    /// Name the archive as a cached build (adds the -cached infix)
    #[arg(long)]
    pub cached: bool,

    /// Dependency cache directory
    #[arg(long, env = "BUILDPACK_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Re-download dependencies even when cached
    #[arg(long)]
    pub force_download: bool,

    /// Manifest path (defaults to manifest.yml in the buildpack directory)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Buildpack source directory (defaults to current directory)
    pub buildpack_dir: Option<PathBuf>,

    /// Manifest path (defaults to manifest.yml in the buildpack directory)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the defaults command
#[derive(Parser, Debug)]
pub struct DefaultsArgs {
    /// Buildpack source directory (defaults to current directory)
    pub buildpack_dir: Option<PathBuf>,

    /// Manifest path (defaults to manifest.yml in the buildpack directory)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Output format for list and defaults
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}
