//! Build command - package a buildpack into a release archive

use crate::cli::args::BuildArgs;
use crate::config::{Mode, PackagerConfig, Stack};
use crate::error::PackagerResult;
use crate::package::Packager;
use console::style;
use tracing::debug;

/// Execute the build command
pub fn execute(args: BuildArgs) -> PackagerResult<()> {
    let root_dir = super::resolve_buildpack_dir(args.buildpack_dir)?;
    let mut config = PackagerConfig::new(root_dir);

    config.stack = match args.stack {
        Some(name) => Stack::named(name),
        None => Stack::Any,
    };
    if args.cached {
        config.mode = Mode::Cached;
    }
    if let Some(cache_dir) = args.cache_dir {
        config.cache_dir = cache_dir;
    }
    if let Some(manifest) = args.manifest {
        config.manifest_path = manifest;
    }
    config.force_download = args.force_download;

    debug!(
        "Building from {} (stack: {})",
        config.root_dir.display(),
        config.stack
    );

    let output = Packager::new(config).package()?;

    println!();
    println!(
        "{} Created {}",
        style("✓").green().bold(),
        style(output.display()).bold()
    );
    Ok(())
}
