//! Defaults command - show the manifest's default dependency versions

use crate::cli::args::{DefaultsArgs, OutputFormat};
use crate::error::PackagerResult;
use crate::manifest::Manifest;
use console::style;

/// Execute the defaults command
pub fn execute(args: DefaultsArgs) -> PackagerResult<()> {
    let root_dir = super::resolve_buildpack_dir(args.buildpack_dir)?;
    let manifest_path = args
        .manifest
        .unwrap_or_else(|| root_dir.join(crate::manifest::MANIFEST_FILE));
    let manifest = Manifest::from_path(&manifest_path)?;

    match args.format {
        OutputFormat::Table => print_table(&manifest),
        OutputFormat::Json => print_json(&manifest)?,
    }
    Ok(())
}

fn print_table(manifest: &Manifest) {
    if manifest.default_versions.is_empty() {
        println!("No default versions declared");
        return;
    }

    println!(
        "{:<20} {:<15}",
        style("NAME").bold(),
        style("VERSION").bold()
    );
    println!("{}", "-".repeat(35));

    for default in &manifest.default_versions {
        println!("{:<20} {:<15}", default.name, default.version);
    }
}

fn print_json(manifest: &Manifest) -> PackagerResult<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&manifest.default_versions)?
    );
    Ok(())
}
