//! List command - show the dependencies declared in a manifest

use crate::cli::args::{ListArgs, OutputFormat};
use crate::error::PackagerResult;
use crate::manifest::{Dependency, Manifest};
use console::style;

/// Execute the list command
pub fn execute(args: ListArgs) -> PackagerResult<()> {
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
    if manifest.dependencies.is_empty() {
        println!("No dependencies declared");
        return;
    }

    println!(
        "{:<20} {:<15} {:<30}",
        style("NAME").bold(),
        style("VERSION").bold(),
        style("STACKS").bold()
    );
    println!("{}", "-".repeat(65));

    for dep in &manifest.dependencies {
        println!("{:<20} {:<15} {:<30}", dep.name, dep.version, stacks_column(dep));
    }

    println!();
    println!("{} dependencies", manifest.dependencies.len());
}

fn print_json(manifest: &Manifest) -> PackagerResult<()> {
    println!("{}", serde_json::to_string_pretty(&manifest.dependencies)?);
    Ok(())
}

fn stacks_column(dep: &Dependency) -> String {
    match &dep.cf_stacks {
        Some(stacks) => stacks.join(", "),
        None => "any".to_string(),
    }
}
