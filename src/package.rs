//! Buildpack packaging orchestration
//!
//! Runs the whole pipeline against a disposable copy of the buildpack
//! tree: pre-package hook, staging copy, manifest stack projection,
//! dependency staging with integrity gating, and archive assembly. The
//! original source tree is never mutated; the only thing written next to
//! it is the finished archive.

use crate::archive::{build_exclusions, ArchiveWriter, ZipArchiveWriter};
use crate::cache;
use crate::config::{PackagerConfig, Stack};
use crate::error::{PackagerError, PackagerResult};
use crate::fetch::{Fetcher, HttpTransport, Transport};
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::verify;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};
use url::Url;

/// Directory inside the staging tree that receives verified dependencies
pub const DEPENDENCY_DIR: &str = "dependencies";

/// One packaging run over a buildpack source tree
pub struct Packager {
    config: PackagerConfig,
    transport: Box<dyn Transport>,
    archiver: Box<dyn ArchiveWriter>,
}

impl Packager {
    /// Create a packager with the default HTTP transport and zip writer
    pub fn new(config: PackagerConfig) -> Self {
        Self::with_collaborators(config, Box::new(HttpTransport::new()), Box::new(ZipArchiveWriter))
    }

    /// Create a packager with explicit collaborators (tests swap in mocks)
    pub fn with_collaborators(
        config: PackagerConfig,
        transport: Box<dyn Transport>,
        archiver: Box<dyn ArchiveWriter>,
    ) -> Self {
        Self {
            config,
            transport,
            archiver,
        }
    }

    /// Run the full pipeline and return the path of the written archive
    pub fn package(&self) -> PackagerResult<PathBuf> {
        let root = &self.config.root_dir;
        if !root.is_dir() {
            return Err(PackagerError::BuildpackDirNotFound(root.clone()));
        }

        let manifest = Manifest::from_path(&self.config.manifest_path)?;
        let version = read_buildpack_version(root)?;

        self.run_pre_package(&manifest)?;

        // Disposable working copy of the whole buildpack tree
        let staging = tempfile::tempdir()
            .map_err(|e| PackagerError::io("creating staging directory", e))?;
        copy_tree(root, staging.path())?;
        debug!("Staged buildpack copy at {}", staging.path().display());

        let projected = manifest.project(&self.config.stack);
        fs::write(staging.path().join(MANIFEST_FILE), projected.to_yaml()?)
            .map_err(|e| PackagerError::io("writing staged manifest", e))?;

        self.stage_dependencies(&manifest, staging.path())?;

        let exclusions = build_exclusions(&manifest.exclude_files, staging.path())?;
        let output = root.join(archive_name(
            &manifest.language,
            &version,
            &self.config,
        ));
        if output.exists() {
            fs::remove_file(&output).map_err(|e| {
                PackagerError::io(format!("removing stale archive {}", output.display()), e)
            })?;
        }
        self.archiver
            .create_archive(staging.path(), &output, &exclusions)?;

        info!("Created {}", output.display());
        Ok(output)
    }

    /// Fetch, verify, and stage every dependency applicable to the
    /// configured stack, strictly in manifest order.
    fn stage_dependencies(&self, manifest: &Manifest, staging: &Path) -> PackagerResult<()> {
        let dep_dir = staging.join(DEPENDENCY_DIR);
        fs::create_dir_all(&dep_dir)
            .map_err(|e| PackagerError::io(format!("creating {}", dep_dir.display()), e))?;

        let fetcher = Fetcher::new(
            self.transport.as_ref(),
            &self.config.cache_dir,
            self.config.force_download,
        );

        let mut staged_names: HashSet<String> = HashSet::new();
        for dep in manifest
            .dependencies
            .iter()
            .filter(|dep| dep.applies_to(&self.config.stack))
        {
            let safe_uri = cache::redact_credentials(&dep.uri);
            let pb = create_progress_bar(format!("Fetching {} {}...", dep.name, dep.version));
            let (local, was_cache_hit) = fetcher.ensure_cached(dep)?;

            pb.set_message(format!("Verifying {} {}...", dep.name, dep.version));
            verify::verify(&fetcher, dep, &local, was_cache_hit)?;
            pb.finish_and_clear();

            let size = human_size(file_size(&local)?);
            if was_cache_hit {
                println!(
                    "Using {} {} from local cache at {} ({})",
                    style(&dep.name).cyan(),
                    dep.version,
                    local.display(),
                    size
                );
            } else {
                println!(
                    "Downloaded {} {} from {} ({})",
                    style(&dep.name).cyan(),
                    dep.version,
                    safe_uri,
                    size
                );
            }

            println!(
                "  {} {} {} matches the manifest sha256 checksum",
                style("✓").green(),
                dep.name,
                dep.version
            );

            // Distinct URIs can end in the same file name; the second one
            // falls back to its unique sanitized cache key so no staged
            // dependency is overwritten.
            let mut file_name = dependency_filename(&dep.uri);
            if !staged_names.insert(file_name.clone()) {
                file_name = cache::cache_key(&dep.uri);
                staged_names.insert(file_name.clone());
            }
            let staged = dep_dir.join(&file_name);
            fs::copy(&local, &staged).map_err(|e| {
                PackagerError::io(format!("staging dependency {}", staged.display()), e)
            })?;
        }

        Ok(())
    }

    /// Run the manifest's pre_package hook in the buildpack root, if any.
    /// A non-zero exit stops the run before anything is staged.
    fn run_pre_package(&self, manifest: &Manifest) -> PackagerResult<()> {
        let Some(command) = &manifest.pre_package else {
            return Ok(());
        };

        info!("Running pre_package: {}", command);
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.config.root_dir)
            .status()
            .map_err(|e| PackagerError::io(format!("running pre_package '{}'", command), e))?;

        if !status.success() {
            return Err(PackagerError::PrePackageFailed {
                command: command.clone(),
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}

/// Archive file name: `{language}_buildpack[-cached][-{stack}]-v{version}.zip`
fn archive_name(language: &str, version: &str, config: &PackagerConfig) -> String {
    let stack_suffix = match &config.stack {
        Stack::Any => String::new(),
        Stack::Named(name) => format!("-{}", name),
    };
    format!(
        "{}_buildpack{}{}-v{}.zip",
        language,
        config.mode.archive_infix(),
        stack_suffix,
        version
    )
}

/// Read and trim `{root}/VERSION`
fn read_buildpack_version(root: &Path) -> PackagerResult<String> {
    let path = root.join("VERSION");
    if !path.exists() {
        return Err(PackagerError::VersionFileMissing(path));
    }
    let version = fs::read_to_string(&path)
        .map_err(|e| PackagerError::io(format!("reading {}", path.display()), e))?;
    Ok(version.trim().to_string())
}

/// Staged file name for a dependency: the last path segment of its URI,
/// falling back to the sanitized cache key for opaque locators
fn dependency_filename(uri: &str) -> String {
    if let Ok(url) = Url::parse(uri) {
        if let Some(name) = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
        {
            return name.to_string();
        }
    }
    cache::cache_key(uri)
}

/// Recursively copy a directory tree. `fs::copy` preserves unix modes,
/// which keeps buildpack scripts executable in the staging copy.
/// Symlinks are recreated as symlinks, not resolved, so intra-tree links
/// (broken ones included) survive the staging copy.
fn copy_tree(src: &Path, dst: &Path) -> PackagerResult<()> {
    for entry in fs::read_dir(src)
        .map_err(|e| PackagerError::io(format!("reading directory {}", src.display()), e))?
    {
        let entry =
            entry.map_err(|e| PackagerError::io(format!("reading directory {}", src.display()), e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| PackagerError::io(format!("inspecting {}", from.display()), e))?;

        if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&to)
                .map_err(|e| PackagerError::io(format!("creating {}", to.display()), e))?;
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to)
                .map_err(|e| PackagerError::io(format!("copying {}", from.display()), e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> PackagerResult<()> {
    let target = fs::read_link(from)
        .map_err(|e| PackagerError::io(format!("reading link {}", from.display()), e))?;
    std::os::unix::fs::symlink(&target, to)
        .map_err(|e| PackagerError::io(format!("linking {}", to.display()), e))?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> PackagerResult<()> {
    fs::copy(from, to)
        .map_err(|e| PackagerError::io(format!("copying {}", from.display()), e))?;
    Ok(())
}

fn create_progress_bar(msg: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(spinner_style);
    }
    pb.set_message(msg);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn file_size(path: &Path) -> PackagerResult<u64> {
    let metadata = fs::metadata(path)
        .map_err(|e| PackagerError::io(format!("reading metadata of {}", path.display()), e))?;
    Ok(metadata.len())
}

/// Format a byte count the way `du -h` would
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
