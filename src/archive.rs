//! Archive exclusions and zip assembly
//!
//! The exclusion set is the union of the manifest's `exclude_files`
//! patterns and entries read from every `.gitignore` discovered in the
//! staging tree. Each pattern is translated to the archive glob syntax
//! `*{pattern}*` (substring match against archive paths, the behavior of
//! the classic `zip -x` exclusion). The set is sorted and deduplicated,
//! so the order the groups are supplied in never affects the archive.

use crate::error::{PackagerError, PackagerResult};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes the staging tree into a single archive.
///
/// Any concrete implementation (native zip library, external process)
/// satisfies the same contract: archive everything under `source_root`
/// except paths matching an exclusion pattern.
pub trait ArchiveWriter {
    fn create_archive(
        &self,
        source_root: &Path,
        output: &Path,
        exclusions: &[String],
    ) -> PackagerResult<()>;
}

/// Build the deterministic exclusion pattern set for an archive run:
/// manifest patterns plus `.gitignore`-derived patterns, translated,
/// sorted and deduplicated.
pub fn build_exclusions(
    manifest_patterns: &[String],
    source_root: &Path,
) -> PackagerResult<Vec<String>> {
    let mut patterns: Vec<String> = manifest_patterns.iter().map(|p| translate(p)).collect();
    for entry in gitignore_entries(source_root)? {
        patterns.push(translate(&entry));
    }
    patterns.sort();
    patterns.dedup();
    debug!("Archive exclusion set: {:?}", patterns);
    Ok(patterns)
}

/// Translate one pattern into archive exclusion syntax. The surrounding
/// wildcards reproduce `zip -x` substring matching against entry paths.
/// Existing leading/trailing wildcards are not doubled; `**` is a
/// recursive wildcard with different meaning to the glob matcher.
fn translate(pattern: &str) -> String {
    let trimmed = pattern.trim().trim_start_matches('/');
    let prefix = if trimmed.starts_with('*') { "" } else { "*" };
    let suffix = if trimmed.ends_with('*') { "" } else { "*" };
    format!("{}{}{}", prefix, trimmed, suffix)
}

/// Collect entries from every .gitignore under `source_root`.
///
/// Comments, blank lines, and negations are skipped; negation support is
/// not part of the exclusion contract. Read-only traversal.
fn gitignore_entries(source_root: &Path) -> PackagerResult<Vec<String>> {
    let mut entries = Vec::new();
    collect_gitignores(source_root, &mut entries)?;
    Ok(entries)
}

fn collect_gitignores(dir: &Path, entries: &mut Vec<String>) -> PackagerResult<()> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => return Err(PackagerError::io(format!("scanning {}", dir.display()), e)),
    };

    for entry in read_dir {
        let entry = entry.map_err(|e| PackagerError::io(format!("scanning {}", dir.display()), e))?;
        let path = entry.path();
        let name = entry.file_name();

        if path.is_dir() {
            // .git holds no ignore files the archive cares about
            if name == ".git" {
                continue;
            }
            collect_gitignores(&path, entries)?;
        } else if name == ".gitignore" {
            let content = fs::read_to_string(&path)
                .map_err(|e| PackagerError::io(format!("reading {}", path.display()), e))?;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                    continue;
                }
                entries.push(line.to_string());
            }
        }
    }
    Ok(())
}

/// Compiled exclusion patterns, matched against `/`-separated paths
/// relative to the archive root
#[derive(Debug)]
pub struct ExclusionSet {
    patterns: Vec<glob::Pattern>,
}

impl ExclusionSet {
    pub fn compile(patterns: &[String]) -> PackagerResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| PackagerError::ExclusionPatternInvalid {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<PackagerResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(rel_path))
    }
}

/// Native zip implementation of `ArchiveWriter` using deflate compression.
/// Entries are written in sorted path order so identical inputs produce
/// identical archives.
pub struct ZipArchiveWriter;

impl ArchiveWriter for ZipArchiveWriter {
    fn create_archive(
        &self,
        source_root: &Path,
        output: &Path,
        exclusions: &[String],
    ) -> PackagerResult<()> {
        let excluded = ExclusionSet::compile(exclusions)?;

        let file = File::create(output)
            .map_err(|e| PackagerError::io(format!("creating archive {}", output.display()), e))?;
        let mut zip = ZipWriter::new(file);

        let mut paths = Vec::new();
        walk_sorted(source_root, &mut paths)?;

        for path in &paths {
            let rel = relative_name(source_root, path);
            if excluded.is_excluded(&rel) {
                debug!("Excluding {} from archive", rel);
                continue;
            }

            let metadata = fs::symlink_metadata(path).map_err(|e| {
                PackagerError::io(format!("reading metadata of {}", path.display()), e)
            })?;
            let options = entry_options(&metadata);

            if metadata.file_type().is_symlink() {
                let target = fs::read_link(path)
                    .map_err(|e| PackagerError::io(format!("reading link {}", path.display()), e))?;
                zip.add_symlink(rel.as_str(), target.to_string_lossy().as_ref(), options)?;
            } else if metadata.is_dir() {
                zip.add_directory(rel.as_str(), options)?;
            } else {
                zip.start_file(rel.as_str(), options)?;
                let mut src = File::open(path)
                    .map_err(|e| PackagerError::io(format!("reading {}", path.display()), e))?;
                io::copy(&mut src, &mut zip)
                    .map_err(|e| PackagerError::io(format!("archiving {}", path.display()), e))?;
            }
        }

        zip.finish()?;
        Ok(())
    }
}

/// Depth-first traversal with entries sorted by name at every level
fn walk_sorted(dir: &Path, out: &mut Vec<PathBuf>) -> PackagerResult<()> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| PackagerError::io(format!("reading directory {}", dir.display()), e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(|e| PackagerError::io(format!("reading directory {}", dir.display()), e))?;
    children.sort();

    for child in children {
        // Symlinked directories are stored as links, never recursed into
        let is_dir = fs::symlink_metadata(&child)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        out.push(child.clone());
        if is_dir {
            walk_sorted(&child, out)?;
        }
    }
    Ok(())
}

fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// Buildpack scripts must stay executable inside the archive
#[cfg(unix)]
fn entry_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn entry_options(_metadata: &fs::Metadata) -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn translate_wraps_pattern() {
        assert_eq!(translate("*.md"), "*.md*");
        assert_eq!(translate(".git/"), "*.git/*");
        assert_eq!(translate("/log"), "*log*");
        assert_eq!(translate("spec/*"), "*spec/*");
    }

    #[test]
    fn exclusions_superset_of_both_groups() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(".gitignore"), "target/\n*.log\n").unwrap();

        let manifest = vec![".git/".to_string(), "spec/".to_string()];
        let patterns = build_exclusions(&manifest, root.path()).unwrap();

        for expected in ["*.git/*", "*spec/*", "*target/*", "*.log*"] {
            assert!(patterns.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn exclusions_invariant_to_group_order() {
        let root_a = TempDir::new().unwrap();
        fs::write(root_a.path().join(".gitignore"), "target/\n").unwrap();
        let a = build_exclusions(&[".git/".to_string()], root_a.path()).unwrap();

        let root_b = TempDir::new().unwrap();
        fs::write(root_b.path().join(".gitignore"), ".git/\n").unwrap();
        let b = build_exclusions(&["target/".to_string()], root_b.path()).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn exclusions_deduplicated() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(".gitignore"), ".git/\n.git/\n").unwrap();

        let patterns = build_exclusions(&[".git/".to_string()], root.path()).unwrap();
        let count = patterns.iter().filter(|p| p.as_str() == "*.git/*").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn gitignore_skips_comments_blanks_negations() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join(".gitignore"),
            "# comment\n\ntarget/\n!keep.log\n",
        )
        .unwrap();

        let entries = gitignore_entries(root.path()).unwrap();
        assert_eq!(entries, vec!["target/"]);
    }

    #[test]
    fn nested_gitignores_discovered() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("sub")).unwrap();
        fs::write(root.path().join(".gitignore"), "a.out\n").unwrap();
        fs::write(root.path().join("sub/.gitignore"), "b.out\n").unwrap();

        let entries = gitignore_entries(root.path()).unwrap();
        assert!(entries.contains(&"a.out".to_string()));
        assert!(entries.contains(&"b.out".to_string()));
    }

    #[test]
    fn exclusion_set_substring_matching() {
        let set = ExclusionSet::compile(&["*.git/*".to_string(), "*.md*".to_string()]).unwrap();
        assert!(set.is_excluded(".git/config"));
        assert!(set.is_excluded("docs/README.md"));
        assert!(!set.is_excluded("bin/compile"));
    }

    #[test]
    fn invalid_pattern_errors() {
        let err = ExclusionSet::compile(&["[".to_string()]).unwrap_err();
        assert!(matches!(err, PackagerError::ExclusionPatternInvalid { .. }));
    }

    #[test]
    fn zip_writer_archives_and_excludes() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("bin")).unwrap();
        fs::create_dir_all(root.path().join(".git")).unwrap();
        fs::write(root.path().join("bin/compile"), "#!/bin/sh\necho hi\n").unwrap();
        fs::write(root.path().join("VERSION"), "1.0.0\n").unwrap();
        fs::write(root.path().join(".git/config"), "[core]\n").unwrap();

        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("out.zip");
        ZipArchiveWriter
            .create_archive(root.path(), &output, &["*.git/*".to_string()])
            .unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();

        assert!(names.iter().any(|n| n == "bin/compile"));
        assert!(names.iter().any(|n| n == "VERSION"));
        assert!(!names.iter().any(|n| n.contains(".git/config")));
    }

    #[cfg(unix)]
    #[test]
    fn zip_writer_preserves_executable_mode() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let script = root.path().join("detect");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("out.zip");
        ZipArchiveWriter
            .create_archive(root.path(), &output, &[])
            .unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let entry = archive.by_name("detect").unwrap();
        assert_eq!(entry.unix_mode().unwrap() & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn zip_writer_stores_symlinks_as_links() {
        use std::io::Read;
        use std::os::unix::fs::symlink;

        let root = TempDir::new().unwrap();
        fs::write(root.path().join("compile"), "#!/bin/sh\n").unwrap();
        symlink("compile", root.path().join("start")).unwrap();
        symlink("missing", root.path().join("dangling")).unwrap();

        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("out.zip");
        ZipArchiveWriter
            .create_archive(root.path(), &output, &[])
            .unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let mut entry = archive.by_name("start").unwrap();
        assert_eq!(entry.unix_mode().unwrap() & 0o170000, 0o120000);
        let mut target = String::new();
        entry.read_to_string(&mut target).unwrap();
        assert_eq!(target, "compile");
        drop(entry);

        // A dangling link is archived as a link, not an error
        assert!(archive.by_name("dangling").is_ok());
    }

    #[test]
    fn zip_entries_sorted_for_reproducibility() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("b.txt"), "b").unwrap();
        fs::write(root.path().join("a.txt"), "a").unwrap();
        fs::write(root.path().join("c.txt"), "c").unwrap();

        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("out.zip");
        ZipArchiveWriter
            .create_archive(root.path(), &output, &[])
            .unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }
}
