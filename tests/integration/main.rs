//! Integration tests for buildpack-packager

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use buildpack_packager::cache;
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn packager() -> Command {
        cargo_bin_cmd!("buildpack-packager")
    }

    // SHA-256 of b"hello world"
    const HELLO_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    const FIXTURE_MANIFEST: &str = r#"
language: ruby
default_versions:
- name: foo
  version: 1.0
dependencies:
- name: foo
  version: 1.0
  uri: https://example.com/foo.tgz
  sha256: b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9
  cf_stacks:
  - cflinuxfs4
exclude_files:
- .git/
"#;

    fn fixture_buildpack() -> TempDir {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("bin")).unwrap();
        fs::write(root.path().join("bin/compile"), "#!/bin/sh\n").unwrap();
        fs::write(root.path().join("VERSION"), "1.0.0\n").unwrap();
        fs::write(root.path().join("manifest.yml"), FIXTURE_MANIFEST).unwrap();
        root
    }

    /// Cache directory already holding the fixture dependency, so builds
    /// never touch the network
    fn seeded_cache() -> TempDir {
        let cache_dir = TempDir::new().unwrap();
        let local = cache::cached_path(cache_dir.path(), "https://example.com/foo.tgz");
        fs::write(local, b"hello world").unwrap();
        cache_dir
    }

    #[test]
    fn help_displays() {
        packager()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("buildpack"));
    }

    #[test]
    fn version_displays() {
        packager()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("buildpack-packager"));
    }

    #[test]
    fn build_help_describes_cached_naming() {
        packager()
            .args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("-cached infix"));
    }

    #[test]
    fn build_requires_stack_choice() {
        packager()
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--stack").or(predicate::str::contains("--any-stack")));
    }

    #[test]
    fn build_produces_archive() {
        let root = fixture_buildpack();
        let cache_dir = seeded_cache();

        packager()
            .args(["build", "--stack", "cflinuxfs4", "--cache-dir"])
            .arg(cache_dir.path())
            .arg(root.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("ruby_buildpack-cflinuxfs4-v1.0.0.zip"));

        assert!(root
            .path()
            .join("ruby_buildpack-cflinuxfs4-v1.0.0.zip")
            .exists());
    }

    #[test]
    fn build_cached_mode_names_archive() {
        let root = fixture_buildpack();
        let cache_dir = seeded_cache();

        packager()
            .args(["build", "--any-stack", "--cached", "--cache-dir"])
            .arg(cache_dir.path())
            .arg(root.path())
            .assert()
            .success();

        assert!(root.path().join("ruby_buildpack-cached-v1.0.0.zip").exists());
    }

    #[test]
    fn build_without_manifest_fails_with_hint() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("VERSION"), "1.0.0\n").unwrap();

        packager()
            .args(["build", "--any-stack"])
            .arg(root.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("manifest"));
    }

    #[test]
    fn build_without_version_file_fails() {
        let root = fixture_buildpack();
        fs::remove_file(root.path().join("VERSION")).unwrap();
        let cache_dir = seeded_cache();

        packager()
            .args(["build", "--any-stack", "--cache-dir"])
            .arg(cache_dir.path())
            .arg(root.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("VERSION"));
    }

    #[test]
    fn build_rejects_corrupt_cache_without_network() {
        let root = fixture_buildpack();
        let cache_dir = TempDir::new().unwrap();
        let local = cache::cached_path(cache_dir.path(), "https://example.com/foo.tgz");
        fs::write(local, b"corrupted").unwrap();

        // The re-download of the corrupt entry cannot reach example.com,
        // so the run must fail rather than package bad bits.
        packager()
            .args(["build", "--stack", "cflinuxfs4", "--cache-dir"])
            .arg(cache_dir.path())
            .arg(root.path())
            .assert()
            .failure();
        assert!(!root
            .path()
            .join("ruby_buildpack-cflinuxfs4-v1.0.0.zip")
            .exists());
    }

    #[test]
    fn list_table_shows_dependencies() {
        let root = fixture_buildpack();

        packager()
            .arg("list")
            .arg(root.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("NAME"))
            .stdout(predicate::str::contains("foo"))
            .stdout(predicate::str::contains("cflinuxfs4"));
    }

    #[test]
    fn list_json_is_parseable() {
        let root = fixture_buildpack();

        let output = packager()
            .args(["list", "--format", "json"])
            .arg(root.path())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let deps: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(deps[0]["name"], "foo");
        assert_eq!(deps[0]["sha256"], HELLO_SHA256);
    }

    #[test]
    fn defaults_shows_versions() {
        let root = fixture_buildpack();

        packager()
            .arg("defaults")
            .arg(root.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("foo"))
            .stdout(predicate::str::contains("1.0"));
    }

    #[test]
    fn list_missing_manifest_fails() {
        let root = TempDir::new().unwrap();

        packager()
            .arg("list")
            .arg(root.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }
}
