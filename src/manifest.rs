//! Dependency manifest parsing and stack projection
//!
//! A buildpack declares its third-party binary dependencies in a YAML
//! `manifest.yml`. Packaging for a concrete stack rewrites the staged
//! manifest to a projection containing only that stack's dependencies,
//! with per-dependency stack membership stripped. The original manifest
//! is never mutated.

use crate::config::Stack;
use crate::error::{PackagerError, PackagerResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

/// The manifest filename inside a buildpack tree.
pub const MANIFEST_FILE: &str = "manifest.yml";

/// Parsed buildpack manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Language this buildpack serves; first component of the archive name
    pub language: String,

    /// Concrete stack this manifest was projected for. Absent in source
    /// manifests; set by `project` for a named stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// Default dependency versions, in declaration order
    #[serde(default)]
    pub default_versions: Vec<VersionRef>,

    /// Declared dependencies, in declaration order
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Glob patterns excluded from the output archive
    #[serde(default)]
    pub exclude_files: Vec<String>,

    /// Shell command to run in the buildpack root before packaging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_package: Option<String>,
}

/// A name/version pair from `default_versions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRef {
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
}

/// A single declared dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,

    #[serde(deserialize_with = "string_or_number")]
    pub version: String,

    /// Source locator; may embed credentials, which must never reach
    /// logs or disk paths unredacted
    pub uri: String,

    /// Expected SHA-256 of the artifact, hex encoded
    pub sha256: String,

    /// Stacks this dependency applies to. Stripped from projected
    /// manifests so a stack-specific archive leaks no membership data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_stacks: Option<Vec<String>>,
}

impl Dependency {
    /// Whether this dependency applies to the given stack selector.
    /// The `Any` selector matches every dependency.
    pub fn applies_to(&self, stack: &Stack) -> bool {
        match stack {
            Stack::Any => true,
            Stack::Named(name) => self
                .cf_stacks
                .as_ref()
                .is_some_and(|stacks| stacks.iter().any(|s| s == name)),
        }
    }
}

impl Manifest {
    /// Parse a manifest from a YAML file on disk
    pub fn from_path(path: &Path) -> PackagerResult<Self> {
        if !path.exists() {
            return Err(PackagerError::ManifestNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| PackagerError::io(format!("reading manifest {}", path.display()), e))?;
        Self::parse(&content).map_err(|e| PackagerError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parse a manifest from a YAML string
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize back to YAML (for the staged, projected manifest)
    pub fn to_yaml(&self) -> PackagerResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Project this manifest for a stack selector, returning a derived copy.
    ///
    /// `Stack::Any` returns the manifest unchanged. A named stack keeps
    /// only the dependencies applicable to it, strips `cf_stacks` from
    /// each kept dependency, and records the stack on the manifest itself.
    /// A stack with no matching dependencies yields an empty dependency
    /// list, not an error.
    pub fn project(&self, stack: &Stack) -> Manifest {
        let Stack::Named(name) = stack else {
            return self.clone();
        };

        let mut projected = self.clone();
        projected.stack = Some(name.clone());
        projected.dependencies = self
            .dependencies
            .iter()
            .filter(|dep| dep.applies_to(stack))
            .map(|dep| {
                let mut dep = dep.clone();
                dep.cf_stacks = None;
                dep
            })
            .collect();
        projected
    }
}

/// Accept YAML scalars like `version: 1.0` that parse as numbers, not
/// strings, in hand-written manifests.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Number(serde_yaml::Number),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::String(s) => s,
        Scalar::Number(n) => n.to_string(),
    })
}
