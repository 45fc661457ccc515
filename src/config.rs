//! Packaging run configuration
//!
//! One `PackagerConfig` is assembled by the CLI layer per run and threaded
//! through the pipeline. The default cache location is resolved exactly
//! once here; nothing downstream reads environment variables.

use std::fmt;
use std::path::PathBuf;

/// Target stack selector for a packaging run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stack {
    /// No stack filtering; dependencies for every stack are included
    Any,
    /// A concrete stack identifier, e.g. `cflinuxfs4`
    Named(String),
}

impl Stack {
    /// Create a named stack selector
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The concrete stack name, if any
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Packaging mode. Only affects the archive file name; dependencies are
/// fetched and verified either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Cached,
}

impl Mode {
    /// Archive name infix for this mode (`-cached` or empty)
    pub fn archive_infix(&self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Cached => "-cached",
        }
    }
}

/// Configuration for one packaging run
#[derive(Debug, Clone)]
pub struct PackagerConfig {
    /// Buildpack source tree root
    pub root_dir: PathBuf,

    /// Path to the dependency manifest
    pub manifest_path: PathBuf,

    /// Target stack selector
    pub stack: Stack,

    /// Packaging mode (affects archive naming only)
    pub mode: Mode,

    /// Local dependency cache directory
    pub cache_dir: PathBuf,

    /// Re-download dependencies even when a cached copy exists
    pub force_download: bool,
}

impl PackagerConfig {
    /// Create a config for a buildpack root with defaults for everything else
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            manifest_path: root_dir.join("manifest.yml"),
            root_dir,
            stack: Stack::Any,
            mode: Mode::Normal,
            cache_dir: default_cache_dir(),
            force_download: false,
        }
    }
}

/// Default dependency cache directory: `~/.buildpack-packager/cache`.
///
/// Resolved from the user's home directory once at startup and passed
/// through `PackagerConfig`; the rest of the pipeline never consults the
/// environment.
pub fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".buildpack-packager")
        .join("cache")
}
