//! Error types for buildpack-packager
//!
//! All modules use `PackagerResult<T>` as their return type. Every error
//! here is fatal for the current packaging run: there is no
//! recover-and-continue path, because a partial archive is worse than none.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for packager operations
pub type PackagerResult<T> = Result<T, PackagerError>;

/// All errors that can occur while packaging a buildpack
#[derive(Error, Debug)]
pub enum PackagerError {
    // Manifest errors
    #[error("Manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    // Dependency errors
    #[error("Failed to download {uri} to {dest}: {reason}")]
    DownloadFailure {
        uri: String,
        dest: PathBuf,
        reason: String,
    },

    #[error(
        "Checksum mismatch for {name} {version} ({uri}): \
         manifest declares sha256 {expected}, file digests to {actual}"
    )]
    ChecksumMismatch {
        name: String,
        version: String,
        uri: String,
        expected: String,
        actual: String,
    },

    // Buildpack tree errors
    #[error("Buildpack directory not found: {0}")]
    BuildpackDirNotFound(PathBuf),

    #[error("VERSION file not found at {0}")]
    VersionFileMissing(PathBuf),

    #[error("pre_package command failed: {command} (exit code {code})")]
    PrePackageFailed { command: String, code: i32 },

    // Archive errors
    #[error("Invalid exclusion pattern '{pattern}': {reason}")]
    ExclusionPatternInvalid { pattern: String, reason: String },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PackagerError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a download failure error. The caller is responsible for
    /// passing a credential-redacted URI.
    pub fn download(
        uri: impl Into<String>,
        dest: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::DownloadFailure {
            uri: uri.into(),
            dest: dest.into(),
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ManifestNotFound(_) => Some("Pass --manifest or run from the buildpack root"),
            Self::VersionFileMissing(_) => {
                Some("Create a VERSION file containing the buildpack version")
            }
            Self::ChecksumMismatch { .. } => Some(
                "The manifest sha256 does not match the served file; \
                 update the manifest or the upstream artifact",
            ),
            _ => None,
        }
    }
}
