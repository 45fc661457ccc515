//! CLI command implementations

pub mod build;
pub mod defaults;
pub mod list;

pub use build::execute as build;
pub use defaults::execute as defaults;
pub use list::execute as list;

use crate::error::{PackagerError, PackagerResult};
use std::path::PathBuf;

/// Resolve the buildpack directory argument, falling back to the
/// current working directory
pub(crate) fn resolve_buildpack_dir(dir: Option<PathBuf>) -> PackagerResult<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir()
            .map_err(|e| PackagerError::io("getting current directory", e)),
    }
}
