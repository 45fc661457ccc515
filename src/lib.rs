//! Buildpack Packager - Cloud Foundry buildpack release archive assembly
//!
//! Resolves a buildpack's declared dependencies, verifies them against
//! their manifest checksums through a local content cache, and packages
//! the buildpack tree into a versioned zip archive.

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod package;
pub mod verify;

pub use error::{PackagerError, PackagerResult};
