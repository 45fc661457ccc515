//! Dependency fetching through a pluggable transport
//!
//! The `Fetcher` guarantees a cache-local copy of each dependency exists,
//! downloading through a `Transport` when the cache misses or a forced
//! download is requested. Resilience against transient network failures
//! lives in the transport (fixed retry budget, fixed delay); the fetcher
//! itself never retries.

use crate::cache;
use crate::error::{PackagerError, PackagerResult};
use crate::manifest::Dependency;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Download transport for dependency artifacts.
///
/// Implementations must write the full artifact to `dest` on success and
/// apply their own bounded retry policy to transient failures.
pub trait Transport {
    fn fetch(&self, uri: &str, dest: &Path) -> PackagerResult<()>;
}

/// Outcome of a single transport attempt, deciding retry eligibility
enum AttemptError {
    /// Worth retrying: network errors, HTTP 5xx, interrupted body reads
    Transient(String),
    /// Not worth retrying: HTTP 4xx, local filesystem failures
    Fatal(String),
}

/// Blocking HTTP transport with a fixed retry budget and fixed delay,
/// mirroring the bounded-retry contract the pipeline expects.
pub struct HttpTransport {
    retry_budget: u32,
    retry_delay: Duration,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            retry_budget: 15,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the retry policy (tests use a zero delay)
    pub fn with_retry(retry_budget: u32, retry_delay: Duration) -> Self {
        Self {
            retry_budget,
            retry_delay,
        }
    }

    fn attempt(&self, uri: &str, part: &Path) -> Result<(), AttemptError> {
        let mut response = match ureq::get(uri).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) if code >= 500 => {
                return Err(AttemptError::Transient(format!("HTTP {}", code)));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(AttemptError::Fatal(format!("HTTP {}", code)));
            }
            Err(e) => return Err(AttemptError::Transient(e.to_string())),
        };

        let mut file = File::create(part)
            .map_err(|e| AttemptError::Fatal(format!("creating {}: {}", part.display(), e)))?;
        let mut body = response.body_mut().as_reader();
        io::copy(&mut body, &mut file)
            .map_err(|e| AttemptError::Transient(format!("reading response body: {}", e)))?;
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, uri: &str, dest: &Path) -> PackagerResult<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PackagerError::io(format!("creating {}", parent.display()), e))?;
        }

        // Download to a .part file, rename into place on success
        let part = PathBuf::from(format!("{}.part", dest.display()));
        let safe_uri = cache::redact_credentials(uri);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(uri, &part) {
                Ok(()) => {
                    fs::rename(&part, dest).map_err(|e| {
                        PackagerError::io(format!("renaming {} into place", part.display()), e)
                    })?;
                    return Ok(());
                }
                Err(AttemptError::Fatal(reason)) => {
                    let _ = fs::remove_file(&part);
                    return Err(PackagerError::download(safe_uri, dest, reason));
                }
                Err(AttemptError::Transient(reason)) => {
                    if attempt >= self.retry_budget {
                        let _ = fs::remove_file(&part);
                        return Err(PackagerError::download(
                            safe_uri,
                            dest,
                            format!("{} (after {} attempts)", reason, attempt),
                        ));
                    }
                    warn!(
                        "Transient failure fetching {} (attempt {}): {}",
                        safe_uri, attempt, reason
                    );
                    std::thread::sleep(self.retry_delay);
                }
            }
        }
    }
}

/// Ensures cache-local copies of dependencies exist
pub struct Fetcher<'a> {
    transport: &'a dyn Transport,
    cache_root: &'a Path,
    force_download: bool,
}

impl<'a> Fetcher<'a> {
    pub fn new(transport: &'a dyn Transport, cache_root: &'a Path, force_download: bool) -> Self {
        Self {
            transport,
            cache_root,
            force_download,
        }
    }

    /// Ensure a cached copy of the dependency exists.
    ///
    /// Returns the local path and whether it was satisfied from cache.
    /// A download failure is fatal for the whole run; a missing dependency
    /// would make the produced archive incorrect.
    pub fn ensure_cached(&self, dep: &Dependency) -> PackagerResult<(PathBuf, bool)> {
        fs::create_dir_all(self.cache_root).map_err(|e| {
            PackagerError::io(format!("creating cache dir {}", self.cache_root.display()), e)
        })?;

        let local = cache::cached_path(self.cache_root, &dep.uri);
        if self.force_download || !local.exists() {
            debug!(
                "Fetching {} {} to {}",
                dep.name,
                dep.version,
                local.display()
            );
            self.transport.fetch(&dep.uri, &local)?;
            Ok((local, false))
        } else {
            debug!("Cache hit for {} {}", dep.name, dep.version);
            Ok((local, true))
        }
    }

    /// Discard any cached copy and download fresh. Used by the integrity
    /// gate to heal a stale cache entry, exactly once.
    pub fn refetch(&self, dep: &Dependency) -> PackagerResult<PathBuf> {
        let local = cache::cached_path(self.cache_root, &dep.uri);
        if local.exists() {
            fs::remove_file(&local).map_err(|e| {
                PackagerError::io(format!("removing stale cache file {}", local.display()), e)
            })?;
        }
        self.transport.fetch(&dep.uri, &local)?;
        Ok(local)
    }
}
