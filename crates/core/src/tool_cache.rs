//! On-disk tool cache keyed by tool name, version and architecture.
//!
//! The layout matches the GitHub Actions runner tool cache so entries written
//! here are found by other setup steps and vice versa:
//!
//! ```text
//! <root>/<tool>/<version>/<arch>/           cached files
//! <root>/<tool>/<version>/<arch>.complete   marker written last
//! ```
//!
//! An entry without its marker is a partial write and is treated as absent.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::version::{LATEST, trim_version_prefix};
use crate::{Arch, Error, Result};

/// Tool cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
}

impl ToolCache {
    /// Create a cache rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a cached entry lives in.
    #[must_use]
    pub fn entry_dir(&self, tool: &str, version: &str, arch: Arch) -> PathBuf {
        self.root
            .join(tool)
            .join(cache_version(version))
            .join(arch.to_string())
    }

    fn marker_path(&self, tool: &str, version: &str, arch: Arch) -> PathBuf {
        self.root
            .join(tool)
            .join(cache_version(version))
            .join(format!("{arch}.complete"))
    }

    /// Look up a completed entry.
    ///
    /// `latest` is never a cache key and always misses.
    #[must_use]
    pub fn find(&self, tool: &str, version: &str, arch: Arch) -> Option<PathBuf> {
        if version.is_empty() || version == LATEST {
            return None;
        }
        let dir = self.entry_dir(tool, version, arch);
        if self.marker_path(tool, version, arch).is_file() && dir.is_dir() {
            debug!(path = %dir.display(), "Found tool in cache");
            Some(dir)
        } else {
            None
        }
    }

    /// Copy a directory tree into the cache and mark it complete.
    ///
    /// Any previous entry for the same key is replaced.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the copy fails, or `Internal` when asked to
    /// cache under `latest`.
    pub fn cache_dir(&self, source: &Path, tool: &str, version: &str, arch: Arch) -> Result<PathBuf> {
        let dest = self.prepare(tool, version, arch)?;
        copy_dir_all(source, &dest)?;
        self.complete(tool, version, arch)?;
        Ok(dest)
    }

    /// Copy a single file into the cache under `target_name` and mark it complete.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the copy fails, or `Internal` when asked to
    /// cache under `latest`.
    pub fn cache_file(
        &self,
        source: &Path,
        target_name: &str,
        tool: &str,
        version: &str,
        arch: Arch,
    ) -> Result<PathBuf> {
        let dest = self.prepare(tool, version, arch)?;
        let target = dest.join(target_name);
        std::fs::copy(source, &target).map_err(|e| Error::io(e, Some(&target), "copy"))?;
        self.complete(tool, version, arch)?;
        Ok(dest)
    }

    fn prepare(&self, tool: &str, version: &str, arch: Arch) -> Result<PathBuf> {
        if version.is_empty() || version == LATEST {
            return Err(Error::internal(format!(
                "Refusing to cache {tool} under version \"{version}\""
            )));
        }

        let dest = self.entry_dir(tool, version, arch);
        let marker = self.marker_path(tool, version, arch);
        if marker.exists() {
            std::fs::remove_file(&marker).map_err(|e| Error::io(e, Some(&marker), "remove"))?;
        }
        if dest.exists() {
            std::fs::remove_dir_all(&dest).map_err(|e| Error::io(e, Some(&dest), "remove"))?;
        }
        std::fs::create_dir_all(&dest).map_err(|e| Error::io(e, Some(&dest), "create"))?;
        Ok(dest)
    }

    fn complete(&self, tool: &str, version: &str, arch: Arch) -> Result<()> {
        let marker = self.marker_path(tool, version, arch);
        std::fs::write(&marker, b"").map_err(|e| Error::io(e, Some(&marker), "write"))?;
        debug!(path = %marker.display(), "Marked cache entry complete");
        Ok(())
    }
}

/// Get the default tool cache root, `~/.cache/buf-setup/tools`.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("buf-setup")
        .join("tools")
}

/// Cache keys are prefix-insensitive: `v1.2.3` and `1.2.3` share an entry.
fn cache_version(version: &str) -> &str {
    trim_version_prefix(version)
}

fn copy_dir_all(source: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|e| Error::io(e, Some(dest), "create"))?;
    let entries = std::fs::read_dir(source).map_err(|e| Error::io(e, Some(source), "read"))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(e, Some(source), "read"))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| Error::io(e, Some(&from), "stat"))?;
        if file_type.is_dir() {
            copy_dir_all(&from, &to)?;
        } else {
            // std::fs::copy preserves permission bits, keeping binaries executable
            std::fs::copy(&from, &to).map_err(|e| Error::io(e, Some(&from), "copy"))?;
        }
    }
    Ok(())
}
