//! Publishing a cached artifact on the execution path.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::{Error, ExecutionEnvironment, Os, Platform, Result};

/// Flag passed to the installed binary to print its version.
const VERSION_FLAG: &str = "--version";

/// A binary that has been published and located on the execution path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedBinary {
    /// The directory that was added to the execution path.
    pub path_entry: PathBuf,
    /// Where the binary was found.
    pub binary: PathBuf,
}

/// Publishes a cached tool directory and verifies the binary resolves.
#[derive(Debug, Clone)]
pub struct Installer {
    tool: String,
}

impl Installer {
    /// Create an installer for `tool`.
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    /// The directory to put on the execution path for an artifact.
    ///
    /// Windows artifacts hold the executable at their root; tarball artifacts
    /// keep it under `bin/`.
    #[must_use]
    pub fn path_entry(artifact_dir: &Path, os: Os) -> PathBuf {
        match os {
            Os::Windows => artifact_dir.to_path_buf(),
            Os::Darwin | Os::Linux => artifact_dir.join("bin"),
        }
    }

    /// Add the artifact to the execution path and locate the binary.
    ///
    /// # Errors
    ///
    /// Returns `BinaryNotFound` if the binary does not resolve after the path
    /// was updated. The cache is already populated at this point, so there is
    /// nothing to retry.
    pub fn publish(
        &self,
        env: &mut dyn ExecutionEnvironment,
        artifact_dir: &Path,
        platform: &Platform,
    ) -> Result<PublishedBinary> {
        let path_entry = Self::path_entry(artifact_dir, platform.os);
        info!("Adding {} binary to PATH", self.tool);
        env.add_path(&path_entry)?;

        let binary = env
            .which(&self.tool)
            .ok_or_else(|| Error::binary_not_found(&self.tool))?;
        info!(binary = %binary.display(), "Located {}", self.tool);

        Ok(PublishedBinary { path_entry, binary })
    }

    /// Run `<binary> --version` and return what it printed.
    ///
    /// This is a diagnostic only: a query that fails to spawn or exits non-zero
    /// is logged as a warning and yields `None`.
    pub fn query_version(&self, env: &dyn ExecutionEnvironment, binary: &Path) -> Option<String> {
        match env.run(binary, &[VERSION_FLAG], None) {
            Ok(output) if output.success => {
                // buf has printed its version to either stream across releases
                let printed = if output.stdout.trim().is_empty() {
                    output.stderr.trim()
                } else {
                    output.stdout.trim()
                };
                info!("{printed}");
                Some(printed.to_string())
            }
            Ok(output) => {
                warn!(
                    code = ?output.code,
                    "`{} {VERSION_FLAG}` exited unsuccessfully: {}",
                    self.tool,
                    output.stderr.trim()
                );
                None
            }
            Err(e) => {
                warn!("Failed to run `{} {VERSION_FLAG}`: {e}", self.tool);
                None
            }
        }
    }
}
