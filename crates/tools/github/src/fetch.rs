//! Downloading a selected asset into the tool cache.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use buf_setup_core::{Error, Result, TOOL_NAME, ToolCache};
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::info;

use crate::release::ReleaseSource;
use crate::selector::SelectedAsset;

/// Downloads release assets and stores them in a [`ToolCache`].
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    cache: ToolCache,
    tool: String,
}

impl ArtifactFetcher {
    /// Create a fetcher that caches buf under `cache`.
    #[must_use]
    pub fn new(cache: ToolCache) -> Self {
        Self {
            cache,
            tool: TOOL_NAME.to_string(),
        }
    }

    /// Download `selected`, unpack it if needed, and cache it.
    ///
    /// The cache key is the release tag, so `latest` is stored under the
    /// version it resolved to. Returns the cached artifact directory.
    ///
    /// # Errors
    ///
    /// Returns `ReleaseQuery` if the download fails, `Extract` if the archive
    /// is unreadable, or an I/O error while caching.
    pub async fn fetch(&self, source: &dyn ReleaseSource, selected: &SelectedAsset) -> Result<PathBuf> {
        info!(
            "Downloading {} version \"{}\" from {}",
            self.tool, selected.release_tag, selected.download_url
        );
        let data = source.download(&selected.download_url).await?;
        info!(
            bytes = data.len(),
            "Successfully downloaded {} version \"{}\"", self.tool, selected.release_tag
        );

        let staging = tempfile::TempDir::new()
            .map_err(|e| Error::io(e, None::<PathBuf>, "create staging directory"))?;

        let arch = selected.platform.arch;
        let cached = if is_tarball(&selected.asset_name) {
            info!("Extracting {}...", self.tool);
            let root = extract_tar_gz(&data, &selected.asset_name, staging.path(), &self.tool)?;
            info!("Successfully extracted {} to {}", self.tool, root.display());
            self.cache
                .cache_dir(&root, &self.tool, &selected.release_tag, arch)?
        } else {
            // Windows releases are a bare executable rather than a bundle
            let binary_name = selected.platform.binary_name(&self.tool);
            let download = staging.path().join(&binary_name);
            std::fs::write(&download, &data)
                .map_err(|e| Error::io(e, Some(&download), "write"))?;
            self.cache.cache_file(
                &download,
                &binary_name,
                &self.tool,
                &selected.release_tag,
                arch,
            )?
        };

        info!("Successfully cached {} to {}", self.tool, cached.display());
        Ok(cached)
    }
}

fn is_tarball(asset_name: &str) -> bool {
    asset_name.ends_with(".tar.gz") || asset_name.ends_with(".tgz")
}

/// Unpack a gzipped tarball into `dest` and return the bundle root.
///
/// Release tarballs wrap everything in a top-level directory named after the
/// tool; if that directory is absent the extraction root itself is returned.
fn extract_tar_gz(data: &[u8], asset_name: &str, dest: &Path, tool: &str) -> Result<PathBuf> {
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));
    archive
        .unpack(dest)
        .map_err(|e| Error::extract(asset_name, e.to_string()))?;

    let bundle = dest.join(tool);
    if bundle.is_dir() {
        Ok(bundle)
    } else {
        Ok(dest.to_path_buf())
    }
}
