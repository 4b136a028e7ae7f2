//! Release metadata and the release listing seam.

use async_trait::async_trait;
use buf_setup_core::Result;
use bytes::Bytes;
use serde::Deserialize;

/// GitHub release metadata from the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Git tag the release was cut from, e.g. `v1.26.0`.
    pub tag_name: String,
    /// Attached assets in published order.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// Find the asset with exactly this file name.
    #[must_use]
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

/// GitHub release asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    /// File name, e.g. `buf-Linux-x86_64.tar.gz`.
    pub name: String,
    /// Public download URL.
    pub browser_download_url: String,
}

/// Source of published releases.
///
/// Implemented over the GitHub API by [`crate::GitHubReleaseClient`]; tests
/// substitute canned releases.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// The most recently published release, if any.
    ///
    /// # Errors
    ///
    /// Returns `ReleaseQuery` if the listing cannot be fetched.
    async fn latest_release(&self) -> Result<Option<Release>>;

    /// The release for an exact tag, or `None` if no such release exists.
    ///
    /// # Errors
    ///
    /// Returns `ReleaseQuery` for transport or decoding failures.
    async fn release_by_tag(&self, tag: &str) -> Result<Option<Release>>;

    /// Download an asset's bytes.
    ///
    /// # Errors
    ///
    /// Returns `ReleaseQuery` if the download fails.
    async fn download(&self, url: &str) -> Result<Bytes>;
}
