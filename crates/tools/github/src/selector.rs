//! Mapping a version and host platform to a release asset.

use buf_setup_core::{
    Error, LATEST, Platform, Result, TOOL_NAME, release_tag, tag_matches_version,
};
use tracing::{debug, info};

use crate::release::{Release, ReleaseSource};

/// The asset chosen for a version and platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAsset {
    /// Tag of the release the asset belongs to.
    pub release_tag: String,
    /// Asset file name, e.g. `buf-Darwin-arm64.tar.gz`.
    pub asset_name: String,
    /// Where to download it from.
    pub download_url: String,
    /// The platform it was selected for.
    pub platform: Platform,
}

/// Resolves release assets against a [`ReleaseSource`].
pub struct AssetSelector<'a> {
    source: &'a dyn ReleaseSource,
    tool: String,
}

impl<'a> AssetSelector<'a> {
    /// Create a selector for buf releases.
    #[must_use]
    pub fn new(source: &'a dyn ReleaseSource) -> Self {
        Self {
            source,
            tool: TOOL_NAME.to_string(),
        }
    }

    /// Select the download for raw host platform and architecture names.
    ///
    /// The names are mapped before any release is queried, so an unsupported
    /// host never touches the network.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchitecture`, `UnsupportedPlatform`, or whatever
    /// [`AssetSelector::select`] returns.
    pub async fn select_download_url(
        &self,
        version: &str,
        platform: &str,
        arch: &str,
    ) -> Result<SelectedAsset> {
        let platform = Platform::parse(platform, arch)?;
        self.select(version, &platform).await
    }

    /// Select the download for a version on a platform.
    ///
    /// `latest` searches the most recent release. Any other version is turned
    /// into a `v`-prefixed tag and that release is searched.
    ///
    /// # Errors
    ///
    /// Returns `AssetNotFound` when no release or no matching asset exists, and
    /// propagates `ReleaseQuery` failures.
    pub async fn select(&self, version: &str, platform: &Platform) -> Result<SelectedAsset> {
        let asset_name = platform.asset_name(&self.tool);
        info!(%version, %asset_name, "Resolving the download URL for the current platform");

        let release = if version == LATEST {
            self.source.latest_release().await?
        } else {
            let tag = release_tag(version);
            self.source
                .release_by_tag(&tag)
                .await?
                .filter(|release| tag_matches_version(&release.tag_name, version))
        };

        let selected = release
            .as_ref()
            .and_then(|release| Self::match_asset(release, &asset_name, platform));
        match selected {
            Some(selected) => {
                debug!(tag = %selected.release_tag, url = %selected.download_url, "Resolved release asset");
                Ok(selected)
            }
            None => Err(Error::asset_not_found(
                version,
                platform.os.to_string(),
                platform.arch.to_string(),
            )),
        }
    }

    fn match_asset(release: &Release, asset_name: &str, platform: &Platform) -> Option<SelectedAsset> {
        release.asset(asset_name).map(|asset| SelectedAsset {
            release_tag: release.tag_name.clone(),
            asset_name: asset.name.clone(),
            download_url: asset.browser_download_url.clone(),
            platform: *platform,
        })
    }
}
