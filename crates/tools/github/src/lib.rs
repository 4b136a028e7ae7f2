//! GitHub Releases provider for buf-setup.
//!
//! Resolves which `bufbuild/buf` release asset matches the host, downloads it
//! and places it in the tool cache:
//!
//! - [`ReleaseSource`] - release listing and download, implemented by
//!   [`GitHubReleaseClient`] over the GitHub REST API
//! - [`AssetSelector`] - platform to asset name mapping and release lookup
//! - [`ArtifactFetcher`] - download, extraction and caching of a selected asset

mod client;
mod fetch;
mod release;
mod selector;

pub use client::{DEFAULT_API_URL, GitHubReleaseClient, RELEASE_REPO};
pub use fetch::ArtifactFetcher;
pub use release::{Asset, Release, ReleaseSource};
pub use selector::{AssetSelector, SelectedAsset};
