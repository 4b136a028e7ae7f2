//! GitHub REST API client for release listing and asset download.

use async_trait::async_trait;
use buf_setup_core::{Error, Result, Token};
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use tracing::debug;

use crate::release::{Release, ReleaseSource};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Repository buf is released from.
pub const RELEASE_REPO: &str = "bufbuild/buf";

const USER_AGENT: &str = concat!("buf-setup/", env!("CARGO_PKG_VERSION"));

/// Release source backed by the GitHub Releases API.
#[derive(Debug, Clone)]
pub struct GitHubReleaseClient {
    client: Client,
    api_url: String,
    repo: String,
    token: Option<Token>,
}

impl GitHubReleaseClient {
    /// Create a client for `bufbuild/buf` on the given API endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the HTTP client cannot be built (TLS backend
    /// initialization failure).
    pub fn new(api_url: impl Into<String>, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            repo: RELEASE_REPO.to_string(),
            token,
        })
    }

    /// Query a different repository.
    #[must_use]
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        }
    }

    /// `.../releases/tags/<tag>` with the tag as one encoded path segment.
    fn release_tag_url(&self, tag: &str) -> Result<Url> {
        let base = format!("{}/repos/{}/releases/tags", self.api_url, self.repo);
        let mut url = Url::parse(&base)
            .map_err(|e| Error::release_query(format!("Invalid API URL {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| Error::release_query(format!("Invalid API URL {base}")))?
            .push(tag);
        Ok(url)
    }

    fn api_get(&self, url: &str) -> RequestBuilder {
        self.authorized(
            self.client
                .get(url)
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", "2022-11-28"),
        )
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleaseClient {
    async fn latest_release(&self) -> Result<Option<Release>> {
        let url = format!("{}/repos/{}/releases?per_page=1", self.api_url, self.repo);
        debug!(%url, "Fetching most recent GitHub release");

        let response = self
            .api_get(&url)
            .send()
            .await
            .map_err(|e| Error::release_query(format!("Failed to fetch releases: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::release_query(format!(
                "Failed to list releases of {} (HTTP {})",
                self.repo,
                response.status()
            )));
        }

        let releases: Vec<Release> = response
            .json()
            .await
            .map_err(|e| Error::release_query(format!("Failed to parse releases: {e}")))?;
        Ok(releases.into_iter().next())
    }

    async fn release_by_tag(&self, tag: &str) -> Result<Option<Release>> {
        let url = self.release_tag_url(tag)?;
        debug!(%url, "Fetching GitHub release");

        let response = self
            .api_get(url.as_str())
            .send()
            .await
            .map_err(|e| Error::release_query(format!("Failed to fetch release: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%tag, "Release not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::release_query(format!(
                "Failed to fetch release {} {} (HTTP {})",
                self.repo,
                tag,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| Error::release_query(format!("Failed to parse release: {e}")))
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        debug!(%url, "Downloading GitHub asset");

        let response = self
            .authorized(self.client.get(url).header("Accept", "application/octet-stream"))
            .send()
            .await
            .map_err(|e| Error::release_query(format!("Failed to download asset: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::release_query(format!(
                "Failed to download asset (HTTP {})",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::release_query(format!("Failed to read asset: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_trailing_slash_trimmed() {
        let client = GitHubReleaseClient::new("https://ghe.example.com/api/v3/", None).unwrap();
        assert_eq!(client.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(client.repo, RELEASE_REPO);
    }

    #[test]
    fn test_with_repo() {
        let client = GitHubReleaseClient::new(DEFAULT_API_URL, None)
            .unwrap()
            .with_repo("org/tool");
        assert_eq!(client.repo, "org/tool");
    }

    #[test]
    fn test_release_tag_url_encodes_tag() {
        let client = GitHubReleaseClient::new("https://ghe.example.com/api/v3/", None).unwrap();
        let url = client.release_tag_url("v1.0.0/../x?y#z").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/bufbuild/buf/releases/tags/v1.0.0%2F..%2Fx%3Fy%23z"
        );
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let client =
            GitHubReleaseClient::new(DEFAULT_API_URL, Some(Token::new("ghp_secret"))).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
