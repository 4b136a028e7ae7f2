//! The end-to-end setup run.
//!
//! A run moves through [`Stage`]s in order and stops at the first failure:
//!
//! ```text
//! Start -> VersionResolved -> UrlResolved -> Cached -> Published -> Verified
//!       -> (Authenticated) -> Done
//! ```
//!
//! `UrlResolved` is skipped when the requested version is already cached.
//! There are no retries.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use buf_setup_core::{
    Error, ExecutionEnvironment, Installer, LATEST, Platform, Result, TOOL_NAME, ToolCache,
    VersionResolver, host_names,
};
use buf_setup_github::{ArtifactFetcher, AssetSelector, ReleaseSource};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::cli::SetupInputs;
use crate::login::{RegistryCredentials, login};

/// Progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing has happened yet.
    Start,
    /// A non-empty version was resolved.
    VersionResolved,
    /// A release asset was selected.
    UrlResolved,
    /// The artifact is in the tool cache.
    Cached,
    /// The artifact directory is on PATH.
    Published,
    /// The binary was located and queried for its version.
    Verified,
    /// Registry login succeeded.
    Authenticated,
    /// The run finished.
    Done,
    /// The run stopped on an error.
    Failed,
}

/// What a successful run installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    /// The version that was requested after resolution, possibly `latest`.
    pub version: String,
    /// The platform the artifact was selected for.
    pub platform: Platform,
    /// Cached artifact directory.
    pub artifact_dir: PathBuf,
    /// The directory added to PATH.
    pub path_entry: PathBuf,
    /// The located binary.
    pub binary: PathBuf,
    /// Whether the artifact came from the tool cache without a download.
    pub cache_hit: bool,
    /// What `buf --version` printed, if the query succeeded.
    pub reported_version: Option<String>,
    /// Whether a registry login was performed.
    pub logged_in: bool,
}

/// Drives one setup run against its collaborators.
pub struct Runner<'a> {
    releases: &'a dyn ReleaseSource,
    env: &'a mut dyn ExecutionEnvironment,
    cache: ToolCache,
    host_os: String,
    host_arch: String,
    stage: Stage,
}

impl<'a> Runner<'a> {
    /// Create a runner for the current host.
    pub fn new(
        releases: &'a dyn ReleaseSource,
        env: &'a mut dyn ExecutionEnvironment,
        cache: ToolCache,
    ) -> Self {
        let (host_os, host_arch) = host_names();
        Self {
            releases,
            env,
            cache,
            host_os: host_os.to_string(),
            host_arch: host_arch.to_string(),
            stage: Stage::Start,
        }
    }

    /// Pretend to run on another host, named as in `linux`/`x64`.
    #[must_use]
    pub fn with_host(mut self, os: impl Into<String>, arch: impl Into<String>) -> Self {
        self.host_os = os.into();
        self.host_arch = arch.into();
        self
    }

    /// The stage the run has reached.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, stage: Stage) {
        debug!(from = ?self.stage, to = ?stage, "Setup stage");
        self.stage = stage;
    }

    /// Run setup, turning a panic anywhere in the run into `Internal`.
    ///
    /// # Errors
    ///
    /// Returns the first error the run hit.
    pub async fn execute(&mut self, inputs: &SetupInputs) -> Result<SetupOutcome> {
        match AssertUnwindSafe(self.run(inputs)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                self.stage = Stage::Failed;
                let message = panic_message(payload.as_ref());
                debug!(%message, "Setup panicked");
                Err(Error::internal(format!("unexpected failure: {message}")))
            }
        }
    }

    /// Run setup.
    ///
    /// # Errors
    ///
    /// Returns the first error the run hit; the stage it was in is logged.
    pub async fn run(&mut self, inputs: &SetupInputs) -> Result<SetupOutcome> {
        let result = self.run_stages(inputs).await;
        if let Err(err) = &result {
            debug!(stage = ?self.stage, error = %err, "Setup failed");
            self.stage = Stage::Failed;
        }
        result
    }

    async fn run_stages(&mut self, inputs: &SetupInputs) -> Result<SetupOutcome> {
        if inputs.github_token.is_none() {
            warn!("No github_token supplied, API requests will be subject to stricter rate limiting");
        }

        let resolved = VersionResolver::new().resolve(&inputs.version, &inputs.go_version_file)?;
        if resolved.is_empty() {
            return Err(Error::input_missing("a version was not provided"));
        }
        let version = resolved.version;
        self.advance(Stage::VersionResolved);
        info!("Setting up buf version \"{version}\"");

        let platform = Platform::parse(&self.host_os, &self.host_arch)?;
        debug!(%platform, "Detected host platform");

        let (artifact_dir, cache_hit) = self.locate_artifact(&version, &platform).await?;
        self.advance(Stage::Cached);

        let installer = Installer::new(TOOL_NAME);
        let published = installer.publish(&mut *self.env, &artifact_dir, &platform)?;
        self.advance(Stage::Published);
        let reported_version = installer.query_version(&*self.env, &published.binary);
        self.advance(Stage::Verified);

        let credentials = RegistryCredentials::from_inputs(
            &inputs.buf_domain,
            inputs.buf_user.as_deref(),
            inputs.buf_api_token.as_ref(),
        );
        let logged_in = if let Some(credentials) = credentials {
            login(&*self.env, &published.binary, &credentials)?;
            self.advance(Stage::Authenticated);
            true
        } else {
            false
        };

        self.advance(Stage::Done);
        info!("Successfully setup buf version {version}");

        Ok(SetupOutcome {
            version,
            platform,
            artifact_dir,
            path_entry: published.path_entry,
            binary: published.binary,
            cache_hit,
            reported_version,
            logged_in,
        })
    }

    /// Find the artifact in the cache or download it.
    ///
    /// Explicit versions are looked up before any release query. `latest` has
    /// to be resolved to a release tag first, which is then the cache key.
    async fn locate_artifact(&mut self, version: &str, platform: &Platform) -> Result<(PathBuf, bool)> {
        if let Some(dir) = self.cache.find(TOOL_NAME, version, platform.arch) {
            info!("Found buf version \"{version}\" in the tool cache");
            return Ok((dir, true));
        }

        let selected = AssetSelector::new(self.releases).select(version, platform).await?;
        self.advance(Stage::UrlResolved);

        if version == LATEST {
            if let Some(dir) = self.cache.find(TOOL_NAME, &selected.release_tag, platform.arch) {
                info!(
                    "Found buf version \"{}\" in the tool cache",
                    selected.release_tag
                );
                return Ok((dir, true));
            }
        }

        let dir = ArtifactFetcher::new(self.cache.clone())
            .fetch(self.releases, &selected)
            .await?;
        Ok((dir, false))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
