//! Install `buf` for a CI job.
//!
//! A run resolves the requested version (from the `version` input or a
//! `go.mod`), finds it in the tool cache or downloads the matching GitHub
//! release asset, puts the binary on PATH, and optionally logs in to the Buf
//! Schema Registry.
//!
//! The binary reads its inputs the way a GitHub Action does (`INPUT_*`
//! environment variables) and reports through workflow commands when
//! `GITHUB_ACTIONS=true`, so it can back an action step or run in any shell.

pub mod cli;
pub mod login;
pub mod runner;
pub mod tracing;
pub mod workflow;

use buf_setup_core::{HostEnvironment, Result, ToolCache};
use buf_setup_github::GitHubReleaseClient;

pub use cli::{
    Cli, EXIT_FAILED, EXIT_OK, RunScope, SetupInputs, install_panic_hook, render_error,
};
pub use runner::{Runner, SetupOutcome, Stage};

/// Run setup on this host with the real GitHub API.
///
/// # Errors
///
/// Returns the first error the run hit.
pub async fn run(inputs: &SetupInputs) -> Result<SetupOutcome> {
    let client = GitHubReleaseClient::new(inputs.api_url.clone(), inputs.github_token.clone())?;

    let mut env = HostEnvironment::new();
    if let Some(path_file) = &inputs.github_path {
        env = env.with_path_file(path_file.clone());
    }

    let cache = ToolCache::new(inputs.tool_cache.clone());
    ::tracing::debug!(cache = %cache.root().display(), api = %inputs.api_url, "Starting setup");

    Runner::new(&client, &mut env, cache).execute(inputs).await
}
