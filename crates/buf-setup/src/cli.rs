use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use buf_setup_core::{Error, Token, default_cache_dir};
use buf_setup_github::DEFAULT_API_URL;
use clap::Parser;
use miette::Report;

use crate::tracing::{LogLevel, TracingFormat};
use crate::workflow::escape_data;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Any failed run
pub const EXIT_FAILED: i32 = 1;

/// Default Buf Schema Registry host.
pub const DEFAULT_BUF_DOMAIN: &str = "buf.build";

/// Install buf for a CI job.
///
/// Every option can also be supplied the way GitHub Actions passes action
/// inputs, as an `INPUT_<NAME>` environment variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "buf-setup")]
#[command(about = "Resolve, download and put buf on PATH for a CI job")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Version of buf to install, or `latest`.
    #[arg(id = "buf_version", long = "buf-version", env = "INPUT_VERSION", default_value = "")]
    pub buf_version: String,

    /// File to read the version from; a `go.mod` is searched for github.com/bufbuild/buf.
    #[arg(long, env = "INPUT_GO_VERSION_FILE", default_value = "")]
    pub go_version_file: String,

    /// Buf Schema Registry host to log in to.
    #[arg(long, env = "INPUT_BUF_DOMAIN", default_value = DEFAULT_BUF_DOMAIN)]
    pub buf_domain: String,

    /// Token for the GitHub API; raises rate limits.
    #[arg(long, env = "INPUT_GITHUB_TOKEN", default_value = "", hide_env_values = true)]
    pub github_token: String,

    /// Buf Schema Registry username.
    #[arg(long, env = "INPUT_BUF_USER", default_value = "")]
    pub buf_user: String,

    /// Buf Schema Registry API token.
    #[arg(long, env = "INPUT_BUF_API_TOKEN", default_value = "", hide_env_values = true)]
    pub buf_api_token: String,

    /// Root of the tool cache.
    #[arg(long, env = "RUNNER_TOOL_CACHE")]
    pub tool_cache: Option<PathBuf>,

    /// File that collects PATH entries for later workflow steps.
    #[arg(long, env = "GITHUB_PATH")]
    pub github_path: Option<PathBuf>,

    /// GitHub API endpoint.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Log output format.
    #[arg(long, env = "BUF_SETUP_LOG_FORMAT", value_enum)]
    pub log_format: Option<TracingFormat>,

    /// Logging verbosity level.
    #[arg(long, env = "BUF_SETUP_LOG_LEVEL", value_enum)]
    pub log_level: Option<LogLevel>,
}

impl Cli {
    /// Normalize the raw options into run inputs.
    #[must_use]
    pub fn inputs(&self) -> SetupInputs {
        SetupInputs {
            version: self.buf_version.trim().to_string(),
            go_version_file: self.go_version_file.trim().to_string(),
            buf_domain: non_empty(&self.buf_domain).unwrap_or_else(|| DEFAULT_BUF_DOMAIN.to_string()),
            github_token: Token::from_input(&self.github_token),
            buf_user: non_empty(&self.buf_user),
            buf_api_token: Token::from_input(&self.buf_api_token),
            tool_cache: self
                .tool_cache
                .clone()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(default_cache_dir),
            github_path: self.github_path.clone().filter(|p| !p.as_os_str().is_empty()),
            api_url: non_empty(&self.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        }
    }

    /// The log format, detecting GitHub Actions when not set.
    #[must_use]
    pub fn log_format(&self) -> TracingFormat {
        self.log_format.clone().unwrap_or_else(TracingFormat::detect)
    }

    /// The log level; runner debug logging turns on `debug`.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.log_level.clone().unwrap_or_else(LogLevel::detect)
    }
}

/// Trimmed, defaulted inputs for one run.
#[derive(Debug, Clone)]
pub struct SetupInputs {
    /// Explicit version; empty when unspecified.
    pub version: String,
    /// Version file path; empty when unspecified.
    pub go_version_file: String,
    /// Registry host for login.
    pub buf_domain: String,
    /// GitHub API token.
    pub github_token: Option<Token>,
    /// Registry username.
    pub buf_user: Option<String>,
    /// Registry API token.
    pub buf_api_token: Option<Token>,
    /// Tool cache root.
    pub tool_cache: PathBuf,
    /// PATH file for later workflow steps.
    pub github_path: Option<PathBuf>,
    /// GitHub API endpoint.
    pub api_url: String,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Report a failed run exactly once.
///
/// Under GitHub Actions this is an `::error::` workflow command on stdout,
/// which marks the step failed with the message; elsewhere a miette report on
/// stderr.
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: Error, format: &TracingFormat) {
    match format {
        TracingFormat::Actions => {
            println!("::error::{}", escape_data(&err.to_string()));
            let _ = io::stdout().flush();
        }
        TracingFormat::Pretty | TracingFormat::Compact | TracingFormat::Json => {
            let report = Report::new(err);
            eprintln!("{report:?}");
            let _ = io::stderr().flush();
        }
    }
}

static RUN_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

/// Marks the stretch of `main` where a panic is turned into a reported error.
///
/// While a scope is alive the panic hook stays quiet, since the run reports
/// the panic itself as an `Internal` error.
#[derive(Debug)]
pub struct RunScope(());

impl RunScope {
    /// Enter the scope until the returned value is dropped.
    #[must_use]
    pub fn enter() -> Self {
        RUN_IN_PROGRESS.store(true, Ordering::SeqCst);
        Self(())
    }
}

impl Drop for RunScope {
    fn drop(&mut self) {
        RUN_IN_PROGRESS.store(false, Ordering::SeqCst);
    }
}

/// Install the process panic hook.
///
/// A panic inside a [`RunScope`] only leaves a debug trace. Before or after
/// the run nothing else reports it, so the hook prints the failure message.
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let in_run = RUN_IN_PROGRESS.load(Ordering::SeqCst);
        let format = TracingFormat::detect();
        match panic_report(in_run, &format, &panic_info.to_string()) {
            Some(report) if format == TracingFormat::Actions => {
                println!("{report}");
                let _ = io::stdout().flush();
            }
            Some(report) => {
                eprintln!("{report}");
                let _ = io::stderr().flush();
            }
            None => tracing::debug!("panicked: {panic_info}"),
        }
    }));
}

fn panic_report(in_run: bool, format: &TracingFormat, panic_info: &str) -> Option<String> {
    if in_run {
        return None;
    }
    let message = format!(
        "buf-setup panicked: {panic_info}. Run with RUST_LOG=debug for more information."
    );
    Some(match format {
        TracingFormat::Actions => format!("::error::{}", escape_data(&message)),
        TracingFormat::Pretty | TracingFormat::Compact | TracingFormat::Json => message,
    })
}
