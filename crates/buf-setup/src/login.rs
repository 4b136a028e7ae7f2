//! Logging in to the Buf Schema Registry with the installed binary.

use std::path::Path;

use buf_setup_core::{Error, ExecutionEnvironment, Result, Token};
use tracing::{info, warn};

/// Credentials for `buf registry login`.
#[derive(Debug, Clone)]
pub struct RegistryCredentials {
    /// Registry host.
    pub domain: String,
    /// Registry username.
    pub username: String,
    /// Registry API token.
    pub token: Token,
}

impl RegistryCredentials {
    /// Pair up the user and token inputs.
    ///
    /// Login only happens when both are present. If exactly one is set a
    /// warning is logged and `None` returned.
    #[must_use]
    pub fn from_inputs(
        domain: &str,
        username: Option<&str>,
        token: Option<&Token>,
    ) -> Option<Self> {
        match (username, token) {
            (Some(username), Some(token)) => Some(Self {
                domain: domain.to_string(),
                username: username.to_string(),
                token: token.clone(),
            }),
            (Some(_), None) => {
                warn!("buf_user is set but buf_api_token is not, skipping registry login");
                None
            }
            (None, Some(_)) => {
                warn!("buf_api_token is set but buf_user is not, skipping registry login");
                None
            }
            (None, None) => None,
        }
    }
}

/// Run `buf registry login` with the token on stdin.
///
/// # Errors
///
/// Returns `CommandFailed` if the command exits unsuccessfully, or the
/// environment's error if it cannot be spawned.
pub fn login(
    env: &dyn ExecutionEnvironment,
    binary: &Path,
    credentials: &RegistryCredentials,
) -> Result<()> {
    info!(
        domain = %credentials.domain,
        username = %credentials.username,
        "Logging in to the Buf Schema Registry"
    );
    let args = [
        "registry",
        "login",
        credentials.domain.as_str(),
        "--username",
        credentials.username.as_str(),
        "--token-stdin",
    ];
    let output = env.run(binary, &args, Some(credentials.token.expose()))?;
    if !output.success {
        let message = if output.stderr.trim().is_empty() {
            format!("exited with code {:?}", output.code)
        } else {
            output.stderr.trim().to_string()
        };
        return Err(Error::command_failed("buf registry login", message));
    }

    info!(domain = %credentials.domain, "Logged in to the Buf Schema Registry");
    Ok(())
}
