//! Error types for buf-setup operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buf-setup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, fetching or installing buf.
///
/// Every step of a run returns one of these; the runner reports exactly one
/// of them per invocation.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// No version could be resolved from the inputs.
    #[error("{message}")]
    #[diagnostic(
        code(buf_setup::input_missing),
        help("Set the `version` input, or point `go_version_file` at a file that declares one")
    )]
    InputMissing {
        /// The error message
        message: String,
    },

    /// A declared version file does not exist.
    #[error("The specified go version file: \"{}\" does not exist", path.display())]
    #[diagnostic(code(buf_setup::file_not_found))]
    FileNotFound {
        /// The path that was declared
        path: PathBuf,
    },

    /// The host operating system has no published buf release.
    #[error("The \"{platform}\" platform is not supported with a Buf release.")]
    #[diagnostic(code(buf_setup::unsupported_platform))]
    UnsupportedPlatform {
        /// The platform name as reported by the host
        platform: String,
    },

    /// The host CPU architecture has no published buf release.
    #[error("The \"{arch}\" architecture is not supported with a Buf release.")]
    #[diagnostic(code(buf_setup::unsupported_architecture))]
    UnsupportedArchitecture {
        /// The architecture name as reported by the host
        arch: String,
    },

    /// No release asset matched the requested version and platform.
    #[error(
        "Unable to find Buf version \"{version}\" for platform \"{platform}\" and architecture \"{arch}\"."
    )]
    #[diagnostic(
        code(buf_setup::asset_not_found),
        help("Check that the version exists at https://github.com/bufbuild/buf/releases")
    )]
    AssetNotFound {
        /// The requested version
        version: String,
        /// The release platform name (e.g. `Linux`)
        platform: String,
        /// The release architecture name (e.g. `x86_64`)
        arch: String,
    },

    /// The installed binary could not be located on the execution path.
    #[error("{binary} was not found on PATH")]
    #[diagnostic(code(buf_setup::binary_not_found))]
    BinaryNotFound {
        /// The binary name that was looked up
        binary: String,
    },

    /// The release API or asset download failed.
    #[error("Release query failed: {message}")]
    #[diagnostic(
        code(buf_setup::release_query),
        help("Supply `github_token` if the GitHub API is rate limiting requests")
    )]
    ReleaseQuery {
        /// The error message
        message: String,
    },

    /// A downloaded archive could not be unpacked.
    #[error("Failed to extract {asset}: {message}")]
    #[diagnostic(code(buf_setup::extract))]
    Extract {
        /// The asset being extracted
        asset: String,
        /// The error message
        message: String,
    },

    /// A spawned command did not succeed.
    #[error("`{command}` failed: {message}")]
    #[diagnostic(code(buf_setup::command_failed))]
    CommandFailed {
        /// The command line, without secrets
        command: String,
        /// The error message (usually stderr)
        message: String,
    },

    /// I/O failure with the operation and path that caused it.
    #[error("I/O {operation} failed{}: {source}", path.as_ref().map(|p| format!(" on {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(buf_setup::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying source error
        #[source]
        source: std::io::Error,
        /// The path involved, if any
        path: Option<PathBuf>,
        /// What was being attempted
        operation: String,
    },

    /// Anything not covered above, including caught panics.
    #[error("{message}")]
    #[diagnostic(code(buf_setup::internal))]
    Internal {
        /// The error message
        message: String,
    },
}

impl Error {
    /// Create an input-missing error.
    #[must_use]
    pub fn input_missing(message: impl Into<String>) -> Self {
        Self::InputMissing {
            message: message.into(),
        }
    }

    /// Create a file-not-found error.
    #[must_use]
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create an unsupported platform error.
    #[must_use]
    pub fn unsupported_platform(platform: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            platform: platform.into(),
        }
    }

    /// Create an unsupported architecture error.
    #[must_use]
    pub fn unsupported_architecture(arch: impl Into<String>) -> Self {
        Self::UnsupportedArchitecture { arch: arch.into() }
    }

    /// Create an asset-not-found error.
    #[must_use]
    pub fn asset_not_found(
        version: impl Into<String>,
        platform: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self::AssetNotFound {
            version: version.into(),
            platform: platform.into(),
            arch: arch.into(),
        }
    }

    /// Create a binary-not-found error.
    #[must_use]
    pub fn binary_not_found(binary: impl Into<String>) -> Self {
        Self::BinaryNotFound {
            binary: binary.into(),
        }
    }

    /// Create a release query error.
    #[must_use]
    pub fn release_query(message: impl Into<String>) -> Self {
        Self::ReleaseQuery {
            message: message.into(),
        }
    }

    /// Create an extraction error.
    #[must_use]
    pub fn extract(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extract {
            asset: asset.into(),
            message: message.into(),
        }
    }

    /// Create a command failure error.
    #[must_use]
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: Option<impl Into<PathBuf>>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: path.map(Into::into),
            operation: operation.into(),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "operation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_message() {
        let err = Error::file_not_found("go.mod");
        assert_eq!(
            err.to_string(),
            "The specified go version file: \"go.mod\" does not exist"
        );
    }

    #[test]
    fn test_asset_not_found_carries_context() {
        let err = Error::asset_not_found("1.2.3", "Linux", "x86_64");
        let message = err.to_string();
        assert!(message.contains("\"1.2.3\""));
        assert!(message.contains("\"Linux\""));
        assert!(message.contains("\"x86_64\""));
    }

    #[test]
    fn test_unsupported_messages() {
        assert_eq!(
            Error::unsupported_architecture("ia32").to_string(),
            "The \"ia32\" architecture is not supported with a Buf release."
        );
        assert_eq!(
            Error::unsupported_platform("aix").to_string(),
            "The \"aix\" platform is not supported with a Buf release."
        );
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = Error::io(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            Some("/tmp/cache"),
            "write",
        );
        assert_eq!(err.to_string(), "I/O write failed on /tmp/cache: denied");

        let err = Error::io(
            std::io::Error::other("boom"),
            None::<PathBuf>,
            "read",
        );
        assert_eq!(err.to_string(), "I/O read failed: boom");
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = Error::binary_not_found("buf");
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("buf_setup::binary_not_found".to_string())
        );
        assert_eq!(err.to_string(), "buf was not found on PATH");
    }
}
