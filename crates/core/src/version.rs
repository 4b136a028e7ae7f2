//! Version resolution from explicit input or a version file.
//!
//! A build can declare the buf version once, in a `go.mod` it already uses to
//! pin `github.com/bufbuild/buf`, or in a plain text file holding just the
//! version. When such a file is configured it takes precedence over the
//! explicit `version` input.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Sentinel version meaning "the most recent release".
pub const LATEST: &str = "latest";

/// Module path whose `require` entry pins the buf version in a `go.mod`.
pub const TOOL_MODULE_PATH: &str = "github.com/bufbuild/buf";

/// Prefix used by release tags (`v1.2.3`), optional in user input.
const VERSION_PREFIX: &str = "v";

/// Base name that selects [`VersionFileFormat::GoModule`].
const GO_MODULE_FILE: &str = "go.mod";

/// Strip a single leading `v` from a version string.
#[must_use]
pub fn trim_version_prefix(version: &str) -> &str {
    version.strip_prefix(VERSION_PREFIX).unwrap_or(version)
}

/// Release tag to search for a user-supplied version.
///
/// Tags always carry the `v` prefix, so one is added unless already present.
#[must_use]
pub fn release_tag(version: &str) -> String {
    if version.starts_with(VERSION_PREFIX) {
        version.to_string()
    } else {
        format!("{VERSION_PREFIX}{version}")
    }
}

/// Whether a known release tag names the same version as user input.
///
/// Tags include the `v` prefix but `buf --version` does not print it, so both
/// `v0.38.0` and `0.38.0` are accepted on either side.
#[must_use]
pub fn tag_matches_version(tag: &str, version: &str) -> bool {
    trim_version_prefix(tag) == trim_version_prefix(version)
}

/// Where the resolved version came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    /// The `version` input.
    ExplicitInput,
    /// A version file at the given path.
    VersionFile(PathBuf),
}

/// How a version file is parsed, chosen by its base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFileFormat {
    /// A Go module file; the version comes from the tool's `require` entry.
    GoModule,
    /// Any other file; the trimmed contents are the version.
    PlainText,
}

impl VersionFileFormat {
    /// Select the format for a path. Only the base name is considered.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        match path.file_name().and_then(|name| name.to_str()) {
            Some(GO_MODULE_FILE) => Self::GoModule,
            _ => Self::PlainText,
        }
    }

    /// Extract the version from file contents.
    ///
    /// Returns an empty string when a `go.mod` has no entry for `module_path`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the module pattern cannot be compiled.
    pub fn extract(self, contents: &str, module_path: &str) -> Result<String> {
        match self {
            Self::PlainText => Ok(contents.trim().to_string()),
            Self::GoModule => {
                let pattern = format!(
                    r"(?m)^[ \t]*(?:require[ \t]+)?{}[ \t]+(v\d+(?:\.\d+)*(?:-[0-9A-Za-z.\-]+)?)",
                    regex::escape(module_path)
                );
                let re = Regex::new(&pattern).map_err(|e| {
                    Error::internal(format!("Invalid module pattern for {module_path}: {e}"))
                })?;
                Ok(re
                    .captures(contents)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default())
            }
        }
    }
}

/// The outcome of version resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// The version string, possibly empty when nothing was supplied.
    pub version: String,
    /// Where `version` came from.
    pub source: VersionSource,
}

impl ResolvedVersion {
    /// Whether no version was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.version.is_empty()
    }
}

/// Picks the version to install from the `version` and `go_version_file` inputs.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    module_path: String,
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionResolver {
    /// Create a resolver for the buf module.
    #[must_use]
    pub fn new() -> Self {
        Self::for_module(TOOL_MODULE_PATH)
    }

    /// Create a resolver that reads a different module's `require` entry.
    #[must_use]
    pub fn for_module(module_path: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
        }
    }

    /// Resolve the version from the explicit input and an optional file path.
    ///
    /// An empty `version_file` returns `explicit` unchanged, which may itself be
    /// empty. A file that yields no version falls back to `explicit`.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if `version_file` is set but does not exist; there
    /// is no fallback to `explicit` in that case.
    pub fn resolve(&self, explicit: &str, version_file: &str) -> Result<ResolvedVersion> {
        if version_file.is_empty() {
            return Ok(ResolvedVersion {
                version: explicit.to_string(),
                source: VersionSource::ExplicitInput,
            });
        }

        if !explicit.is_empty() {
            warn!(
                "Both version and go_version_file inputs are specified, go_version_file will be preferred"
            );
        }

        let path = PathBuf::from(version_file);
        let version = self.read_version_file(&path)?;
        if version.is_empty() {
            debug!(path = %path.display(), "No version found in version file");
            return Ok(ResolvedVersion {
                version: explicit.to_string(),
                source: VersionSource::ExplicitInput,
            });
        }

        debug!(path = %path.display(), %version, "Resolved version from file");
        Ok(ResolvedVersion {
            version,
            source: VersionSource::VersionFile(path),
        })
    }

    fn read_version_file(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path), "read version file"))?;
        VersionFileFormat::for_path(path).extract(&contents, &self.module_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GO_MOD: &str = "module example.com/mymodule

go 1.14

require (
    example.com/othermodule v1.2.3
    example.com/thismodule v1.2.3
    github.com/bufbuild/buf v1.26.1
)

replace example.com/thatmodule => ../thatmodule
exclude example.com/thismodule v1.3.0
";

    fn write(dir: &TempDir, name: &str, contents: &str) -> String {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_trim_version_prefix() {
        assert_eq!(trim_version_prefix("v1.2.3"), "1.2.3");
        assert_eq!(trim_version_prefix("1.2.3"), "1.2.3");
        assert_eq!(trim_version_prefix("vv1"), "v1");
        assert_eq!(trim_version_prefix(""), "");
    }

    #[test]
    fn test_release_tag_adds_prefix_once() {
        assert_eq!(release_tag("1.26.0"), "v1.26.0");
        assert_eq!(release_tag("v1.26.0"), "v1.26.0");
    }

    #[test]
    fn test_tag_matches_version_either_prefix() {
        assert!(tag_matches_version("v0.38.0", "0.38.0"));
        assert!(tag_matches_version("v0.38.0", "v0.38.0"));
        assert!(tag_matches_version("0.38.0", "v0.38.0"));
        assert!(!tag_matches_version("v0.38.0", "0.38.1"));
        assert!(!tag_matches_version("v0.38.0", "0.38"));
    }

    #[test]
    fn test_format_for_path_uses_base_name() {
        assert_eq!(
            VersionFileFormat::for_path(Path::new("go.mod")),
            VersionFileFormat::GoModule
        );
        assert_eq!(
            VersionFileFormat::for_path(Path::new("otherDir/go.mod")),
            VersionFileFormat::GoModule
        );
        assert_eq!(
            VersionFileFormat::for_path(Path::new("go.mod/buf.version")),
            VersionFileFormat::PlainText
        );
        assert_eq!(
            VersionFileFormat::for_path(Path::new("go.mod.bak")),
            VersionFileFormat::PlainText
        );
    }

    #[test]
    fn test_go_module_extracts_require_block_entry() {
        let version = VersionFileFormat::GoModule
            .extract(GO_MOD, TOOL_MODULE_PATH)
            .unwrap();
        assert_eq!(version, "v1.26.1");
    }

    #[test]
    fn test_go_module_single_line_require() {
        let contents = "module example.com/m\n\nrequire github.com/bufbuild/buf v1.30.0 // indirect\n";
        let version = VersionFileFormat::GoModule
            .extract(contents, TOOL_MODULE_PATH)
            .unwrap();
        assert_eq!(version, "v1.30.0");
    }

    #[test]
    fn test_go_module_ignores_submodules_and_directives() {
        let contents = "module example.com/m

require (
    github.com/bufbuild/buf/private v1.0.0
)

exclude github.com/bufbuild/buf v1.3.0
replace github.com/bufbuild/buf => ../buf
";
        let version = VersionFileFormat::GoModule
            .extract(contents, TOOL_MODULE_PATH)
            .unwrap();
        assert_eq!(version, "");
    }

    #[test]
    fn test_go_module_prerelease_version() {
        let contents = "require (\n\tgithub.com/bufbuild/buf v1.0.0-rc12\n)\n";
        let version = VersionFileFormat::GoModule
            .extract(contents, TOOL_MODULE_PATH)
            .unwrap();
        assert_eq!(version, "v1.0.0-rc12");
    }

    #[test]
    fn test_plain_text_trims() {
        let version = VersionFileFormat::PlainText
            .extract("  v1.26.3\n\n", TOOL_MODULE_PATH)
            .unwrap();
        assert_eq!(version, "v1.26.3");
    }

    #[test]
    fn test_resolve_without_file_returns_explicit() {
        let resolver = VersionResolver::new();
        let resolved = resolver.resolve("1.26.0", "").unwrap();
        assert_eq!(resolved.version, "1.26.0");
        assert_eq!(resolved.source, VersionSource::ExplicitInput);
    }

    #[test]
    fn test_resolve_both_empty_returns_empty() {
        let resolved = VersionResolver::new().resolve("", "").unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = VersionResolver::new();
        let first = resolver.resolve("v1.2.3", "").unwrap();
        let second = resolver.resolve("v1.2.3", "").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_go_mod_wins_over_explicit() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "go.mod", GO_MOD);

        let resolved = VersionResolver::new().resolve("1.26.0", &path).unwrap();
        assert_eq!(resolved.version, "v1.26.1");
        assert_eq!(resolved.source, VersionSource::VersionFile(PathBuf::from(&path)));
    }

    #[test]
    fn test_resolve_nested_go_mod() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "otherDir/go.mod",
            &GO_MOD.replace("v1.26.1", "v1.26.2"),
        );

        let resolved = VersionResolver::new().resolve("1.26.0", &path).unwrap();
        assert_eq!(resolved.version, "v1.26.2");
    }

    #[test]
    fn test_resolve_plain_file_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "buf.version", "v1.26.3\n");

        let resolved = VersionResolver::new().resolve("1.26.0", &path).unwrap();
        assert_eq!(resolved.version, "v1.26.3");
    }

    #[test]
    fn test_resolve_missing_file_does_not_fall_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("go.mod");

        let err = VersionResolver::new()
            .resolve("1.26.0", &path.to_string_lossy())
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { path: ref p } if *p == path));
    }

    #[test]
    fn test_resolve_go_mod_without_entry_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "go.mod", "module example.com/m\n\ngo 1.21\n");

        let resolved = VersionResolver::new().resolve("1.26.0", &path).unwrap();
        assert_eq!(resolved.version, "1.26.0");
        assert_eq!(resolved.source, VersionSource::ExplicitInput);
    }

    #[test]
    fn test_resolver_for_other_module() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "go.mod", GO_MOD);

        let resolved = VersionResolver::for_module("example.com/othermodule")
            .resolve("", &path)
            .unwrap();
        assert_eq!(resolved.version, "v1.2.3");
    }
}
