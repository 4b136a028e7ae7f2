//! Host platform identification.
//!
//! Release assets are published per `(Os, Arch)` pair. Both sets are closed:
//! a host outside them is an error, never a fallback to some default.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Platform identifier combining OS and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform of the running host.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchitecture` or `UnsupportedPlatform` when the host
    /// has no published release.
    pub fn current() -> Result<Self> {
        let (os, arch) = host_names();
        Self::parse(os, arch)
    }

    /// Map raw host names to a platform.
    ///
    /// The architecture is checked first, so a host where both are unknown
    /// reports the architecture.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchitecture` or `UnsupportedPlatform`.
    pub fn parse(os: &str, arch: &str) -> Result<Self> {
        let arch = Arch::parse(arch)?;
        let os = Os::parse(os)?;
        Ok(Self { os, arch })
    }

    /// File name of the release asset for this platform.
    ///
    /// Windows releases ship a bare executable; every other platform ships a
    /// gzipped tarball.
    #[must_use]
    pub fn asset_name(&self, tool: &str) -> String {
        match self.os {
            Os::Windows => format!("{tool}-{}-{}.exe", self.os, self.arch),
            Os::Darwin | Os::Linux => format!("{tool}-{}-{}.tar.gz", self.os, self.arch),
        }
    }

    /// File name of the executable on this platform.
    #[must_use]
    pub fn binary_name(&self, tool: &str) -> String {
        match self.os {
            Os::Windows => format!("{tool}.exe"),
            Os::Darwin | Os::Linux => tool.to_string(),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Os {
    /// Linux
    Linux,
    /// macOS
    Darwin,
    /// Windows
    Windows,
}

impl Os {
    /// Parse a host platform name: `linux`, `darwin` or `win32`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` for anything else.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "linux" => Ok(Self::Linux),
            "darwin" => Ok(Self::Darwin),
            "win32" => Ok(Self::Windows),
            other => Err(Error::unsupported_platform(other)),
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "Linux"),
            Self::Darwin => write!(f, "Darwin"),
            Self::Windows => write!(f, "Windows"),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    /// 64-bit x86
    X86_64,
    /// 64-bit ARM
    Arm64,
}

impl Arch {
    /// Parse a host architecture name: `x64` or `arm64`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchitecture` for anything else.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "x64" => Ok(Self::X86_64),
            "arm64" => Ok(Self::Arm64),
            other => Err(Error::unsupported_architecture(other)),
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X86_64 => write!(f, "x86_64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Names of the running host in the vocabulary [`Platform::parse`] accepts.
///
/// Rust's `std::env::consts` values are translated (`macos` to `darwin`,
/// `windows` to `win32`, `x86_64` to `x64`, `aarch64` to `arm64`); anything
/// else passes through unchanged and is rejected by the parser.
#[must_use]
pub fn host_names() -> (&'static str, &'static str) {
    (
        runner_os_name(std::env::consts::OS),
        runner_arch_name(std::env::consts::ARCH),
    )
}

fn runner_os_name(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn runner_arch_name(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse_runner_names() {
        let p = Platform::parse("linux", "x64").unwrap();
        assert_eq!(p, Platform::new(Os::Linux, Arch::X86_64));

        let p = Platform::parse("darwin", "arm64").unwrap();
        assert_eq!(p, Platform::new(Os::Darwin, Arch::Arm64));

        let p = Platform::parse("win32", "x64").unwrap();
        assert_eq!(p, Platform::new(Os::Windows, Arch::X86_64));
    }

    #[test]
    fn test_rust_host_names_are_not_parsed() {
        assert!(matches!(
            Platform::parse("macos", "arm64").unwrap_err(),
            Error::UnsupportedPlatform { .. }
        ));
        assert!(matches!(
            Platform::parse("windows", "x64").unwrap_err(),
            Error::UnsupportedPlatform { .. }
        ));
        assert!(matches!(
            Platform::parse("linux", "x86_64").unwrap_err(),
            Error::UnsupportedArchitecture { .. }
        ));
        assert!(matches!(
            Platform::parse("darwin", "aarch64").unwrap_err(),
            Error::UnsupportedArchitecture { .. }
        ));
    }

    #[test]
    fn test_host_names_translate_rust_consts() {
        assert_eq!(runner_os_name("macos"), "darwin");
        assert_eq!(runner_os_name("windows"), "win32");
        assert_eq!(runner_os_name("linux"), "linux");
        assert_eq!(runner_os_name("freebsd"), "freebsd");
        assert_eq!(runner_arch_name("x86_64"), "x64");
        assert_eq!(runner_arch_name("aarch64"), "arm64");
        assert_eq!(runner_arch_name("riscv64"), "riscv64");

        let (os, arch) = host_names();
        if let Ok(platform) = Platform::parse(os, arch) {
            assert_eq!(Platform::current().unwrap(), platform);
        }
    }

    #[test]
    fn test_unsupported_arch() {
        let err = Platform::parse("linux", "ia32").unwrap_err();
        assert!(matches!(err, Error::UnsupportedArchitecture { ref arch } if arch == "ia32"));
    }

    #[test]
    fn test_unsupported_os() {
        let err = Platform::parse("freebsd", "x64").unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform { ref platform } if platform == "freebsd"));
    }

    #[test]
    fn test_arch_checked_before_os() {
        let err = Platform::parse("aix", "ppc64").unwrap_err();
        assert!(matches!(err, Error::UnsupportedArchitecture { .. }));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!(Os::parse("Linux").is_err());
        assert!(Arch::parse("X64").is_err());
    }

    #[test]
    fn test_asset_names() {
        assert_eq!(
            Platform::new(Os::Linux, Arch::X86_64).asset_name("buf"),
            "buf-Linux-x86_64.tar.gz"
        );
        assert_eq!(
            Platform::new(Os::Darwin, Arch::Arm64).asset_name("buf"),
            "buf-Darwin-arm64.tar.gz"
        );
        assert_eq!(
            Platform::new(Os::Windows, Arch::Arm64).asset_name("buf"),
            "buf-Windows-arm64.exe"
        );
    }

    #[test]
    fn test_binary_names() {
        assert_eq!(Platform::new(Os::Linux, Arch::Arm64).binary_name("buf"), "buf");
        assert_eq!(
            Platform::new(Os::Windows, Arch::X86_64).binary_name("buf"),
            "buf.exe"
        );
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(
            Platform::new(Os::Darwin, Arch::X86_64).to_string(),
            "Darwin-x86_64"
        );
    }

    #[test]
    fn test_platform_serialization() {
        let json = serde_json::to_string(&Platform::new(Os::Linux, Arch::Arm64)).unwrap();
        assert_eq!(json, r#"{"os":"Linux","arch":"Arm64"}"#);
    }
}
