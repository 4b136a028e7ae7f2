// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! Core types and utilities for buf-setup.
//!
//! This crate holds everything that does not talk to the release registry:
//!
//! - [`Error`] - the single error type used across the workspace
//! - [`Platform`], [`Os`], [`Arch`] - host platform identification
//! - [`VersionResolver`] - picks the version from explicit input or a version file
//! - [`ToolCache`] - the on-disk cache keyed by tool, version and architecture
//! - [`ExecutionEnvironment`] - PATH, binary lookup and process execution
//! - [`Installer`] - publishes a cached artifact and verifies the binary

pub mod environment;
pub mod error;
pub mod install;
pub mod platform;
pub mod secret;
pub mod tool_cache;
pub mod version;

/// In-memory stand-ins for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use environment::{CommandOutput, ExecutionEnvironment, HostEnvironment};
pub use error::{Error, Result};
pub use install::{Installer, PublishedBinary};
pub use platform::{Arch, Os, Platform, host_names};
pub use secret::Token;
pub use tool_cache::{ToolCache, default_cache_dir};
pub use version::{
    LATEST, ResolvedVersion, TOOL_MODULE_PATH, VersionFileFormat, VersionResolver, VersionSource,
    release_tag, tag_matches_version, trim_version_prefix,
};

/// Name of the tool this workspace installs.
pub const TOOL_NAME: &str = "buf";
