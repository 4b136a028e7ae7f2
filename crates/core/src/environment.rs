//! The execution environment buf is published into.
//!
//! PATH changes and process execution go through [`ExecutionEnvironment`] so
//! the install flow never mutates global process state directly. The host
//! implementation keeps its own search path and hands it to child processes;
//! tests substitute an in-memory environment.

use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::{Error, Result};

/// Captured result of running a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run that printed `stdout`.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given exit code and stderr.
    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Side-effecting operations the installer needs from its surroundings.
pub trait ExecutionEnvironment {
    /// Prepend `dir` to the execution path.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be recorded.
    fn add_path(&mut self, dir: &Path) -> Result<()>;

    /// Locate `binary` on the execution path.
    fn which(&self, binary: &str) -> Option<PathBuf>;

    /// Run `program` with `args`, writing `stdin` to its standard input if given.
    ///
    /// A non-zero exit is reported through [`CommandOutput::success`], not as
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn run(&self, program: &Path, args: &[&str], stdin: Option<&str>) -> Result<CommandOutput>;
}

/// The real host: search path seeded from `PATH`, commands spawned as children.
///
/// When a path file is configured (GitHub Actions' `GITHUB_PATH`), every added
/// directory is also appended to it so later workflow steps inherit it.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    search_path: Vec<PathBuf>,
    path_file: Option<PathBuf>,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEnvironment {
    /// Create an environment seeded from the current process `PATH`.
    #[must_use]
    pub fn new() -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();
        Self::with_search_path(search_path)
    }

    /// Create an environment with an explicit search path.
    #[must_use]
    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self {
            search_path,
            path_file: None,
        }
    }

    /// Also append added directories to `path_file`.
    #[must_use]
    pub fn with_path_file(mut self, path_file: impl Into<PathBuf>) -> Self {
        self.path_file = Some(path_file.into());
        self
    }

    /// Get the current search path, most recently added first.
    #[must_use]
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    fn joined_path(&self) -> Result<OsString> {
        std::env::join_paths(&self.search_path)
            .map_err(|e| Error::internal(format!("Invalid PATH entry: {e}")))
    }

    fn append_to_path_file(path_file: &Path, dir: &Path) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path_file)
            .map_err(|e| Error::io(e, Some(path_file), "open"))?;
        writeln!(file, "{}", dir.display()).map_err(|e| Error::io(e, Some(path_file), "write"))
    }
}

impl ExecutionEnvironment for HostEnvironment {
    fn add_path(&mut self, dir: &Path) -> Result<()> {
        if let Some(path_file) = &self.path_file {
            Self::append_to_path_file(path_file, dir)?;
            debug!(path_file = %path_file.display(), dir = %dir.display(), "Recorded PATH entry");
        }
        self.search_path.retain(|existing| existing != dir);
        self.search_path.insert(0, dir.to_path_buf());
        info!("Added {} to PATH", dir.display());
        Ok(())
    }

    fn which(&self, binary: &str) -> Option<PathBuf> {
        let paths = self.joined_path().ok()?;
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(binary, Some(paths), cwd).ok()
    }

    fn run(&self, program: &Path, args: &[&str], stdin: Option<&str>) -> Result<CommandOutput> {
        debug!(program = %program.display(), ?args, "Running command");
        let mut child = Command::new(program)
            .args(args)
            .env("PATH", self.joined_path()?)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::io(e, Some(program), "spawn"))?;

        // The pipe is closed at the end of this block so the child sees EOF.
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            match pipe.write_all(input.as_bytes()) {
                Ok(()) => {}
                // The child exited without reading everything; its status
                // and output still say what happened.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(program = %program.display(), "Command closed stdin early");
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::io(e, Some(program), "write stdin"));
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::io(e, Some(program), "wait"))?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
