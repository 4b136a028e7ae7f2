//! Shared test utilities for buf-setup tests.
//!
//! [`MemoryEnvironment`] stands in for the host execution environment: PATH
//! entries are kept in memory, binary lookup checks the real filesystem under
//! those entries, and commands are recorded instead of spawned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{CommandOutput, ExecutionEnvironment, Result};

/// A recorded command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program that would have been run.
    pub program: PathBuf,
    /// Arguments passed.
    pub args: Vec<String>,
    /// Data written to stdin.
    pub stdin: Option<String>,
}

/// In-memory execution environment.
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    paths: Vec<PathBuf>,
    responses: HashMap<String, CommandOutput>,
    invocations: Mutex<Vec<Invocation>>,
}

impl MemoryEnvironment {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands whose first argument is `first_arg` with `output`.
    ///
    /// Unmatched commands succeed with empty output.
    #[must_use]
    pub fn respond(mut self, first_arg: &str, output: CommandOutput) -> Self {
        self.responses.insert(first_arg.to_string(), output);
        self
    }

    /// Directories added so far, most recent first.
    #[must_use]
    pub fn added_paths(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }

    /// Commands run so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ExecutionEnvironment for MemoryEnvironment {
    fn add_path(&mut self, dir: &Path) -> Result<()> {
        self.paths.insert(0, dir.to_path_buf());
        Ok(())
    }

    fn which(&self, binary: &str) -> Option<PathBuf> {
        self.paths.iter().find_map(|dir| {
            [binary.to_string(), format!("{binary}.exe")]
                .into_iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    fn run(&self, program: &Path, args: &[&str], stdin: Option<&str>) -> Result<CommandOutput> {
        if let Ok(mut guard) = self.invocations.lock() {
            guard.push(Invocation {
                program: program.to_path_buf(),
                args: args.iter().map(|a| (*a).to_string()).collect(),
                stdin: stdin.map(String::from),
            });
        }
        Ok(args
            .first()
            .and_then(|first| self.responses.get(*first))
            .cloned()
            .unwrap_or_else(|| CommandOutput::success("")))
    }
}
