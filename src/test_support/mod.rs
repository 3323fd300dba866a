//! Test utilities and mocks for cmake-one unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use cmake_one::test_support::{exit_status, RecordingRunner};
//!
//! let runner = RecordingRunner::new()
//!     .with_output("docker info", 0, "rootless\n")
//!     .with_status("docker run", exit_status(3));
//! ```

pub mod fixtures;

use std::cell::RefCell;
use std::process::{ExitStatus, Output};

use anyhow::Result;

use crate::util::process::{ProcessBuilder, Runner};

// Re-export fixtures for convenience
pub use fixtures::*;

/// An `ExitStatus` carrying `code`.
pub fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code as u32)
    }
}

/// A [`Runner`] that records every command and never spawns anything.
///
/// Responses are matched by prefix against the displayed command line, in
/// the order they were added. Unmatched commands succeed with no output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    statuses: Vec<(String, ExitStatus)>,
    outputs: Vec<(String, Output)>,
    calls: RefCell<Vec<ProcessBuilder>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status returned by [`Runner::run`] for commands starting with `prefix`.
    pub fn with_status(mut self, prefix: &str, status: ExitStatus) -> Self {
        self.statuses.push((prefix.to_string(), status));
        self
    }

    /// Output returned by [`Runner::capture`] for commands starting with `prefix`.
    pub fn with_output(mut self, prefix: &str, code: i32, stdout: &str) -> Self {
        self.outputs.push((
            prefix.to_string(),
            Output {
                status: exit_status(code),
                stdout: stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
            },
        ));
        self
    }

    /// Every command seen so far.
    pub fn calls(&self) -> Vec<ProcessBuilder> {
        self.calls.borrow().clone()
    }

    /// Every command seen so far, as displayed command lines.
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }

    fn record(&self, cmd: &ProcessBuilder) -> String {
        self.calls.borrow_mut().push(cmd.clone());
        cmd.display_command()
    }
}

impl Runner for RecordingRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ExitStatus> {
        let line = self.record(cmd);
        Ok(self
            .statuses
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, status)| *status)
            .unwrap_or_else(|| exit_status(0)))
    }

    fn capture(&self, cmd: &ProcessBuilder) -> Result<Output> {
        let line = self.record(cmd);
        Ok(self
            .outputs
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| Output {
                status: exit_status(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_match_by_prefix() {
        let runner = RecordingRunner::new()
            .with_status("docker run", exit_status(3))
            .with_output("docker info", 0, "rootless");
        let run = ProcessBuilder::new("docker").args(["run", "--rm"]);
        let build = ProcessBuilder::new("docker").args(["build", "."]);
        assert_eq!(runner.run(&run).unwrap().code(), Some(3));
        assert!(runner.run(&build).unwrap().success());

        let info = runner.capture(&ProcessBuilder::new("docker").arg("info")).unwrap();
        assert_eq!(info.stdout, b"rootless");
        assert_eq!(runner.commands(), ["docker run --rm", "docker build .", "docker info"]);
    }
}
