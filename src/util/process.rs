//! Subprocess execution utilities.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{Context, Result};

use crate::core::errors::PreconditionError;

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Get the working directory.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute with captured stdout/stderr and wait for completion.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to run `{}`", self.display_command()))
    }

    /// Execute with inherited stdio and return the exit status.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command();
        cmd.status()
            .with_context(|| format!("failed to execute `{}`", self.display_command()))
    }

    /// Display the command for logs and error messages.
    ///
    /// Non-UTF-8 arguments are shown lossily; the command itself receives
    /// them unchanged.
    pub fn display_command(&self) -> String {
        let mut parts = vec![shell_quote(&self.program.display().to_string())];
        parts.extend(self.args.iter().map(|a| shell_quote(&a.to_string_lossy())));
        parts.join(" ")
    }
}

/// Collaborator that runs external commands.
///
/// Every blocking child process of the pipeline goes through this trait so
/// tests can observe the exact command and working directory. The child
/// inherits the environment of this process.
pub trait Runner {
    /// Run with inherited stdio and wait for completion.
    fn run(&self, cmd: &ProcessBuilder) -> Result<ExitStatus>;

    /// Run with captured output and wait for completion.
    fn capture(&self, cmd: &ProcessBuilder) -> Result<Output>;
}

/// Runs commands on the real system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ExitStatus> {
        tracing::debug!("running: {}", cmd.display_command());
        cmd.status()
    }

    fn capture(&self, cmd: &ProcessBuilder) -> Result<Output> {
        tracing::debug!("running: {}", cmd.display_command());
        cmd.exec()
    }
}

/// Find an executable in PATH or fail with a precondition error.
pub fn require_executable(name: &str) -> Result<PathBuf, PreconditionError> {
    which::which(name).map_err(|_| PreconditionError::MissingTool {
        tool: name.to_string(),
    })
}

/// Quote a word for a POSIX shell, leaving plain words untouched.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',' | '+' | '@' | '%')
        });
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("cmake").args(["-G", "Ninja", "-DANDROID_ABI=armeabi-v7a with NEON"]);

        assert_eq!(
            pb.display_command(),
            "cmake -G Ninja '-DANDROID_ABI=armeabi-v7a with NEON'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_args_pass_through() {
        use std::os::unix::ffi::OsStrExt;

        let dir = OsStr::from_bytes(b"/src/repo\xff");
        let pb = ProcessBuilder::new("cmake").arg("-S").arg(dir);

        assert_eq!(pb.get_args()[1].as_bytes(), b"/src/repo\xff");
        assert_eq!(pb.display_command(), "cmake -S '/src/repo\u{FFFD}'");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/opt/ndk"), "/opt/ndk");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("-g -m32"), "'-g -m32'");
    }
}
