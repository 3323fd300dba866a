//! Error taxonomy.
//!
//! Nothing here is ever downgraded to a warning: configuration and
//! precondition errors are raised before any external process starts, and
//! execution errors carry the exit status of the child that failed.

use std::path::PathBuf;
use std::process::ExitStatus;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::platform::{HostOs, Platform, Sanitizer};
use crate::util::diagnostic::{suggestions, Diagnostic};

/// The requested configuration cannot be built.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigError {
    #[error("platform `{platform}` cannot be built on a {host} host")]
    #[diagnostic(code(cmake_one::config::unsupported_platform))]
    UnsupportedPlatform {
        platform: Platform,
        host: HostOs,
        supported: Vec<HostOs>,
    },

    #[error("architecture `{arch}` is not supported for {platform}")]
    #[diagnostic(code(cmake_one::config::unsupported_arch))]
    UnsupportedArch {
        platform: Platform,
        arch: String,
        supported: Vec<String>,
    },

    #[error("{sanitizer} is not supported for {platform}-{arch}")]
    #[diagnostic(
        code(cmake_one::config::unsupported_sanitizer),
        help("hwasan needs an aarch64 target; use asan instead")
    )]
    UnsupportedSanitizer {
        sanitizer: Sanitizer,
        platform: Platform,
        arch: String,
    },

    #[error("32-bit builds are only available for host builds, not {platform}")]
    #[diagnostic(code(cmake_one::config::unsupported_32bit))]
    Unsupported32Bit { platform: Platform },

    #[error("toolchain file for {platform} not found: {}", .path.display())]
    #[diagnostic(code(cmake_one::config::missing_toolchain_file))]
    MissingToolchainFile { platform: Platform, path: PathBuf },

    #[error("environment bootstrap for {platform} not found: {}", .path.display())]
    #[diagnostic(code(cmake_one::config::missing_bootstrap))]
    MissingBootstrap { platform: Platform, path: PathBuf },

    #[error("repository directory is not a directory: {}", .path.display())]
    #[diagnostic(code(cmake_one::config::missing_repo_dir))]
    MissingRepoDir { path: PathBuf },

    #[error("no CMakeLists.txt in {}", .repo_dir.display())]
    #[diagnostic(
        code(cmake_one::config::missing_build_descriptor),
        help("point --repo_dir at the root of a CMake project")
    )]
    MissingBuildDescriptor { repo_dir: PathBuf },

    #[error("container image definition not found: {}", .path.display())]
    #[diagnostic(code(cmake_one::config::missing_dockerfile))]
    MissingDockerfile { path: PathBuf },

    #[error("path is not valid UTF-8: {}", .path.display())]
    #[diagnostic(
        code(cmake_one::config::non_utf8_path),
        help("the generated build script is text; rename the directory")
    )]
    NonUtf8Path { path: PathBuf },
}

/// A required piece of the environment is missing or malformed.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum PreconditionError {
    #[error("unsupported host operating system `{os}`")]
    #[diagnostic(
        code(cmake_one::precondition::unsupported_host),
        help("cmake-one runs on Linux, macOS and Windows")
    )]
    UnsupportedHost { os: String },

    #[error("environment variable `{var}` is not set (required for {platform})")]
    #[diagnostic(code(cmake_one::precondition::missing_env))]
    MissingEnvVar {
        var: &'static str,
        platform: Platform,
        hint: &'static str,
    },

    #[error("environment variable `{var}` is malformed: {reason}")]
    #[diagnostic(code(cmake_one::precondition::malformed_env))]
    MalformedEnvVar { var: String, reason: String },

    #[error("invalid CMake option `{option}`: expected KEY=VALUE")]
    #[diagnostic(
        code(cmake_one::precondition::malformed_option),
        help("write `ENABLE_FOO=ON`, not `-DENABLE_FOO=ON` or `ENABLE_FOO`")
    )]
    MalformedOption { option: String },

    #[error("path remaps are not one-to-one: {reason}")]
    #[diagnostic(code(cmake_one::precondition::conflicting_remap))]
    ConflictingRemap { reason: String },

    #[error("`{tool}` not found in PATH")]
    #[diagnostic(code(cmake_one::precondition::missing_tool))]
    MissingTool { tool: String },

    #[error("{engine} is not running in rootless mode")]
    #[diagnostic(
        code(cmake_one::precondition::not_rootless),
        help("see https://docs.docker.com/engine/security/rootless/ or run: curl -fsSL https://get.docker.com/rootless | sh")
    )]
    ContainerNotRootless { engine: String },

    #[error("credential directory not found: {}", .path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<no home directory>".to_string()))]
    #[diagnostic(code(cmake_one::precondition::missing_credentials))]
    MissingCredentialDir { path: Option<PathBuf> },

    #[error("`{flag}` needs a directory argument")]
    #[diagnostic(code(cmake_one::precondition::missing_flag_value))]
    MissingFlagValue { flag: String },
}

/// A wrapped process failed.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ExecutionError {
    #[error("`{command}` exited with status {code}")]
    #[diagnostic(code(cmake_one::execution::failed))]
    Failed { command: String, code: i32 },

    #[error("`{command}` was terminated by a signal")]
    #[diagnostic(code(cmake_one::execution::signaled))]
    Signaled { command: String, code: i32 },
}

impl ExecutionError {
    /// Build the error for a child that did not succeed.
    pub fn from_status(command: impl Into<String>, status: ExitStatus) -> Self {
        let command = command.into();
        match status.code() {
            Some(code) => ExecutionError::Failed { command, code },
            None => ExecutionError::Signaled {
                command,
                code: signal_exit_code(status),
            },
        }
    }

    /// Exit code this process should use to mirror the child.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecutionError::Failed { code, .. } | ExecutionError::Signaled { code, .. } => *code,
        }
    }
}

#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|s| 128 + s).unwrap_or(1)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> i32 {
    1
}

/// Any failure of the resolve → emit → execute pipeline.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Execution(#[from] ExecutionError),

    /// Catalog and resolver disagree; prior validation should have made
    /// this unreachable.
    #[error("unreachable configuration: {0}")]
    #[diagnostic(
        code(cmake_one::unreachable),
        help("this is a bug in cmake-one, please report it with the full command line")
    )]
    Unreachable(String),
}

impl BuildError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Execution(e) => e.exit_code(),
            _ => 1,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            BuildError::Config(ConfigError::UnsupportedPlatform { supported, .. }) => {
                let hosts: Vec<_> = supported.iter().map(|h| h.as_str()).collect();
                diag.with_context(format!("supported hosts: {}", hosts.join(", ")))
            }
            BuildError::Config(ConfigError::UnsupportedArch { supported, .. }) => diag
                .with_context(format!("supported architectures: {}", supported.join(", "))),
            BuildError::Config(ConfigError::MissingToolchainFile { platform, .. }) => {
                match platform.sdk_root_var() {
                    Some(var) => diag.with_suggestion(format!(
                        "check that `{}` points at a complete SDK installation",
                        var
                    )),
                    None => diag.with_suggestion(
                        "pass --toolchains_dir or set CMAKE_ONE_TOOLCHAINS_DIR to the bundled toolchains",
                    ),
                }
            }
            BuildError::Config(ConfigError::MissingDockerfile { .. }) => diag.with_suggestion(
                "set `container.docker_dir` in .cmake-one/config.toml or CMAKE_ONE_HOME",
            ),
            BuildError::Precondition(PreconditionError::MissingEnvVar { hint, .. }) => {
                diag.with_suggestion(*hint)
            }
            BuildError::Precondition(PreconditionError::MissingTool { tool })
                if tool == "docker" || tool == "podman" =>
            {
                diag.with_suggestion(suggestions::NO_ENGINE)
            }
            BuildError::Precondition(PreconditionError::MissingTool { tool }) => {
                diag.with_suggestion(format!("install `{}` and make sure it is on PATH", tool))
            }
            BuildError::Precondition(PreconditionError::ContainerNotRootless { .. }) => diag
                .with_suggestion("https://docs.docker.com/engine/security/rootless/")
                .with_suggestion("curl -fsSL https://get.docker.com/rootless | sh"),
            BuildError::Execution(_) => diag.with_suggestion(suggestions::BUILD_FAILED),
            BuildError::Config(ConfigError::MissingBuildDescriptor { .. }) => {
                diag.with_suggestion(suggestions::NO_CMAKELISTS)
            }
            BuildError::Unreachable(_) => diag.with_suggestion(
                "this is a bug in cmake-one, please report it with the full command line",
            ),
            _ => diag,
        }
    }
}
