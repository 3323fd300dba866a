//! Container engine selection, the rootless check and image lookup.

use std::fmt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::env::Environment;
use crate::core::errors::{BuildError, ConfigError, ExecutionError, PreconditionError};
use crate::core::platform::HostOs;
use crate::util::process::{ProcessBuilder, Runner};

/// A docker-compatible container engine CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Docker,
    Podman,
}

impl Engine {
    pub fn program(&self) -> &'static str {
        match self {
            Engine::Docker => "docker",
            Engine::Podman => "podman",
        }
    }

    /// Whether `<engine> info` output reports an unprivileged daemon.
    pub fn info_reports_rootless(&self, info: &str) -> bool {
        match self {
            // `Security Options: ... name=rootless`
            Engine::Docker => info.contains("rootless"),
            // podman always prints the key, so look at the value
            Engine::Podman => info.contains("rootless: true"),
        }
    }

    /// Fail unless the engine runs rootless.
    ///
    /// A root daemon would give the build host-root access through the bind
    /// mounts, so nothing runs until this passes.
    pub fn ensure_rootless(&self, runner: &dyn Runner) -> Result<(), BuildError> {
        let cmd = ProcessBuilder::new(self.program()).arg("info");
        let output = runner
            .capture(&cmd)
            .map_err(|_| PreconditionError::MissingTool {
                tool: self.program().to_string(),
            })?;
        if !output.status.success() {
            return Err(ExecutionError::from_status(cmd.display_command(), output.status).into());
        }
        let info = String::from_utf8_lossy(&output.stdout);
        if !self.info_reports_rootless(&info) {
            return Err(PreconditionError::ContainerNotRootless {
                engine: self.program().to_string(),
            }
            .into());
        }
        tracing::debug!("{} runs rootless", self.program());
        Ok(())
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Engine::Docker),
            "podman" => Ok(Engine::Podman),
            _ => Err(format!(
                "invalid container engine '{}'; expected 'docker' or 'podman'",
                s
            )),
        }
    }
}

/// Build environment image for a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub tag: String,
    pub dockerfile: PathBuf,
}

impl ImageSpec {
    /// Build context: the directory holding the Dockerfile.
    pub fn context_dir(&self) -> &Path {
        self.dockerfile.parent().unwrap_or_else(|| Path::new("."))
    }

    /// `<engine> build -t <tag> -f <Dockerfile> <dir>`
    pub fn build_command(&self, engine: Engine) -> ProcessBuilder {
        ProcessBuilder::new(engine.program())
            .arg("build")
            .arg("-t")
            .arg(&self.tag)
            .arg("-f")
            .arg(&self.dockerfile)
            .arg(self.context_dir())
    }
}

/// Pick the image for `host` from the bundled `docker_dir`.
pub fn image_for_host(host: HostOs, docker_dir: &Path) -> Result<ImageSpec, ConfigError> {
    let (tag, dir) = match host {
        HostOs::Linux => ("ubuntu_2404", "ubuntu_env"),
        HostOs::Darwin => ("macos_env", "macos_env"),
        HostOs::Windows => ("windows_env", "windows_env"),
    };
    let dockerfile = docker_dir.join(dir).join("Dockerfile");
    if !dockerfile.is_file() {
        return Err(ConfigError::MissingDockerfile { path: dockerfile });
    }
    Ok(ImageSpec {
        tag: tag.to_string(),
        dockerfile,
    })
}

/// Whether the container session gets a pseudo-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalMode {
    /// `-it`
    Interactive,
    /// `-i`
    Batch,
}

impl TerminalMode {
    /// Decide from the real stdio streams and the CI markers in `env`.
    pub fn detect(env: &Environment) -> Self {
        let stdio_is_terminal = std::io::stdin().is_terminal()
            && std::io::stdout().is_terminal()
            && std::io::stderr().is_terminal();
        Self::decide(stdio_is_terminal, env)
    }

    pub fn decide(stdio_is_terminal: bool, env: &Environment) -> Self {
        if env.var("JENKINS_HOME").is_some() {
            tracing::debug!("running under Jenkins, no tty");
            return TerminalMode::Batch;
        }
        if env.var("CI_SERVER_NAME") == Some("GitLab") {
            tracing::debug!("running under GitLab CI, no tty");
            return TerminalMode::Batch;
        }
        if !stdio_is_terminal {
            tracing::debug!("stdio is not a terminal, no tty");
            return TerminalMode::Batch;
        }
        TerminalMode::Interactive
    }

    pub fn flag(&self) -> &'static str {
        match self {
            TerminalMode::Interactive => "-it",
            TerminalMode::Batch => "-i",
        }
    }
}

/// Build the image, failing on a non-zero exit.
pub fn build_image(runner: &dyn Runner, engine: Engine, image: &ImageSpec) -> anyhow::Result<()> {
    let cmd = image.build_command(engine);
    tracing::info!("building image {}", image.tag);
    let status = runner
        .run(&cmd)
        .with_context(|| format!("failed to build image {}", image.tag))?;
    if !status.success() {
        return Err(BuildError::from(ExecutionError::from_status(cmd.display_command(), status)).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{exit_status, RecordingRunner};
    use tempfile::TempDir;

    #[test]
    fn rootless_detection_per_engine() {
        assert!(Engine::Docker.info_reports_rootless(" Security Options:\n  seccomp\n  rootless\n"));
        assert!(!Engine::Docker.info_reports_rootless(" Security Options:\n  seccomp\n"));
        assert!(Engine::Podman.info_reports_rootless("host:\n  security:\n    rootless: true\n"));
        assert!(!Engine::Podman.info_reports_rootless("host:\n  security:\n    rootless: false\n"));
    }

    #[test]
    fn root_daemon_is_refused() {
        let runner = RecordingRunner::new().with_output("docker", 0, "Security Options:\n seccomp\n");
        let err = Engine::Docker.ensure_rootless(&runner).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Precondition(PreconditionError::ContainerNotRootless { .. })
        ));
        assert_eq!(runner.commands(), ["docker info"]);
    }

    #[test]
    fn rootless_daemon_passes() {
        let runner = RecordingRunner::new().with_output("podman", 0, "rootless: true\n");
        Engine::Podman.ensure_rootless(&runner).unwrap();
    }

    #[test]
    fn image_lookup_needs_a_dockerfile() {
        let tmp = TempDir::new().unwrap();
        let err = image_for_host(HostOs::Linux, tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDockerfile { .. }));

        std::fs::create_dir_all(tmp.path().join("ubuntu_env")).unwrap();
        std::fs::write(tmp.path().join("ubuntu_env/Dockerfile"), "FROM ubuntu:24.04\n").unwrap();
        let image = image_for_host(HostOs::Linux, tmp.path()).unwrap();
        assert_eq!(image.tag, "ubuntu_2404");
        assert_eq!(image.context_dir(), tmp.path().join("ubuntu_env"));
        let cmd = image.build_command(Engine::Docker);
        assert_eq!(cmd.get_args()[..3], ["build", "-t", "ubuntu_2404"]);
    }

    #[test]
    fn failed_image_build_reports_status() {
        let tmp = TempDir::new().unwrap();
        let image = ImageSpec {
            tag: "ubuntu_2404".into(),
            dockerfile: tmp.path().join("Dockerfile"),
        };
        let runner = RecordingRunner::new().with_status("docker", exit_status(2));
        let err = build_image(&runner, Engine::Docker, &image).unwrap_err();
        let err = err.downcast::<BuildError>().unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn tty_only_outside_ci() {
        let env = Environment::new(HostOs::Linux, "x86_64", "/t");
        assert_eq!(TerminalMode::decide(true, &env), TerminalMode::Interactive);
        assert_eq!(TerminalMode::decide(false, &env), TerminalMode::Batch);

        let jenkins = env.clone().with_var("JENKINS_HOME", "/var/jenkins");
        assert_eq!(TerminalMode::decide(true, &jenkins), TerminalMode::Batch);

        let gitlab = env.clone().with_var("CI_SERVER_NAME", "GitLab");
        assert_eq!(TerminalMode::decide(true, &gitlab), TerminalMode::Batch);
        let other = env.with_var("CI_SERVER_NAME", "Gitea");
        assert_eq!(TerminalMode::decide(true, &other), TerminalMode::Interactive);
    }
}
