//! Implementation of `cmake-one host_build` / `cmake-one cross_build`.

use anyhow::Result;
use serde::Serialize;

use crate::builder::flags::{resolve, ResolvedConfig, NINJA};
use crate::builder::script::{emit, BuildScript};
use crate::core::env::Environment;
use crate::core::errors::{BuildError, ExecutionError};
use crate::core::request::BuildRequest;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::process::{require_executable, Runner};

/// Options for the build command that do not affect resolution.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Delete build and install directories first, without asking
    pub remove_old_build: bool,
}

/// A resolved configuration and the script it serializes to.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub config: ResolvedConfig,
    pub script: BuildScript,
}

#[derive(Serialize)]
struct PlanJson<'a> {
    fingerprint: &'a str,
    config: &'a ResolvedConfig,
    script_path: String,
    script: String,
}

impl BuildPlan {
    /// JSON shown by `--plan`.
    pub fn to_json(&self) -> Result<String> {
        let json = PlanJson {
            fingerprint: &self.script.fingerprint,
            config: &self.config,
            script_path: self.script.path.display().to_string(),
            script: self.script.render(),
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }

    /// Status lines printed after a successful build.
    pub fn summary(&self) -> Vec<String> {
        let paths = &self.config.paths;
        let mut lines = vec![format!(
            "    Finished {} build in {}",
            self.config.build_type,
            paths.build_dir.display()
        )];
        if self.config.install_mode.ninja_target().is_some() {
            lines.push(format!("   Installed to {}", paths.install_dir.display()));
        }
        lines
    }
}

/// Resolve and emit without touching the filesystem.
pub fn plan(request: &BuildRequest, env: &Environment) -> Result<BuildPlan, BuildError> {
    let config = resolve(request, env)?;
    let script = emit(&config);
    tracing::debug!("resolved {} (fingerprint {})", script.path.display(), script.fingerprint);
    Ok(BuildPlan { config, script })
}

/// Check that the programs the script calls are installed.
pub fn check_tools() -> Result<(), BuildError> {
    for tool in ["bash", "cmake", NINJA] {
        let path = require_executable(tool)?;
        tracing::debug!("found {} at {}", tool, path.display());
    }
    Ok(())
}

/// Resolve, write and run the build script.
pub fn build(
    request: &BuildRequest,
    env: &Environment,
    opts: &BuildOptions,
    runner: &dyn Runner,
) -> Result<BuildPlan> {
    let plan = plan(request, env)?;
    let paths = &plan.config.paths;

    if opts.remove_old_build {
        tracing::info!("removing old build dir: {}", paths.build_dir.display());
        remove_dir_all_if_exists(&paths.build_dir)?;
        tracing::info!("removing old install dir: {}", paths.install_dir.display());
        remove_dir_all_if_exists(&paths.install_dir)?;
    }
    ensure_dir(&paths.build_dir)?;
    ensure_dir(&paths.install_dir)?;
    tracing::debug!(
        "repo_dir: {} build_dir: {} install_dir: {}",
        paths.repo_dir.display(),
        paths.build_dir.display(),
        paths.install_dir.display()
    );

    let text = plan.script.write()?;
    tracing::info!("wrote {}:\n{}", plan.script.path.display(), text.trim_end());

    let cmd = plan.script.command();
    tracing::info!("running {}", cmd.display_command());
    let status = runner.run(&cmd)?;
    if !status.success() {
        return Err(BuildError::from(ExecutionError::from_status(cmd.display_command(), status)).into());
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{HostOs, Platform};
    use crate::core::request::BuildFlags;
    use crate::test_support::{cmake_project, exit_status, RecordingRunner, SdkFixture};

    fn request(repo: &std::path::Path) -> BuildRequest {
        BuildRequest::builder(Platform::Host, "x86_64", repo).build().unwrap()
    }

    #[test]
    fn plan_touches_nothing() {
        let repo = cmake_project();
        let fx = SdkFixture::new(HostOs::Linux);
        let plan = plan(&request(repo.path()), &fx.env).unwrap();
        assert!(!plan.config.paths.build_dir.exists());

        let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(json["config"]["platform"], "HOST");
        assert_eq!(json["config"]["install_mode"], "strip");
        assert!(json["script"].as_str().unwrap().starts_with("#!/bin/bash\nset -ex\n"));
    }

    #[test]
    fn build_writes_and_runs_script() {
        let repo = cmake_project();
        let fx = SdkFixture::new(HostOs::Linux);
        let runner = RecordingRunner::new();
        let plan = build(&request(repo.path()), &fx.env, &BuildOptions::default(), &runner).unwrap();

        let build_dir = repo.path().join("build-host-Release");
        assert!(build_dir.join("install").is_dir());
        assert_eq!(
            std::fs::read_to_string(build_dir.join("config.sh")).unwrap(),
            plan.script.render()
        );

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get_args(), [build_dir.join("config.sh").into_os_string()]);
        assert_eq!(calls[0].get_cwd(), Some(build_dir.as_path()));
    }

    #[test]
    fn summary_reports_install_only_when_installing() {
        let repo = cmake_project();
        let fx = SdkFixture::new(HostOs::Linux);
        let full = plan(&request(repo.path()), &fx.env).unwrap().summary();
        assert_eq!(full.len(), 2);
        assert!(full[1].contains("Installed to"), "{:?}", full);

        let req = BuildRequest::builder(Platform::Host, "x86_64", repo.path())
            .flags(BuildFlags {
                single_target: Some("demo".to_string()),
                ..BuildFlags::default()
            })
            .build()
            .unwrap();
        let single = plan(&req, &fx.env).unwrap().summary();
        assert_eq!(single.len(), 1);
        assert!(single[0].starts_with("    Finished Release build in"), "{:?}", single);
    }

    #[test]
    fn remove_old_build_clears_stale_files() {
        let repo = cmake_project();
        let fx = SdkFixture::new(HostOs::Linux);
        let stale = repo.path().join("build-host-Release/stale.o");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, "").unwrap();

        let opts = BuildOptions {
            remove_old_build: true,
        };
        build(&request(repo.path()), &fx.env, &opts, &RecordingRunner::new()).unwrap();
        assert!(!stale.exists());
        assert!(repo.path().join("build-host-Release/config.sh").is_file());
    }

    #[test]
    fn failing_script_mirrors_exit_code() {
        let repo = cmake_project();
        let fx = SdkFixture::new(HostOs::Linux);
        let runner = RecordingRunner::new().with_status("bash", exit_status(7));
        let err = build(&request(repo.path()), &fx.env, &BuildOptions::default(), &runner).unwrap_err();
        let err = err.downcast::<BuildError>().unwrap();
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn resolution_errors_stop_before_any_io() {
        let repo = cmake_project();
        let fx = SdkFixture::new(HostOs::Linux);
        let req = BuildRequest::builder(Platform::Android, "mips", repo.path())
            .build()
            .unwrap();
        let runner = RecordingRunner::new();
        assert!(build(&req, &fx.env, &BuildOptions::default(), &runner).is_err());
        assert!(runner.calls().is_empty());
        assert!(!repo.path().join("build-ANDROID-mips-Release").exists());
    }
}
