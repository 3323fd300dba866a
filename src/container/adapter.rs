//! Rewrapping a cmake-one command line for replay inside a container.
//!
//! Directories named by path flags are bind-mounted at the same path inside
//! the container, so the command line stays valid on both sides without
//! translating anything but relative paths.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::container::engine::{Engine, ImageSpec, TerminalMode};
use crate::core::env::{prefixed_var, Environment};
use crate::core::errors::{BuildError, PreconditionError};
use crate::core::platform::sdk_root_vars;
use crate::core::remap::{PathRemap, RemapSet};
use crate::util::fs::{absolutize, ensure_dir};
use crate::util::process::{shell_quote, ProcessBuilder};

/// Flags whose value is a directory that must be visible in the container.
pub const PATH_FLAGS: &[&str] = &[
    "--repo_dir",
    "--build_dir",
    "--install_dir",
    "--repo-dir",
    "--build-dir",
    "--install-dir",
];

/// Where the host credential directory appears in the container.
const CONTAINER_SSH_DIR: &str = "/root/.ssh";

/// Shared scratch directory, mounted read-write on both sides.
const SHARED_TMP: &str = "/tmp";

/// A `-v host:container[:rw]` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub remap: PathRemap,
    pub read_write: bool,
}

impl BindMount {
    /// Same path on both sides, read-write.
    pub fn identity(path: impl Into<PathBuf>) -> Result<Self, PreconditionError> {
        Ok(BindMount {
            remap: PathRemap::identity(path)?,
            read_write: true,
        })
    }

    pub fn to_arg(&self) -> String {
        let mut arg = format!("{}:{}", self.remap.from().display(), self.remap.to().display());
        if self.read_write {
            arg.push_str(":rw");
        }
        arg
    }
}

/// Result of rewriting the path flags of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenArgs {
    pub args: Vec<String>,
    /// Identity mounts for every directory named by a path flag
    pub mounts: Vec<BindMount>,
}

/// Split a literal command line on whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

fn split_path_flag(token: &str) -> Option<(&str, Option<&str>)> {
    PATH_FLAGS.iter().find_map(|flag| {
        if token == *flag {
            Some((*flag, None))
        } else {
            token
                .strip_prefix(flag)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|value| (*flag, Some(value)))
        }
    })
}

/// Make every path flag value absolute and collect a mount for each.
///
/// Only path flag values change; every other token is copied as is, and
/// rewriting the output again reproduces it. Nothing touches the filesystem.
pub fn rewrite_path_args(args: &[String], cwd: &Path) -> Result<RewrittenArgs, PreconditionError> {
    let mut out = Vec::with_capacity(args.len());
    let mut mounts = RemapSet::new();
    let mut iter = args.iter();

    while let Some(token) = iter.next() {
        let Some((flag, inline)) = split_path_flag(token) else {
            out.push(token.clone());
            continue;
        };

        let value = match inline {
            Some(value) => value.to_string(),
            None => match iter.next() {
                Some(value) if !value.starts_with("--") => value.clone(),
                _ => {
                    return Err(PreconditionError::MissingFlagValue {
                        flag: flag.to_string(),
                    })
                }
            },
        };
        if value.is_empty() {
            return Err(PreconditionError::MissingFlagValue {
                flag: flag.to_string(),
            });
        }

        let dir = absolutize(cwd, Path::new(&value));
        mounts.insert(PathRemap::identity(&dir)?)?;

        let dir = dir.display().to_string();
        if inline.is_some() {
            out.push(format!("{}={}", flag, dir));
        } else {
            out.push(flag.to_string());
            out.push(dir);
        }
    }

    Ok(RewrittenArgs {
        args: out,
        mounts: mounts
            .into_vec()
            .into_iter()
            .map(|remap| BindMount {
                remap,
                read_write: true,
            })
            .collect(),
    })
}

/// Host facts the adapter needs, gathered once by the caller.
#[derive(Debug, Clone)]
pub struct ContainerContext {
    pub engine: Engine,
    pub image: ImageSpec,
    pub home: Option<PathBuf>,
    pub cwd: PathBuf,
    /// Also mount the working directory at the same path
    pub mount_workdir: bool,
    /// Variables forwarded by name, keeping the host value
    pub forward_env: Vec<String>,
    pub terminal: TerminalMode,
    /// Program (and leading args) run inside the container
    pub inner_command: Vec<String>,
}

/// A fully derived `<engine> run` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInvocation {
    pub engine: Engine,
    pub tag: String,
    pub terminal: TerminalMode,
    /// Names passed as `-e NAME`
    pub forwarded_env: Vec<String>,
    /// `(CMAKE_ONE_PREFIX_V, host value)` pairs
    pub prefixed_env: Vec<(String, String)>,
    /// Credential and scratch mounts
    pub fixed_mounts: Vec<BindMount>,
    pub workdir_mount: Option<BindMount>,
    /// One mount per directory named on the command line
    pub path_mounts: Vec<BindMount>,
    /// Shell command run by `/bin/bash -c`
    pub inner: String,
}

impl ContainerInvocation {
    /// Every mount in command-line order.
    pub fn mounts(&self) -> impl Iterator<Item = &BindMount> {
        self.fixed_mounts
            .iter()
            .chain(self.workdir_mount.iter())
            .chain(self.path_mounts.iter())
    }

    /// Create the directories behind the path mounts.
    pub fn create_mount_dirs(&self) -> Result<()> {
        for mount in &self.path_mounts {
            ensure_dir(mount.remap.from())?;
        }
        Ok(())
    }

    pub fn run_command(&self) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(self.engine.program())
            .arg("run")
            .arg("--rm")
            .arg(self.terminal.flag());
        for name in &self.forwarded_env {
            cmd = cmd.arg("-e").arg(name);
        }
        for (name, value) in &self.prefixed_env {
            cmd = cmd.arg("-e").arg(format!("{}={}", name, value));
        }
        for mount in self.mounts() {
            cmd = cmd.arg("-v").arg(mount.to_arg());
        }
        cmd.arg(&self.tag).arg("/bin/bash").arg("-c").arg(&self.inner)
    }
}

/// Derive the container invocation replaying `args` through the inner command.
pub fn wrap_for_container(
    args: &[String],
    ctx: &ContainerContext,
    env: &Environment,
) -> Result<ContainerInvocation, BuildError> {
    let rewritten = rewrite_path_args(args, &ctx.cwd)?;

    let home = ctx
        .home
        .as_ref()
        .ok_or(PreconditionError::MissingCredentialDir { path: None })?;
    let ssh_dir = home.join(".ssh");
    if !ssh_dir.is_dir() {
        return Err(PreconditionError::MissingCredentialDir {
            path: Some(ssh_dir),
        }
        .into());
    }
    let fixed_mounts = vec![
        BindMount {
            remap: PathRemap::new(&ssh_dir, CONTAINER_SSH_DIR)?,
            read_write: false,
        },
        BindMount::identity(SHARED_TMP)?,
    ];

    let workdir_mount = if ctx.mount_workdir {
        Some(BindMount::identity(&ctx.cwd)?)
    } else {
        None
    };

    // one declaration per container path; engines refuse duplicate mount points
    let mut mounted = RemapSet::new();
    for mount in fixed_mounts.iter().chain(workdir_mount.iter()) {
        mounted.insert(mount.remap.clone())?;
    }
    let mut path_mounts = Vec::with_capacity(rewritten.mounts.len());
    for mount in rewritten.mounts {
        if mounted.contains(&mount.remap) {
            tracing::debug!("{} is already mounted", mount.remap.from().display());
            continue;
        }
        mounted.insert(mount.remap.clone())?;
        path_mounts.push(mount);
    }

    let forwarded_env = ctx
        .forward_env
        .iter()
        .filter(|name| env.var(name).is_some())
        .cloned()
        .collect();

    let prefixed_env = sdk_root_vars()
        .into_iter()
        .filter_map(|var| env.var(var).map(|value| (prefixed_var(var), value.to_string())))
        .collect();

    let inner = ctx
        .inner_command
        .iter()
        .chain(rewritten.args.iter())
        .map(|word| shell_quote(word))
        .collect::<Vec<_>>()
        .join(" ");

    Ok(ContainerInvocation {
        engine: ctx.engine,
        tag: ctx.image.tag.clone(),
        terminal: ctx.terminal,
        forwarded_env,
        prefixed_env,
        fixed_mounts,
        workdir_mount,
        path_mounts,
        inner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::HostOs;
    use tempfile::TempDir;

    fn context(home: &Path) -> ContainerContext {
        ContainerContext {
            engine: Engine::Docker,
            image: ImageSpec {
                tag: "ubuntu_2404".into(),
                dockerfile: PathBuf::from("/opt/cmake-one/docker/ubuntu_env/Dockerfile"),
            },
            home: Some(home.to_path_buf()),
            cwd: PathBuf::from("/work"),
            mount_workdir: false,
            forward_env: vec!["Commit_Id".into()],
            terminal: TerminalMode::Batch,
            inner_command: vec!["cmake-one".into()],
        }
    }

    fn home_with_ssh() -> TempDir {
        let home = TempDir::new().unwrap();
        std::fs::create_dir(home.path().join(".ssh")).unwrap();
        home
    }

    #[test]
    fn two_path_flags_give_two_mounts() {
        let args = tokenize("cross_build --platform ANDROID --repo_dir /a/b --arch aarch64 --install_dir /a/c");
        let out = rewrite_path_args(&args, Path::new("/work")).unwrap();
        assert_eq!(out.args, args);
        let mounts: Vec<_> = out.mounts.iter().map(BindMount::to_arg).collect();
        assert_eq!(mounts, ["/a/b:/a/b:rw", "/a/c:/a/c:rw"]);
    }

    #[test]
    fn relative_paths_become_absolute() {
        let args = tokenize("host_build --build_dir=out/../b --repo-dir proj");
        let out = rewrite_path_args(&args, Path::new("/work")).unwrap();
        assert_eq!(
            out.args,
            ["host_build", "--build_dir=/work/b", "--repo-dir", "/work/proj"]
        );
    }

    #[test]
    fn rewrite_is_idempotent() {
        let args = tokenize("host_build --repo_dir ./x --build_dir=y/z -j 8 --cmake_options A=1");
        let once = rewrite_path_args(&args, Path::new("/w")).unwrap();
        let twice = rewrite_path_args(&once.args, Path::new("/elsewhere")).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn repeated_directory_is_mounted_once() {
        let args = tokenize("host_build --repo_dir /p --build_dir /p");
        let out = rewrite_path_args(&args, Path::new("/")).unwrap();
        assert_eq!(out.mounts.len(), 1);
    }

    #[test]
    fn path_flag_without_value() {
        for line in ["host_build --repo_dir", "host_build --build_dir --verbose", "x --install_dir="] {
            let err = rewrite_path_args(&tokenize(line), Path::new("/")).unwrap_err();
            assert!(matches!(err, PreconditionError::MissingFlagValue { .. }), "{}", line);
        }
    }

    #[test]
    fn scenario_run_line() {
        let home = home_with_ssh();
        let env = Environment::new(HostOs::Linux, "x86_64", "/t")
            .with_var("Commit_Id", "abc123")
            .with_var("NDK_ROOT", "/home/dev/ndk");
        let args = tokenize("cross_build --repo_dir /a/b --install_dir /a/c");
        let inv = wrap_for_container(&args, &context(home.path()), &env).unwrap();

        assert_eq!(inv.path_mounts.len(), 2);
        assert_eq!(inv.forwarded_env, ["Commit_Id"]);
        assert_eq!(
            inv.prefixed_env,
            [("CMAKE_ONE_PREFIX_NDK_ROOT".to_string(), "/home/dev/ndk".to_string())]
        );

        let line = inv.run_command().display_command();
        let ssh = format!("-v {}:/root/.ssh -v /tmp:/tmp:rw", home.path().join(".ssh").display());
        assert!(line.starts_with("docker run --rm -i -e Commit_Id -e CMAKE_ONE_PREFIX_NDK_ROOT=/home/dev/ndk "));
        assert!(line.contains(&ssh), "{}", line);
        assert!(line.ends_with(
            "-v /a/b:/a/b:rw -v /a/c:/a/c:rw ubuntu_2404 /bin/bash -c 'cmake-one cross_build --repo_dir /a/b --install_dir /a/c'"
        ));
    }

    #[test]
    fn workdir_mount_is_optional() {
        let home = home_with_ssh();
        let env = Environment::new(HostOs::Linux, "x86_64", "/t");
        let mut ctx = context(home.path());
        ctx.mount_workdir = true;
        let inv = wrap_for_container(&tokenize("host_build"), &ctx, &env).unwrap();
        assert_eq!(inv.mounts().count(), 3);
        assert_eq!(inv.workdir_mount.unwrap().to_arg(), "/work:/work:rw");
    }

    #[test]
    fn workdir_named_by_path_flag_is_mounted_once() {
        let home = home_with_ssh();
        let env = Environment::new(HostOs::Linux, "x86_64", "/t");
        let mut ctx = context(home.path());
        ctx.mount_workdir = true;
        let inv = wrap_for_container(&tokenize("host_build --repo_dir ."), &ctx, &env).unwrap();

        let line = inv.run_command().display_command();
        assert_eq!(line.matches("-v /work:/work:rw").count(), 1, "{}", line);
        assert!(inv.path_mounts.is_empty());
        assert!(line.ends_with("'cmake-one host_build --repo_dir /work'"), "{}", line);
    }

    #[test]
    fn shared_tmp_named_by_path_flag_is_mounted_once() {
        let home = home_with_ssh();
        let env = Environment::new(HostOs::Linux, "x86_64", "/t");
        let inv = wrap_for_container(
            &tokenize("host_build --build_dir /tmp --install_dir /tmp/install"),
            &context(home.path()),
            &env,
        )
        .unwrap();

        let line = inv.run_command().display_command();
        assert_eq!(line.matches("-v /tmp:/tmp:rw").count(), 1, "{}", line);
        let paths: Vec<_> = inv.path_mounts.iter().map(BindMount::to_arg).collect();
        assert_eq!(paths, ["/tmp/install:/tmp/install:rw"]);
    }

    #[test]
    fn path_flag_clashing_with_credential_mount_fails() {
        let home = home_with_ssh();
        let env = Environment::new(HostOs::Linux, "x86_64", "/t");
        let err = wrap_for_container(
            &tokenize("host_build --build_dir /root/.ssh"),
            &context(home.path()),
            &env,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Precondition(PreconditionError::ConflictingRemap { .. })
        ));
    }

    #[test]
    fn missing_credentials_fail() {
        let home = TempDir::new().unwrap();
        let env = Environment::new(HostOs::Linux, "x86_64", "/t");
        let err = wrap_for_container(&tokenize("host_build"), &context(home.path()), &env).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Precondition(PreconditionError::MissingCredentialDir { path: Some(_) })
        ));

        let mut ctx = context(home.path());
        ctx.home = None;
        let err = wrap_for_container(&tokenize("host_build"), &ctx, &env).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Precondition(PreconditionError::MissingCredentialDir { path: None })
        ));
    }

    #[test]
    fn mount_dirs_are_created() {
        let home = home_with_ssh();
        let work = TempDir::new().unwrap();
        let env = Environment::new(HostOs::Linux, "x86_64", "/t");
        let mut ctx = context(home.path());
        ctx.cwd = work.path().to_path_buf();
        let inv = wrap_for_container(&tokenize("host_build --build_dir out/b"), &ctx, &env).unwrap();
        inv.create_mount_dirs().unwrap();
        assert!(work.path().join("out/b").is_dir());
    }
}
