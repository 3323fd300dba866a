//! The declarative build request handed over by the front end.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::core::errors::{BuildError, ConfigError, PreconditionError};
use crate::core::platform::{BuildType, Platform, Sanitizer};
use crate::util::fs::absolutize;

/// File whose presence marks a directory as a CMake project.
pub const BUILD_DESCRIPTOR: &str = "CMakeLists.txt";

/// Absolute repository, build and install directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BuildPaths {
    pub repo_dir: PathBuf,
    pub build_dir: PathBuf,
    pub install_dir: PathBuf,
}

/// Boolean and pass-through switches of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BuildFlags {
    /// `ninja -v`
    pub verbose: bool,
    /// `ninja -d explain` (implies verbose)
    pub explain: bool,
    /// Use `install/strip` where the platform supports it
    pub strip_install: bool,
    /// Build only this ninja target and skip the install step
    pub single_target: Option<String>,
    /// Narrow a host build to 32-bit
    pub build_for_32bit: bool,
    /// Symlink `build` and `install` into the repository
    pub link_build_and_install: bool,
}

impl Default for BuildFlags {
    fn default() -> Self {
        BuildFlags {
            verbose: false,
            explain: false,
            strip_install: true,
            single_target: None,
            build_for_32bit: false,
            link_build_and_install: true,
        }
    }
}

/// A user-supplied `KEY=VALUE` CMake cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OptionOverride {
    pub key: String,
    pub value: String,
}

impl OptionOverride {
    /// Parse a space-separated list such as `"ENABLE_ASAN=ON ENABLE_TSAN=ON"`.
    pub fn parse_list(list: &str) -> Result<Vec<OptionOverride>, PreconditionError> {
        list.split_whitespace().map(str::parse).collect()
    }
}

impl FromStr for OptionOverride {
    type Err = PreconditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() && !key.starts_with('-') => Ok(OptionOverride {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => Err(PreconditionError::MalformedOption {
                option: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OptionOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A validated, immutable build request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BuildRequest {
    pub platform: Platform,
    pub arch: String,
    pub build_type: BuildType,
    pub sanitizer: Option<Sanitizer>,
    pub paths: BuildPaths,
    pub option_overrides: Vec<OptionOverride>,
    pub flags: BuildFlags,
    /// Forwarded to ninja as `-j<N>`
    pub jobs: Option<u32>,
}

impl BuildRequest {
    /// Start a request for `platform`/`arch` on the project at `repo_dir`.
    pub fn builder(
        platform: Platform,
        arch: impl Into<String>,
        repo_dir: impl Into<PathBuf>,
    ) -> RequestBuilder {
        RequestBuilder {
            platform,
            arch: arch.into(),
            repo_dir: repo_dir.into(),
            build_dir: None,
            install_dir: None,
            cwd: None,
            build_type: BuildType::default(),
            sanitizer: None,
            option_overrides: Vec::new(),
            flags: BuildFlags::default(),
            jobs: None,
        }
    }

    /// Default build directory name, e.g. `build-ANDROID-aarch64-Debug`.
    pub fn default_build_dir_name(
        platform: Platform,
        arch: &str,
        build_type: BuildType,
        build_for_32bit: bool,
    ) -> String {
        match platform {
            Platform::Host if build_for_32bit => format!("build-host-{}-32bit", build_type),
            Platform::Host => format!("build-host-{}", build_type),
            _ => format!("build-{}-{}-{}", platform, arch, build_type),
        }
    }
}

/// Builder for [`BuildRequest`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    platform: Platform,
    arch: String,
    repo_dir: PathBuf,
    build_dir: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    cwd: Option<PathBuf>,
    build_type: BuildType,
    sanitizer: Option<Sanitizer>,
    option_overrides: Vec<OptionOverride>,
    flags: BuildFlags,
    jobs: Option<u32>,
}

impl RequestBuilder {
    pub fn build_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.build_dir = dir;
        self
    }

    pub fn install_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.install_dir = dir;
        self
    }

    /// Directory relative paths are resolved against (default: process cwd).
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self
    }

    pub fn sanitizer(mut self, sanitizer: Option<Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn option_overrides(mut self, overrides: impl IntoIterator<Item = OptionOverride>) -> Self {
        self.option_overrides.extend(overrides);
        self
    }

    pub fn flags(mut self, flags: BuildFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn jobs(mut self, jobs: Option<u32>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Validate the repository and derive unset directories.
    pub fn build(self) -> Result<BuildRequest, BuildError> {
        let resolve = |p: &Path| -> Result<PathBuf, BuildError> {
            match &self.cwd {
                Some(cwd) => Ok(absolutize(cwd, p)),
                None => {
                    let cwd = std::env::current_dir().map_err(|_| ConfigError::MissingRepoDir {
                        path: p.to_path_buf(),
                    })?;
                    Ok(absolutize(&cwd, p))
                }
            }
        };

        let repo_dir = resolve(&self.repo_dir)?;
        if !repo_dir.is_dir() {
            return Err(ConfigError::MissingRepoDir { path: repo_dir }.into());
        }
        if !repo_dir.join(BUILD_DESCRIPTOR).is_file() {
            return Err(ConfigError::MissingBuildDescriptor { repo_dir }.into());
        }

        if self.flags.build_for_32bit && self.platform.is_cross() {
            return Err(ConfigError::Unsupported32Bit {
                platform: self.platform,
            }
            .into());
        }

        let build_dir = match &self.build_dir {
            Some(dir) => resolve(dir)?,
            None => repo_dir.join(BuildRequest::default_build_dir_name(
                self.platform,
                &self.arch,
                self.build_type,
                self.flags.build_for_32bit,
            )),
        };
        let install_dir = match &self.install_dir {
            Some(dir) => resolve(dir)?,
            None => build_dir.join("install"),
        };
        for path in [&repo_dir, &build_dir, &install_dir] {
            if path.to_str().is_none() {
                return Err(ConfigError::NonUtf8Path { path: path.clone() }.into());
            }
        }

        Ok(BuildRequest {
            platform: self.platform,
            arch: self.arch,
            build_type: self.build_type,
            sanitizer: self.sanitizer,
            paths: BuildPaths {
                repo_dir,
                build_dir,
                install_dir,
            },
            option_overrides: self.option_overrides,
            flags: self.flags,
            jobs: self.jobs,
        })
    }
}
