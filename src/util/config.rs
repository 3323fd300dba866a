//! Configuration file support for cmake-one.
//!
//! cmake-one supports two configuration file locations:
//! - Global: `~/.cmake-one/config.toml` - User-wide defaults
//! - Project: `.cmake-one/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! and `CMAKE_ONE_*` environment variables take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::container::Engine;
use crate::core::platform::BuildType;

/// Directory name used for both config locations.
pub const CONFIG_DIR_NAME: &str = ".cmake-one";

/// cmake-one configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Container settings
    pub container: ContainerConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default number of parallel ninja jobs (None = ninja decides)
    pub jobs: Option<u32>,

    /// Default build type
    pub build_type: Option<BuildType>,

    /// Directory holding the bundled `*.toolchain.cmake` files
    pub toolchains_dir: Option<PathBuf>,

    /// Symlink `build` and `install` into the repository
    pub link_build_and_install: Option<bool>,
}

/// Container-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// docker or podman
    pub engine: Option<Engine>,

    /// Directory holding `<image>/Dockerfile`
    pub docker_dir: Option<PathBuf>,

    /// Variables forwarded into the container by name
    pub forward_env: Vec<String>,

    /// Mount the working directory at the same path
    pub mount_workdir: Option<bool>,

    /// Command run inside the container (default `cmake-one`)
    pub inner_command: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Build settings
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.build_type.is_some() {
            self.build.build_type = other.build.build_type;
        }
        if other.build.toolchains_dir.is_some() {
            self.build.toolchains_dir = other.build.toolchains_dir;
        }
        if other.build.link_build_and_install.is_some() {
            self.build.link_build_and_install = other.build.link_build_and_install;
        }

        // Container settings
        if other.container.engine.is_some() {
            self.container.engine = other.container.engine;
        }
        if other.container.docker_dir.is_some() {
            self.container.docker_dir = other.container.docker_dir;
        }
        if !other.container.forward_env.is_empty() {
            self.container.forward_env = other.container.forward_env;
        }
        if other.container.mount_workdir.is_some() {
            self.container.mount_workdir = other.container.mount_workdir;
        }
        if other.container.inner_command.is_some() {
            self.container.inner_command = other.container.inner_command;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.cmake-one/config.toml)
/// 2. Global config (~/.cmake-one/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load(global_path)?);
        }
    }

    if project_path.exists() {
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}

/// Get the global cmake-one config directory (~/.cmake-one).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME))
}

/// Get the project config path (.cmake-one/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR_NAME).join("config.toml")
}
