//! Global context for cmake-one operations.
//!
//! Provides centralized access to the working directory, the user's home,
//! the bundled asset directory and the merged configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{global_config_dir, load_config, project_config_path, Config};

/// Overrides the bundled asset directory.
pub const HOME_ENV: &str = "CMAKE_ONE_HOME";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// The user's home directory, if one can be determined
    home: Option<PathBuf>,

    /// Directory holding `toolchains/` and `docker/`
    asset_dir: PathBuf,

    /// Merged global + project configuration
    config: Config,
}

impl GlobalContext {
    /// Create a new GlobalContext from the process environment.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Self::with_cwd(cwd)
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let home = directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf());
        let asset_dir = match std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_asset_dir()?,
        };
        let global = global_config_dir().map(|dir| dir.join("config.toml"));
        let config = load_config(global.as_deref(), &project_config_path(&cwd))?;

        Ok(Self::from_parts(cwd, home, asset_dir, config))
    }

    /// Create a context without touching the environment.
    pub fn from_parts(cwd: PathBuf, home: Option<PathBuf>, asset_dir: PathBuf, config: Config) -> Self {
        GlobalContext {
            cwd,
            home,
            asset_dir,
            config,
        }
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the user's home directory.
    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bundled toolchain files, unless configured elsewhere.
    pub fn toolchains_dir(&self) -> PathBuf {
        self.config
            .build
            .toolchains_dir
            .clone()
            .unwrap_or_else(|| self.asset_dir.join("toolchains"))
    }

    /// Bundled Dockerfiles, unless configured elsewhere.
    pub fn docker_dir(&self) -> PathBuf {
        self.config
            .container
            .docker_dir
            .clone()
            .unwrap_or_else(|| self.asset_dir.join("docker"))
    }
}

/// The directory containing the running executable.
fn default_asset_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate the cmake-one executable")?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}
