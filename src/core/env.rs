//! Snapshot of the process environment a build is resolved against.
//!
//! Resolution never reads `std::env` directly; it reads an [`Environment`]
//! captured once at startup. Tests build one by hand.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::errors::PreconditionError;
use crate::core::platform::HostOs;

/// Prefix under which the container adapter forwards the host's value of an
/// SDK root variable.
pub const PREFIX_ENV: &str = "CMAKE_ONE_PREFIX_";

/// Name of the prefixed variable carrying the host path of `var`.
pub fn prefixed_var(var: &str) -> String {
    format!("{}{}", PREFIX_ENV, var)
}

/// Captured host facts and environment variables.
#[derive(Debug, Clone)]
pub struct Environment {
    host_os_name: String,
    host_arch: String,
    vars: BTreeMap<String, String>,
    toolchains_dir: PathBuf,
}

impl Environment {
    /// Capture the current process environment.
    pub fn capture(toolchains_dir: impl Into<PathBuf>) -> Self {
        Environment {
            host_os_name: std::env::consts::OS.to_string(),
            host_arch: std::env::consts::ARCH.to_string(),
            // variables that are not valid UTF-8 cannot name an SDK or a prefix
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
            toolchains_dir: toolchains_dir.into(),
        }
    }

    /// An empty environment on the given host.
    pub fn new(host: HostOs, host_arch: impl Into<String>, toolchains_dir: impl Into<PathBuf>) -> Self {
        let host_os_name = match host {
            HostOs::Linux => "linux",
            HostOs::Darwin => "macos",
            HostOs::Windows => "windows",
        };
        Environment {
            host_os_name: host_os_name.to_string(),
            host_arch: host_arch.into(),
            vars: BTreeMap::new(),
            toolchains_dir: toolchains_dir.into(),
        }
    }

    /// Set a variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// The detected host, or a precondition error on an unsupported one.
    pub fn host(&self) -> Result<HostOs, PreconditionError> {
        HostOs::from_os_name(&self.host_os_name).ok_or_else(|| PreconditionError::UnsupportedHost {
            os: self.host_os_name.clone(),
        })
    }

    /// Architecture of the host (`std::env::consts::ARCH` spelling).
    pub fn host_arch(&self) -> &str {
        &self.host_arch
    }

    /// Look up a variable. Empty values count as unset.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Directory holding the bundled `*.toolchain.cmake` files.
    pub fn toolchains_dir(&self) -> &Path {
        &self.toolchains_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_unset() {
        let env = Environment::new(HostOs::Linux, "x86_64", "/opt/toolchains")
            .with_var("NDK_ROOT", "")
            .with_var("OHOS_NDK_ROOT", "/opt/ohos");
        assert_eq!(env.var("NDK_ROOT"), None);
        assert_eq!(env.var("OHOS_NDK_ROOT"), Some("/opt/ohos"));
    }

    #[test]
    fn unknown_host_is_a_precondition_error() {
        let mut env = Environment::new(HostOs::Linux, "x86_64", "/t");
        env.host_os_name = "haiku".into();
        assert!(matches!(
            env.host(),
            Err(PreconditionError::UnsupportedHost { ref os }) if os == "haiku"
        ));
    }

    #[test]
    fn prefixed_names() {
        assert_eq!(prefixed_var("NDK_ROOT"), "CMAKE_ONE_PREFIX_NDK_ROOT");
    }
}
