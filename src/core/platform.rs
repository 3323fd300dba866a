//! Host detection and the closed set of build platforms.
//!
//! Every per-platform fact (which hosts may build it, which SDK variable it
//! needs, how its build directory is labelled) is an exhaustive `match` on
//! [`Platform`], so adding a platform fails to compile until each of them
//! has an answer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operating system of the machine running the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostOs {
    Linux,
    Darwin,
    Windows,
}

impl HostOs {
    /// Map a `std::env::consts::OS` value to a host.
    pub fn from_os_name(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(HostOs::Linux),
            "macos" => Some(HostOs::Darwin),
            "windows" => Some(HostOs::Windows),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostOs::Linux => "Linux",
            HostOs::Darwin => "Darwin",
            HostOs::Windows => "Windows",
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build platform: the host itself, or one of the cross targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    /// Native build with the host compiler pair
    Host,
    /// Android NDK
    Android,
    /// GNU cross toolchains for embedded Linux boards
    #[serde(rename = "LINUX")]
    LinuxCross,
    /// OpenHarmony NDK
    Ohos,
    /// iOS devices via the Xcode toolchain
    Ios,
    /// Windows MSVC running under wine
    Windows,
}

impl Platform {
    /// All platforms, host first.
    pub const ALL: [Platform; 6] = [
        Platform::Host,
        Platform::Android,
        Platform::LinuxCross,
        Platform::Ohos,
        Platform::Ios,
        Platform::Windows,
    ];

    /// Platforms accepted by `cross_build`.
    pub const CROSS: [Platform; 5] = [
        Platform::Android,
        Platform::LinuxCross,
        Platform::Ohos,
        Platform::Ios,
        Platform::Windows,
    ];

    /// Name used on the command line and in build directory names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Host => "host",
            Platform::Android => "ANDROID",
            Platform::LinuxCross => "LINUX",
            Platform::Ohos => "OHOS",
            Platform::Ios => "IOS",
            Platform::Windows => "WINDOWS",
        }
    }

    pub fn is_cross(&self) -> bool {
        !matches!(self, Platform::Host)
    }

    /// Hosts on which this platform can be built.
    pub fn supported_hosts(&self) -> &'static [HostOs] {
        match self {
            Platform::Host | Platform::Android | Platform::Ohos => {
                &[HostOs::Linux, HostOs::Darwin, HostOs::Windows]
            }
            Platform::LinuxCross | Platform::Windows => &[HostOs::Linux],
            Platform::Ios => &[HostOs::Darwin],
        }
    }

    /// Environment variable naming the SDK root this platform needs.
    pub fn sdk_root_var(&self) -> Option<&'static str> {
        match self {
            Platform::Android => Some("NDK_ROOT"),
            Platform::Ohos => Some("OHOS_NDK_ROOT"),
            Platform::Windows => Some("MSVC_WINE_ROOT"),
            Platform::Host | Platform::LinuxCross | Platform::Ios => None,
        }
    }

    /// Where to obtain the SDK named by [`Platform::sdk_root_var`].
    pub fn sdk_hint(&self) -> &'static str {
        match self {
            Platform::Android => {
                "download the NDK from https://developer.android.com/ndk/downloads and export its path as NDK_ROOT"
            }
            Platform::Ohos => {
                "install the OpenHarmony NDK and export its path as OHOS_NDK_ROOT"
            }
            Platform::Windows => {
                "install msvc-wine (https://github.com/mstorsjo/msvc-wine) and export its path as MSVC_WINE_ROOT"
            }
            Platform::Host | Platform::LinuxCross | Platform::Ios => "",
        }
    }
}

/// Every SDK root variable known to the catalog, in a stable order.
pub fn sdk_root_vars() -> Vec<&'static str> {
    Platform::ALL
        .iter()
        .filter_map(|p| p.sdk_root_var())
        .collect()
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HOST" => Ok(Platform::Host),
            "ANDROID" => Ok(Platform::Android),
            "LINUX" | "LINUX_CROSS" => Ok(Platform::LinuxCross),
            "OHOS" => Ok(Platform::Ohos),
            "IOS" => Ok(Platform::Ios),
            "WINDOWS" => Ok(Platform::Windows),
            _ => Err(format!(
                "invalid platform '{}'; expected one of: ANDROID, LINUX, OHOS, IOS, WINDOWS",
                s
            )),
        }
    }
}

/// CMake build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildType {
    #[default]
    Release,
    Debug,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Release => "Release",
            BuildType::Debug => "Debug",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "release" => Ok(BuildType::Release),
            "debug" => Ok(BuildType::Debug),
            _ => Err(format!(
                "invalid build type '{}'; expected 'Release' or 'Debug'",
                s
            )),
        }
    }
}

/// Runtime memory-safety instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sanitizer {
    /// AddressSanitizer
    Asan,
    /// Hardware-assisted AddressSanitizer (aarch64 only)
    Hwasan,
}

impl Sanitizer {
    /// Value passed to `-fsanitize=`.
    pub fn fsanitize_value(&self) -> &'static str {
        match self {
            Sanitizer::Asan => "address",
            Sanitizer::Hwasan => "hwaddress",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sanitizer::Asan => "asan",
            Sanitizer::Hwasan => "hwasan",
        }
    }
}

impl fmt::Display for Sanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sanitizer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asan" | "address" => Ok(Sanitizer::Asan),
            "hwasan" | "hwaddress" => Ok(Sanitizer::Hwasan),
            _ => Err(format!(
                "invalid sanitizer '{}'; expected 'asan' or 'hwasan'",
                s
            )),
        }
    }
}

/// What the build step does after compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMode {
    /// `ninja install/strip`
    Strip,
    /// `ninja install`
    Plain,
    /// Build only; used when a single target is requested
    Skip,
}

impl InstallMode {
    /// Ninja target implementing this mode.
    pub fn ninja_target(&self) -> Option<&'static str> {
        match self {
            InstallMode::Strip => Some("install/strip"),
            InstallMode::Plain => Some("install"),
            InstallMode::Skip => None,
        }
    }
}
