//! Target catalog: the supported (platform, architecture) pairs and what
//! each one needs before it can be configured.
//!
//! Validation runs in a fixed order so failures are cheap and unambiguous:
//!
//! 1. the platform must be buildable on the detected host,
//! 2. the architecture must be listed for the platform,
//! 3. the platform's SDK root variable must be set,
//! 4. the toolchain file (and bootstrap script, if any) must exist on disk.
//!
//! Steps 1 and 2 never touch the environment variables or the filesystem.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::env::Environment;
use crate::core::errors::{BuildError, ConfigError, PreconditionError};
use crate::core::platform::{HostOs, Platform};

/// One architecture row of a platform table.
#[derive(Debug, Clone, Copy)]
struct ArchEntry {
    arch: &'static str,
    abi: &'static str,
    min_api_level: Option<u32>,
}

const fn arch(arch: &'static str, abi: &'static str, min_api_level: Option<u32>) -> ArchEntry {
    ArchEntry {
        arch,
        abi,
        min_api_level,
    }
}

const ANDROID_ARCHES: &[ArchEntry] = &[
    arch("x86_64", "x86_64", Some(21)),
    arch("i386", "x86", Some(16)),
    arch("aarch64", "arm64-v8a", Some(30)),
    arch("armv7-a", "armeabi-v7a with NEON", Some(30)),
];

const LINUX_CROSS_ARCHES: &[ArchEntry] = &[
    arch("aarch64", "aarch64-linux-gnu", None),
    arch("armv7-a", "arm-linux-gnueabihf", None),
    arch("rv64gcv", "riscv64-rvv-linux-gnu", None),
    arch("rv64norvv", "riscv64-linux-gnu", None),
];

const OHOS_ARCHES: &[ArchEntry] = &[arch("aarch64", "arm64-v8a", None)];

const IOS_ARCHES: &[ArchEntry] = &[arch("aarch64", "arm64", None), arch("armv7-a", "armv7", None)];

const WINDOWS_ARCHES: &[ArchEntry] = &[
    arch("x86_64", "x64", None),
    arch("i386", "x86", None),
    arch("aarch64", "arm64", None),
];

/// Toolchain file shipped with cmake-one for iOS.
pub const IOS_TOOLCHAIN_FILE: &str = "ios.toolchain.cmake";

/// Toolchain file shipped with cmake-one for msvc-wine.
pub const WINDOWS_TOOLCHAIN_FILE: &str = "windows-msvc-wine.toolchain.cmake";

/// Everything the flag resolver needs to know about a resolved target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TargetDescriptor {
    pub platform: Platform,
    pub arch: String,
    pub host: HostOs,
    /// `CMAKE_TOOLCHAIN_FILE`; `None` for host builds
    pub toolchain_file: Option<PathBuf>,
    /// ABI / triple / vendor arch name the toolchain expects
    pub abi: Option<String>,
    /// Minimum platform API level (Android only)
    pub min_api_level: Option<u32>,
    /// Script sourced before configuring (Windows under wine only)
    pub bootstrap: Option<PathBuf>,
}

/// Architectures accepted for `platform` on a machine whose native arch is
/// `host_arch`.
pub fn supported_arches(platform: Platform, host_arch: &str) -> Vec<String> {
    match platform {
        Platform::Host => vec![host_arch.to_string()],
        _ => arch_table(platform)
            .iter()
            .map(|e| e.arch.to_string())
            .collect(),
    }
}

fn arch_table(platform: Platform) -> &'static [ArchEntry] {
    match platform {
        Platform::Host => &[],
        Platform::Android => ANDROID_ARCHES,
        Platform::LinuxCross => LINUX_CROSS_ARCHES,
        Platform::Ohos => OHOS_ARCHES,
        Platform::Ios => IOS_ARCHES,
        Platform::Windows => WINDOWS_ARCHES,
    }
}

/// Every (platform, arch) pair the catalog offers on `host`.
pub fn supported_pairs(host: HostOs, host_arch: &str) -> Vec<(Platform, String)> {
    Platform::ALL
        .iter()
        .filter(|p| p.supported_hosts().contains(&host))
        .flat_map(|p| {
            supported_arches(*p, host_arch)
                .into_iter()
                .map(move |a| (*p, a))
        })
        .collect()
}

/// Resolve `platform`/`arch` to a descriptor, checking every prerequisite.
pub fn resolve_target(
    platform: Platform,
    arch: &str,
    env: &Environment,
) -> Result<TargetDescriptor, BuildError> {
    let host = env.host()?;
    if !platform.supported_hosts().contains(&host) {
        return Err(ConfigError::UnsupportedPlatform {
            platform,
            host,
            supported: platform.supported_hosts().to_vec(),
        }
        .into());
    }

    let entry = match platform {
        Platform::Host => {
            if arch != env.host_arch() {
                return Err(unsupported_arch(platform, arch, env));
            }
            None
        }
        _ => Some(
            *arch_table(platform)
                .iter()
                .find(|e| e.arch == arch)
                .ok_or_else(|| unsupported_arch(platform, arch, env))?,
        ),
    };

    let sdk_root = match platform.sdk_root_var() {
        Some(var) => Some(PathBuf::from(env.var(var).ok_or(
            PreconditionError::MissingEnvVar {
                var,
                platform,
                hint: platform.sdk_hint(),
            },
        )?)),
        None => None,
    };

    let bundled = |name: String| env.toolchains_dir().join(name);
    let (toolchain_file, bootstrap) = match (platform, &sdk_root, entry) {
        (Platform::Host, None, None) => (None, None),
        (Platform::Android, Some(root), Some(_)) => {
            (Some(root.join("build/cmake/android.toolchain.cmake")), None)
        }
        (Platform::Ohos, Some(root), Some(_)) => {
            (Some(root.join("build/cmake/ohos.toolchain.cmake")), None)
        }
        (Platform::LinuxCross, None, Some(e)) => {
            (Some(bundled(format!("{}.toolchain.cmake", e.abi))), None)
        }
        (Platform::Ios, None, Some(_)) => (Some(bundled(IOS_TOOLCHAIN_FILE.to_string())), None),
        (Platform::Windows, Some(root), Some(e)) => (
            Some(bundled(WINDOWS_TOOLCHAIN_FILE.to_string())),
            Some(root.join("bin").join(e.abi).join("msvcenv.sh")),
        ),
        (p, _, _) => {
            return Err(BuildError::Unreachable(format!(
                "catalog has no toolchain rule for {}-{}",
                p, arch
            )))
        }
    };

    if let Some(ref path) = toolchain_file {
        if !path.is_file() {
            return Err(ConfigError::MissingToolchainFile {
                platform,
                path: path.clone(),
            }
            .into());
        }
        tracing::debug!("using {} toolchain: {}", platform, path.display());
    }
    if let Some(ref path) = bootstrap {
        if !path.is_file() {
            return Err(ConfigError::MissingBootstrap {
                platform,
                path: path.clone(),
            }
            .into());
        }
    }

    Ok(TargetDescriptor {
        platform,
        arch: arch.to_string(),
        host,
        toolchain_file,
        abi: entry.map(|e| e.abi.to_string()),
        min_api_level: entry.and_then(|e| e.min_api_level),
        bootstrap,
    })
}

fn unsupported_arch(platform: Platform, arch: &str, env: &Environment) -> BuildError {
    ConfigError::UnsupportedArch {
        platform,
        arch: arch.to_string(),
        supported: supported_arches(platform, env.host_arch()),
    }
    .into()
}
