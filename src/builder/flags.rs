//! Flag resolver: build request + target descriptor → resolved configuration.
//!
//! Rules are applied in a fixed order:
//!
//! 1. compiler selection (host compiler pair, or the cross toolchain file),
//! 2. debug symbols, for every build type,
//! 3. the 32-bit narrowing flag for host builds,
//! 4. sanitizer compile and link flags,
//! 5. user `KEY=VALUE` overrides, last and unvalidated,
//! 6. compile-command export, always on,
//! 7. install suppression when a single target is requested.
//!
//! The result is an immutable [`ResolvedConfig`]; the same input always
//! yields the same value.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::defines::{Define, DefineSet};
use crate::core::catalog::{resolve_target, TargetDescriptor};
use crate::core::env::{prefixed_var, Environment};
use crate::core::errors::{BuildError, ConfigError, PreconditionError};
use crate::core::platform::{BuildType, HostOs, InstallMode, Platform, Sanitizer};
use crate::core::remap::{PathRemap, RemapSet};
use crate::core::request::{BuildPaths, BuildRequest};
use crate::util::hash::Fingerprint;

/// Build tool driven by the generated script.
pub const NINJA: &str = "ninja";

/// CMake generator matching [`NINJA`].
pub const GENERATOR: &str = "Ninja";

/// Invocation record written by `CMAKE_EXPORT_COMPILE_COMMANDS`.
pub const COMPILE_COMMANDS: &str = "compile_commands.json";

/// Xcode's clang, used as the iOS assembler.
const XCODE_CLANG: &str =
    "/Applications/Xcode.app/Contents/Developer/Toolchains/XcodeDefault.xctoolchain/usr/bin/clang";

/// Flags always added to compilation, whatever the build type.
const DEBUG_SYMBOL_FLAGS: &[&str] = &["-g"];

/// Ninja switches besides the install target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BuildToolArgs {
    pub verbose: bool,
    pub explain: bool,
    pub jobs: Option<u32>,
    pub target: Option<String>,
}

/// Compile and link flags contributed by a sanitizer choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizerFlags {
    pub compile: Vec<String>,
    pub link: Vec<String>,
}

/// A fully resolved native build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedConfig {
    pub platform: Platform,
    pub arch: String,
    pub host: HostOs,
    pub build_type: BuildType,
    pub sanitizer: Option<Sanitizer>,
    pub paths: BuildPaths,
    /// Compiler or toolchain-file selection
    pub toolchain_flags: Vec<Define>,
    /// Contents of `CMAKE_C_FLAGS` / `CMAKE_CXX_FLAGS`
    pub compiler_flags: Vec<String>,
    /// Contents of `CMAKE_EXE_LINKER_FLAGS` / `CMAKE_SHARED_LINKER_FLAGS`
    pub linker_flags: Vec<String>,
    /// Every resolver-owned cache entry, in command-line order
    pub defines: Vec<Define>,
    /// User overrides, appended after `defines`
    pub option_overrides: Vec<Define>,
    pub install_mode: InstallMode,
    /// SDK root variables the configure step depends on
    pub required_env_vars: Vec<String>,
    /// Script sourced before configuring
    pub bootstrap: Option<PathBuf>,
    pub build_tool: BuildToolArgs,
    /// Rewrites applied to the invocation record after configuring
    pub record_remaps: Vec<PathRemap>,
    pub link_build_and_install: bool,
}

impl ResolvedConfig {
    /// Arguments for `cmake`, excluding the program itself.
    pub fn configure_args(&self) -> Vec<String> {
        let mut args = vec![
            "-G".to_string(),
            GENERATOR.to_string(),
            "-S".to_string(),
            self.paths.repo_dir.display().to_string(),
            "-B".to_string(),
            self.paths.build_dir.display().to_string(),
        ];
        args.extend(self.defines.iter().map(Define::to_arg));
        args.extend(self.option_overrides.iter().map(Define::to_arg));
        args
    }

    /// Arguments for `ninja`, excluding the program itself.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(target) = self.install_mode.ninja_target() {
            args.push(target.to_string());
        }
        if self.build_tool.verbose || self.build_tool.explain {
            args.push("-v".to_string());
        }
        if self.build_tool.explain {
            args.push("-d".to_string());
            args.push("explain".to_string());
        }
        if let Some(jobs) = self.build_tool.jobs {
            args.push(format!("-j{}", jobs));
        }
        if let Some(ref target) = self.build_tool.target {
            args.push(target.clone());
        }
        args
    }

    /// Short stable digest of everything that reaches the script.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(self.host.as_str())
            .update_strs(self.configure_args().iter().map(String::as_str))
            .update_str("--")
            .update_strs(self.build_args().iter().map(String::as_str))
            .update_opt(self.bootstrap.as_ref().and_then(|p| p.to_str()))
            .update_str(if self.link_build_and_install { "link" } else { "nolink" });
        for remap in &self.record_remaps {
            fp.update_str(&remap.from().display().to_string())
                .update_str(&remap.to().display().to_string());
        }
        fp.finish_short()
    }
}

/// Resolve the target for `request` and then its flags.
pub fn resolve(request: &BuildRequest, env: &Environment) -> Result<ResolvedConfig, BuildError> {
    let target = resolve_target(request.platform, &request.arch, env)?;
    resolve_flags(request, &target, env)
}

/// Compute the full configuration for an already resolved target.
pub fn resolve_flags(
    request: &BuildRequest,
    target: &TargetDescriptor,
    env: &Environment,
) -> Result<ResolvedConfig, BuildError> {
    if request.platform != target.platform || request.arch != target.arch {
        return Err(BuildError::Unreachable(format!(
            "request for {}-{} resolved against descriptor {}-{}",
            request.platform, request.arch, target.platform, target.arch
        )));
    }

    // 1. compiler selection
    let toolchain_flags = toolchain_flags(target)?;

    // 2. debug symbols, never stripped at compile time
    let mut compiler_flags: Vec<String> = DEBUG_SYMBOL_FLAGS.iter().map(|s| s.to_string()).collect();

    // 3. 32-bit host narrowing
    if request.flags.build_for_32bit {
        if target.platform.is_cross() {
            return Err(ConfigError::Unsupported32Bit {
                platform: target.platform,
            }
            .into());
        }
        compiler_flags.push(narrow_32bit_flag(target.host).to_string());
    }

    // 4. sanitizer
    if request.sanitizer == Some(Sanitizer::Hwasan) && target.arch != "aarch64" {
        return Err(ConfigError::UnsupportedSanitizer {
            sanitizer: Sanitizer::Hwasan,
            platform: target.platform,
            arch: target.arch.clone(),
        }
        .into());
    }
    let sanitizer = sanitizer_flags(request.sanitizer, target.platform);
    compiler_flags.extend(sanitizer.compile);
    let linker_flags = sanitizer.link;

    // 6. invocation record export, then the frozen flag variables
    let mut defines = DefineSet::new();
    defines.extend(toolchain_flags.iter().cloned())?;
    defines.set(Define::new(
        "CMAKE_INSTALL_PREFIX",
        request.paths.install_dir.display().to_string(),
    ))?;
    defines.set(Define::new("CMAKE_BUILD_TYPE", request.build_type.as_str()))?;
    defines.set(Define::bool("CMAKE_EXPORT_COMPILE_COMMANDS", true))?;
    let joined = compiler_flags.join(" ");
    defines.set(Define::new("CMAKE_C_FLAGS", joined.clone()))?;
    defines.set(Define::new("CMAKE_CXX_FLAGS", joined))?;
    if !linker_flags.is_empty() {
        let joined = linker_flags.join(" ");
        defines.set(Define::new("CMAKE_EXE_LINKER_FLAGS", joined.clone()))?;
        defines.set(Define::new("CMAKE_SHARED_LINKER_FLAGS", joined))?;
    }

    // 5. user overrides go after everything the resolver owns
    let option_overrides: Vec<Define> = request.option_overrides.iter().map(Define::from).collect();
    if !option_overrides.is_empty() {
        tracing::debug!(
            "user CMake overrides: {}",
            option_overrides
                .iter()
                .map(Define::to_arg)
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    // 7. install mode
    let install_mode = if request.flags.single_target.is_some() {
        tracing::debug!("single target requested, skipping the install step");
        InstallMode::Skip
    } else if !request.flags.strip_install || !supports_strip(target) {
        InstallMode::Plain
    } else {
        InstallMode::Strip
    };

    Ok(ResolvedConfig {
        platform: target.platform,
        arch: target.arch.clone(),
        host: target.host,
        build_type: request.build_type,
        sanitizer: request.sanitizer,
        paths: request.paths.clone(),
        toolchain_flags,
        compiler_flags,
        linker_flags,
        defines: defines.into_vec(),
        option_overrides,
        install_mode,
        required_env_vars: target
            .platform
            .sdk_root_var()
            .map(|v| vec![v.to_string()])
            .unwrap_or_default(),
        bootstrap: target.bootstrap.clone(),
        build_tool: BuildToolArgs {
            verbose: request.flags.verbose,
            explain: request.flags.explain,
            jobs: request.jobs,
            target: request.flags.single_target.clone(),
        },
        record_remaps: record_remaps(target.platform, env)?.into_vec(),
        link_build_and_install: request.flags.link_build_and_install,
    })
}

/// Sanitizer contributions for `platform`.
///
/// Android links the sanitizer runtime statically; every other platform
/// links it as a shared library.
pub fn sanitizer_flags(sanitizer: Option<Sanitizer>, platform: Platform) -> SanitizerFlags {
    let Some(sanitizer) = sanitizer else {
        return SanitizerFlags::default();
    };
    let fsanitize = format!("-fsanitize={}", sanitizer.fsanitize_value());
    let runtime = match platform {
        Platform::Android => "-static-libsan",
        Platform::Host
        | Platform::LinuxCross
        | Platform::Ohos
        | Platform::Ios
        | Platform::Windows => "-shared-libsan",
    };
    SanitizerFlags {
        compile: vec![fsanitize.clone(), "-fno-omit-frame-pointer".to_string()],
        link: vec![fsanitize, runtime.to_string()],
    }
}

/// Flag that narrows a host build to 32-bit.
pub fn narrow_32bit_flag(host: HostOs) -> &'static str {
    match host {
        HostOs::Linux | HostOs::Darwin => "-m32",
        HostOs::Windows => "--target=i686-pc-windows-msvc",
    }
}

fn supports_strip(target: &TargetDescriptor) -> bool {
    match target.platform {
        Platform::Ios | Platform::Windows => false,
        Platform::Host => target.host != HostOs::Windows,
        Platform::Android | Platform::LinuxCross | Platform::Ohos => true,
    }
}

fn toolchain_flags(target: &TargetDescriptor) -> Result<Vec<Define>, BuildError> {
    if target.platform == Platform::Host {
        let (cc, cxx) = match target.host {
            HostOs::Linux | HostOs::Darwin => ("clang", "clang++"),
            HostOs::Windows => ("clang-cl.exe", "clang-cl.exe"),
        };
        return Ok(vec![
            Define::new("CMAKE_C_COMPILER", cc),
            Define::new("CMAKE_CXX_COMPILER", cxx),
        ]);
    }

    let (Some(file), Some(abi)) = (target.toolchain_file.as_ref(), target.abi.as_deref()) else {
        return Err(BuildError::Unreachable(format!(
            "cross target {}-{} has no toolchain file or ABI",
            target.platform, target.arch
        )));
    };
    let file = file.display().to_string();
    let mut flags = vec![Define::new("CMAKE_TOOLCHAIN_FILE", file.clone())];

    match target.platform {
        Platform::Android => {
            let api = target.min_api_level.ok_or_else(|| {
                BuildError::Unreachable(format!("android {} has no API level", target.arch))
            })?;
            flags.push(Define::new("ANDROID_ABI", abi));
            flags.push(Define::new("ANDROID_NATIVE_API_LEVEL", api.to_string()));
        }
        Platform::Ohos => {
            flags.push(Define::new("OHOS_STL", "c++_static"));
            flags.push(Define::new("OHOS_ARCH", abi));
            flags.push(Define::new("OHOS_PLATFORM", "OHOS"));
        }
        Platform::Ios => {
            flags.push(Define::new("IOS_TOOLCHAIN_ROOT", file));
            flags.push(Define::new("OS_PLATFORM", "OS"));
            flags.push(Define::new("XCODE_IOS_PLATFORM", "iphoneos"));
            flags.push(Define::new("IOS_ARCH", abi));
            flags.push(Define::new("CMAKE_ASM_COMPILER", XCODE_CLANG));
            flags.push(Define::new("CMAKE_MAKE_PROGRAM", NINJA));
        }
        Platform::LinuxCross | Platform::Windows => {}
        Platform::Host => {
            return Err(BuildError::Unreachable("host handled above".to_string()));
        }
    }
    Ok(flags)
}

/// Invocation-record rewrite signalled by the `CMAKE_ONE_PREFIX_*` marker
/// of the target's own SDK variable.
fn record_remaps(platform: Platform, env: &Environment) -> Result<RemapSet, BuildError> {
    let mut set = RemapSet::new();
    let Some(var) = platform.sdk_root_var() else {
        return Ok(set);
    };
    let prefixed = prefixed_var(var);
    if let (Some(seen_here), Some(seen_by_consumer)) = (env.var(var), env.var(&prefixed)) {
        let remap = PathRemap::new(
            absolute_var(var, seen_here)?,
            absolute_var(&prefixed, seen_by_consumer)?,
        )?;
        if !remap.is_identity() {
            tracing::debug!(
                "{} rewrites {} -> {}",
                prefixed,
                remap.from().display(),
                remap.to().display()
            );
            set.insert(remap)?;
        }
    }
    Ok(set)
}

fn absolute_var<'a>(var: &str, value: &'a str) -> Result<&'a Path, PreconditionError> {
    let path = Path::new(value);
    if path.has_root() {
        Ok(path)
    } else {
        Err(PreconditionError::MalformedEnvVar {
            var: var.to_string(),
            reason: format!("`{}` is not an absolute path", value),
        })
    }
}
