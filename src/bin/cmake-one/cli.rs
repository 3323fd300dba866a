//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use cmake_one::core::platform::{BuildType, Platform, Sanitizer};

/// cmake-one - one command line for host and cross CMake/Ninja builds
#[derive(Parser)]
#[command(name = "cmake-one")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cross build for another OS and architecture
    #[command(name = "cross_build", alias = "cross-build")]
    CrossBuild(CrossBuildArgs),

    /// Build for the host
    #[command(name = "host_build", alias = "host-build")]
    HostBuild(HostBuildArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Flags shared by both build sub-commands.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// CMake project root (must contain CMakeLists.txt)
    #[arg(long = "repo_dir", visible_alias = "repo-dir", default_value = ".")]
    pub repo_dir: PathBuf,

    /// Build directory (default: <repo_dir>/build-<platform>-<arch>-<type>)
    #[arg(long = "build_dir", visible_alias = "build-dir")]
    pub build_dir: Option<PathBuf>,

    /// Install prefix (default: <build_dir>/install)
    #[arg(long = "install_dir", visible_alias = "install-dir")]
    pub install_dir: Option<PathBuf>,

    /// Release or Debug
    #[arg(long = "build_type", visible_alias = "build-type", env = "CMAKE_ONE_BUILD_TYPE")]
    pub build_type: Option<BuildType>,

    /// Instrument with a sanitizer (asan, hwasan)
    #[arg(long)]
    pub sanitizer: Option<Sanitizer>,

    /// Parallel ninja jobs
    #[arg(short = 'j', long = "ninja_jobs", visible_alias = "jobs", env = "CMAKE_ONE_JOBS")]
    pub jobs: Option<u32>,

    /// Build only this ninja target (skips install)
    #[arg(long = "ninja_target", visible_alias = "ninja-target")]
    pub ninja_target: Option<String>,

    /// Run ninja with -v
    #[arg(long = "build_with_ninja_verbose")]
    pub ninja_verbose: bool,

    /// Run ninja with -v -d explain
    #[arg(long = "build_with_ninja_explain")]
    pub ninja_explain: bool,

    /// Extra cache entries as "KEY=VALUE KEY2=VALUE2" (repeatable)
    #[arg(long = "cmake_options", visible_alias = "cmake-options")]
    pub cmake_options: Vec<String>,

    /// Do not symlink build and install dirs into the repository
    #[arg(long = "not_do_link_build_and_install")]
    pub no_link: bool,

    /// Use `ninja install` even where `install/strip` is supported
    #[arg(long = "no_strip")]
    pub no_strip: bool,

    /// Delete the old build and install dirs first
    #[arg(long = "remove_old_build")]
    pub remove_old_build: bool,

    /// Directory holding the bundled *.toolchain.cmake files
    #[arg(long = "toolchains_dir", env = "CMAKE_ONE_TOOLCHAINS_DIR")]
    pub toolchains_dir: Option<PathBuf>,

    /// Print the resolved configuration and script as JSON, run nothing
    #[arg(long)]
    pub plan: bool,
}

#[derive(Args)]
pub struct CrossBuildArgs {
    /// Target OS: ANDROID, LINUX, OHOS, IOS, WINDOWS
    #[arg(long = "cross_build_target_os", visible_alias = "platform")]
    pub platform: Platform,

    /// Target architecture, e.g. aarch64, armv7-a, x86_64, rv64gcv
    #[arg(long = "cross_build_target_arch", visible_alias = "arch")]
    pub arch: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct HostBuildArgs {
    /// Build 32-bit binaries on a 64-bit host
    #[arg(long = "build_for_32bit")]
    pub build_for_32bit: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
