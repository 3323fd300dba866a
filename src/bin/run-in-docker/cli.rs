//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use cmake_one::container::Engine;

/// run-in-docker - replay a cmake-one command line inside the build container
#[derive(Parser)]
#[command(name = "run-in-docker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Container engine (docker, podman)
    #[arg(long, env = "CMAKE_ONE_ENGINE")]
    pub engine: Option<Engine>,

    /// Directory holding <image>/Dockerfile
    #[arg(long = "docker_dir", visible_alias = "docker-dir")]
    pub docker_dir: Option<PathBuf>,

    /// Do not mount the working directory into the container
    #[arg(long = "no_mount_workdir")]
    pub no_mount_workdir: bool,

    /// The cmake-one command line to replay, e.g. `host_build --build_dir out`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}
