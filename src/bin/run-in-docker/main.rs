//! run-in-docker CLI - run cmake-one inside a rootless build container

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cmake_one::container::{image_for_host, ContainerContext, TerminalMode};
use cmake_one::core::env::Environment;
use cmake_one::core::errors::BuildError;
use cmake_one::ops::run_in_container::run_in_container;
use cmake_one::util::diagnostic::report_error;
use cmake_one::util::process::{require_executable, SystemRunner};
use cmake_one::util::GlobalContext;

mod cli;

use cli::Cli;

const DEFAULT_INNER_COMMAND: &str = "cmake-one";

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        std::process::exit(report_error(&e, color));
    }
}

fn run(cli: Cli) -> Result<()> {
    let default = if cli.verbose { "cmake_one=debug" } else { "cmake_one=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let ctx = GlobalContext::new()?;
    let config = &ctx.config().container;
    let env = Environment::capture(ctx.toolchains_dir());

    // CLI/env > config > docker
    let engine = cli.engine.or(config.engine).unwrap_or_default();
    require_executable(engine.program()).map_err(BuildError::from)?;

    let docker_dir = cli.docker_dir.clone().unwrap_or_else(|| ctx.docker_dir());
    let host = env.host().map_err(BuildError::from)?;
    let image = image_for_host(host, &docker_dir).map_err(BuildError::from)?;

    let container = ContainerContext {
        engine,
        image,
        home: ctx.home().map(|p| p.to_path_buf()),
        cwd: ctx.cwd().to_path_buf(),
        mount_workdir: !cli.no_mount_workdir && config.mount_workdir.unwrap_or(true),
        forward_env: config.forward_env.clone(),
        terminal: TerminalMode::detect(&env),
        inner_command: config
            .inner_command
            .clone()
            .filter(|cmd| !cmd.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_INNER_COMMAND.to_string()]),
    };

    let invocation = run_in_container(&cli.args, &container, &env, &SystemRunner)?;
    tracing::debug!("container exited cleanly: {}", invocation.inner);
    Ok(())
}
