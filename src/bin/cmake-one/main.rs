//! cmake-one CLI - host and cross CMake/Ninja builds behind one command line

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cmake_one::util::diagnostic::report_error;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        std::process::exit(report_error(&e, color));
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging; RUST_LOG wins over -v
    let default = if cli.verbose { "cmake_one=debug" } else { "cmake_one=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::CrossBuild(args) => commands::build::execute_cross(args),
        Commands::HostBuild(args) => commands::build::execute_host(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
