//! `cmake-one cross_build` and `cmake-one host_build` commands

use anyhow::Result;

use crate::cli::{CommonArgs, CrossBuildArgs, HostBuildArgs};
use cmake_one::core::env::Environment;
use cmake_one::core::errors::BuildError;
use cmake_one::core::platform::Platform;
use cmake_one::core::request::{BuildFlags, BuildRequest, OptionOverride};
use cmake_one::ops::cmake_build::{build, check_tools, plan, BuildOptions};
use cmake_one::util::process::SystemRunner;
use cmake_one::util::GlobalContext;

pub fn execute_cross(args: CrossBuildArgs) -> Result<()> {
    if !Platform::CROSS.contains(&args.platform) {
        anyhow::bail!("HOST is not a cross target; use `cmake-one host_build`");
    }
    run(args.platform, Some(args.arch), false, args.common)
}

pub fn execute_host(args: HostBuildArgs) -> Result<()> {
    run(Platform::Host, None, args.build_for_32bit, args.common)
}

fn run(platform: Platform, arch: Option<String>, build_for_32bit: bool, args: CommonArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config = &ctx.config().build;

    let toolchains_dir = args.toolchains_dir.clone().unwrap_or_else(|| ctx.toolchains_dir());
    let env = Environment::capture(toolchains_dir);
    let arch = arch.unwrap_or_else(|| env.host_arch().to_string());

    let mut overrides = Vec::new();
    for list in &args.cmake_options {
        overrides.extend(OptionOverride::parse_list(list).map_err(BuildError::from)?);
    }

    let flags = BuildFlags {
        verbose: args.ninja_verbose,
        explain: args.ninja_explain,
        strip_install: !args.no_strip,
        single_target: args.ninja_target.clone(),
        build_for_32bit,
        link_build_and_install: !args.no_link && config.link_build_and_install.unwrap_or(true),
    };

    // CLI > config > default
    let build_type = args.build_type.or(config.build_type).unwrap_or_default();
    let jobs = args.jobs.or(config.jobs);

    let request = BuildRequest::builder(platform, arch, args.repo_dir.clone())
        .cwd(ctx.cwd())
        .build_dir(args.build_dir.clone())
        .install_dir(args.install_dir.clone())
        .build_type(build_type)
        .sanitizer(args.sanitizer)
        .option_overrides(overrides)
        .flags(flags)
        .jobs(jobs)
        .build()?;

    if args.plan {
        let plan = plan(&request, &env)?;
        println!("{}", plan.to_json()?);
        return Ok(());
    }

    check_tools()?;
    let opts = BuildOptions {
        remove_old_build: args.remove_old_build,
    };
    let result = build(&request, &env, &opts, &SystemRunner)?;

    for line in result.summary() {
        eprintln!("{}", line);
    }
    Ok(())
}
