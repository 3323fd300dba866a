//! Implementation of `run-in-docker`.

use anyhow::Result;

use crate::container::{build_image, wrap_for_container, ContainerContext, ContainerInvocation};
use crate::core::env::Environment;
use crate::core::errors::{BuildError, ExecutionError};
use crate::util::process::Runner;

/// Replay `args` inside the build container.
///
/// The invocation is derived and validated first, then the engine must pass
/// the rootless check before the image is built or anything is mounted.
pub fn run_in_container(
    args: &[String],
    ctx: &ContainerContext,
    env: &Environment,
    runner: &dyn Runner,
) -> Result<ContainerInvocation> {
    let invocation = wrap_for_container(args, ctx, env)?;

    ctx.engine.ensure_rootless(runner)?;
    build_image(runner, ctx.engine, &ctx.image)?;

    invocation.create_mount_dirs()?;
    let cmd = invocation.run_command();
    tracing::info!("running: {}", cmd.display_command());
    let status = runner.run(&cmd)?;
    if !status.success() {
        return Err(BuildError::from(ExecutionError::from_status(cmd.display_command(), status)).into());
    }
    Ok(invocation)
}
