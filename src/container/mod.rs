//! Containerized replay of a cmake-one invocation.
//!
//! - `engine` - engine CLI, rootless check, image selection, tty policy
//! - `adapter` - path flag rewriting and `<engine> run` derivation

pub mod adapter;
pub mod engine;

pub use adapter::{
    rewrite_path_args, tokenize, wrap_for_container, BindMount, ContainerContext,
    ContainerInvocation, RewrittenArgs, PATH_FLAGS,
};
pub use engine::{build_image, image_for_host, Engine, ImageSpec, TerminalMode};
