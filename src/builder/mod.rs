//! CMake/Ninja build configuration.
//!
//! Turns a [`BuildRequest`](crate::core::BuildRequest) into a resolved
//! configuration and the `config.sh` script that carries it out.

pub mod defines;
pub mod flags;
pub mod script;

pub use defines::DefineSet;
pub use flags::{resolve, resolve_flags, ResolvedConfig};
pub use script::{emit, BuildScript, ScriptStep};
