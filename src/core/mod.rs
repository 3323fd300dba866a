//! Core data structures for cmake-one.
//!
//! This module contains the foundational types the build pipeline works on:
//! - Host and target descriptions (`platform`, `catalog`)
//! - The validated request and the captured environment
//! - Path remapping between host and container
//! - The error taxonomy

pub mod catalog;
pub mod env;
pub mod errors;
pub mod platform;
pub mod remap;
pub mod request;

pub use catalog::{resolve_target, TargetDescriptor};
pub use env::Environment;
pub use errors::{BuildError, ConfigError, ExecutionError, PreconditionError};
pub use platform::{BuildType, HostOs, InstallMode, Platform, Sanitizer};
pub use remap::{PathRemap, RemapSet};
pub use request::{BuildFlags, BuildPaths, BuildRequest, OptionOverride};
