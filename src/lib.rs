//! cmake-one - reproducible CMake + Ninja builds for host and cross targets
//!
//! This crate provides the library behind the `cmake-one` and
//! `run-in-docker` binaries: target resolution, build script emission and
//! containerized replay.

pub mod builder;
pub mod container;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for cmake-one unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a recording process runner and on-disk SDK fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{BuildError, BuildRequest, Environment, Platform};
pub use util::context::GlobalContext;
