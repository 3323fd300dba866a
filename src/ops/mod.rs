//! High-level operations.
//!
//! This module contains the implementation of the cmake-one commands.

pub mod cmake_build;
pub mod run_in_container;

pub use cmake_build::{build, check_tools, plan, BuildOptions, BuildPlan};
pub use run_in_container::run_in_container;
