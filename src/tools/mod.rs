//! External tool clients.
//!
//! The adapter tool answers solution, project and package tree questions;
//! the package manager restores and installs packages before planning.

mod adapter;
mod package_manager;
mod process;

pub use adapter::AdapterTool;
#[cfg(test)]
pub use package_manager::MockPackageManager;
pub use package_manager::{CliPackageManager, PackageManager};
pub use process::{ProcessOutput, run_captured, run_streamed};
