// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Upgrade Pilot
//!
//! Plans and drives an in-place upgrade of a package family across the
//! projects of a solution.
//!
//! ## Overview
//!
//! For every project that references the target family, the pilot:
//!
//! - Detects the installed family version from the project's references
//! - Resolves the installed and target package trees
//! - Plans which already-installed packages to upgrade, and in which order
//! - Hands every plan to an external updater script through one document
//! - Waits for the script's result through marker files
//! - Rewrites project references in reverse planning order
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`package`]: Package trees and cached resolution
//! - [`project`]: Candidate project discovery and reference matching
//! - [`planner`]: Upgrade ordering and document export
//! - [`executor`]: Updater script launch, completion handshake and reference sync
//! - [`tools`]: External adapter and package manager clients
//! - [`upgrade`]: End-to-end upgrade runner
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! tools:
//!   adapter:
//!     program: upgrade-adapter
//! executor:
//!   host:
//!     program: pwsh
//!     args: [-NoProfile, -File]
//!   script: Updater.ps1
//!   max_wait_secs: 3600
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod package;
pub mod planner;
pub mod project;
pub mod tools;
pub mod upgrade;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, UpgradeConfig};
pub use error::{Result, UpgradeError};
pub use executor::{CompletionMonitor, CompletionOutcome, ReferenceSynchronizer};
pub use package::{CachedResolver, Package, TreeResolver};
pub use planner::{ProjectUpgradePlan, UpgradeConfigExporter, UpgradePlanSet, UpgradePlanner};
pub use upgrade::{UpgradeOptions, UpgradeReport, UpgradeRunner};
