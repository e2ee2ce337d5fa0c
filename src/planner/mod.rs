//! Upgrade planning.
//!
//! This module computes, for each project, the ordered list of installed
//! packages that must be upgraded, and exports those plans for the external
//! executor.

mod export;
mod ordering;
mod plan;

pub use export::{
    DOCUMENT_FILE, DocumentPackage, DocumentProject, UpgradeConfigExporter, UpgradeDocument,
    generate_run_id,
};
pub use ordering::UpgradePlanner;
pub use plan::{ProjectUpgradePlan, UpgradePlanSet};
