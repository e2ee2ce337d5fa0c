//! Project discovery and reference inspection.
//!
//! This module finds the projects that reference the target package family
//! and detects the family version each of them has installed.

mod inspector;
mod references;

pub use inspector::{
    InputKind, ProjectInspector, classify_input, containing_dir, find_projects_to_upgrade,
};
pub use references::ReferenceMatcher;

#[cfg(test)]
pub use inspector::MockProjectInspector;
