//! Upgrade ordering for a single project.
//!
//! The package manager refuses to upgrade a package that is only installed as
//! someone else's dependency until the packages depending on it have been
//! processed. The planner walks the target tree breadth-first and defers
//! dependencies that the installed tree reaches through one of the root's
//! direct children, so consumers are planned ahead of their transitive
//! dependencies. A package reachable through several paths is planned once,
//! at its first dequeue.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use tracing::debug;

use crate::package::Package;

use super::plan::ProjectUpgradePlan;

/// Computes per-project upgrade plans.
#[derive(Debug, Default)]
pub struct UpgradePlanner;

impl UpgradePlanner {
    /// Creates a new planner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Plans the upgrade of `project` from `current` to `target`.
    ///
    /// `is_present` answers whether a package is already referenced by the
    /// project; absent packages are traversed but never planned.
    pub fn plan<F>(
        &self,
        project: &Path,
        current: &Package,
        target: &Package,
        mut is_present: F,
    ) -> ProjectUpgradePlan
    where
        F: FnMut(&Package) -> bool,
    {
        let mut visited: HashSet<String> = HashSet::new();
        let mut packages: Vec<Package> = Vec::new();
        let mut queue: VecDeque<&Package> = VecDeque::from([target]);

        while let Some(package) = queue.pop_front() {
            if !visited.insert(package.id.clone()) {
                continue;
            }

            if is_present(package) {
                debug!("{}: planning {package}", project.display());
                packages.push(Package::new(&package.id, &package.version));
            }

            let (nested, direct): (Vec<&Package>, Vec<&Package>) = package
                .dependencies
                .iter()
                .partition(|d| current.has_second_level_dependency(&d.id));

            queue.extend(direct);
            queue.extend(nested);
        }

        ProjectUpgradePlan::new(project, packages, visited)
    }
}
