//! Upgrade plan types.
//!
//! This module defines the per-project upgrade plan produced by the
//! [`UpgradePlanner`](super::UpgradePlanner) and the set of plans that is
//! exported for the external executor.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::package::Package;

/// Ordered upgrade actions for one project.
#[derive(Debug, Clone)]
pub struct ProjectUpgradePlan {
    /// Project file path.
    pub project: PathBuf,
    /// Packages to upgrade, in planning order.
    pub packages: Vec<Package>,
    /// Package ids visited while planning.
    pub visited: HashSet<String>,
    /// Why the project was not planned, if it was skipped.
    pub skip_reason: Option<String>,
}

/// All project plans of one upgrade run, in project enumeration order.
#[derive(Debug, Clone)]
pub struct UpgradePlanSet {
    /// Root package id of the target family.
    pub package_id: String,
    /// Version being upgraded to.
    pub target_version: String,
    /// Per-project plans.
    pub plans: Vec<ProjectUpgradePlan>,
}

impl ProjectUpgradePlan {
    /// Creates a plan from planner output.
    #[must_use]
    pub fn new(project: &Path, packages: Vec<Package>, visited: HashSet<String>) -> Self {
        Self {
            project: project.to_path_buf(),
            packages,
            visited,
            skip_reason: None,
        }
    }

    /// Creates an empty plan for a project that was not planned.
    #[must_use]
    pub fn skipped(project: &Path, reason: impl Into<String>) -> Self {
        Self {
            project: project.to_path_buf(),
            packages: Vec::new(),
            visited: HashSet::new(),
            skip_reason: Some(reason.into()),
        }
    }

    /// Returns true if nothing is planned for the project.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Returns the number of planned packages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.packages.len()
    }

    /// Project name as written to the upgrade document: the file stem.
    #[must_use]
    pub fn name(&self) -> String {
        project_name(&self.project)
    }

    /// Planned packages in reference rewrite order, dependencies first.
    #[must_use]
    pub fn rewrite_order(&self) -> Vec<Package> {
        self.packages.iter().rev().cloned().collect()
    }
}

impl UpgradePlanSet {
    /// Creates an empty plan set for a target.
    #[must_use]
    pub fn new(package_id: impl Into<String>, target_version: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            target_version: target_version.into(),
            plans: Vec::new(),
        }
    }

    /// Appends a project plan.
    pub fn push(&mut self, plan: ProjectUpgradePlan) {
        self.plans.push(plan);
    }

    /// Looks up the plan of a project.
    #[must_use]
    pub fn get(&self, project: &Path) -> Option<&ProjectUpgradePlan> {
        self.plans.iter().find(|p| p.project == project)
    }

    /// Total number of planned packages across projects.
    #[must_use]
    pub fn total_packages(&self) -> usize {
        self.plans.iter().map(ProjectUpgradePlan::len).sum()
    }

    /// Number of projects that were skipped.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.plans.iter().filter(|p| p.skip_reason.is_some()).count()
    }

    /// Returns true if no project has anything to upgrade.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.iter().all(ProjectUpgradePlan::is_empty)
    }

    /// Deterministic hash over the target and every planned entry.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.package_id.as_bytes());
        hasher.update([0]);
        hasher.update(self.target_version.as_bytes());

        for plan in &self.plans {
            hasher.update([1]);
            hasher.update(plan.project.to_string_lossy().as_bytes());
            for package in &plan.packages {
                hasher.update([2]);
                hasher.update(package.id.as_bytes());
                hasher.update([0]);
                hasher.update(package.version.as_bytes());
            }
        }

        hex::encode(hasher.finalize())
    }
}

/// Derives a project name from its file path.
fn project_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.to_string_lossy().to_string(), |s| s.to_string_lossy().to_string())
}

impl std::fmt::Display for ProjectUpgradePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(reason) = &self.skip_reason {
            return write!(f, "{}: skipped ({reason})", self.name());
        }

        write!(f, "{}: {} package(s)", self.name(), self.packages.len())?;
        for (i, package) in self.packages.iter().enumerate() {
            write!(f, "\n  {}. {package}", i + 1)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for UpgradePlanSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Upgrade plan for {} {} ({} projects):",
            self.package_id,
            self.target_version,
            self.plans.len()
        )?;
        for plan in &self.plans {
            writeln!(f, "{plan}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(project: &str, ids: &[&str]) -> ProjectUpgradePlan {
        ProjectUpgradePlan::new(
            Path::new(project),
            ids.iter().map(|id| Package::new(*id, "2.0")).collect(),
            ids.iter().map(|id| (*id).to_string()).collect(),
        )
    }

    #[test]
    fn test_rewrite_order_reversed_twice_is_identity() {
        let p = plan("src/Web/Web.csproj", &["A", "B", "C", "D"]);
        let mut twice = p.rewrite_order();
        twice.reverse();
        assert_eq!(twice, p.packages);
        assert_eq!(p.rewrite_order().first().map(|p| p.id.as_str()), Some("D"));
    }

    #[test]
    fn test_name_is_file_stem() {
        assert_eq!(plan("src/Web/Web.csproj", &[]).name(), "Web");
        assert_eq!(plan("Lib", &[]).name(), "Lib");
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let mut first = UpgradePlanSet::new("Acme", "14.1");
        first.push(plan("Web.csproj", &["A", "B"]));
        let mut second = UpgradePlanSet::new("Acme", "14.1");
        second.push(plan("Web.csproj", &["B", "A"]));

        assert_ne!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint(), first.clone().fingerprint());
    }

    #[test]
    fn test_skipped_plans_count_as_empty() {
        let mut set = UpgradePlanSet::new("Acme", "14.1");
        set.push(ProjectUpgradePlan::skipped(Path::new("Old.csproj"), "version not detected"));
        assert!(set.is_empty());
        assert_eq!(set.skipped_count(), 1);
        assert_eq!(set.total_packages(), 0);
        assert!(set.get(Path::new("Old.csproj")).is_some());
    }
}
