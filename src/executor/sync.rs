//! Reference synchronization after the executor finishes.

use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::planner::ProjectUpgradePlan;
use crate::project::ProjectInspector;

/// Replays a plan against a project's references.
///
/// Plans list consumers before their exclusive dependencies; references are
/// rewritten in the opposite order.
#[derive(Debug, Default)]
pub struct ReferenceSynchronizer;

impl ReferenceSynchronizer {
    /// Creates a new synchronizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rewrites the project's references to match the planned packages.
    ///
    /// # Errors
    ///
    /// Returns an error if the inspector fails to rewrite the project.
    pub async fn sync<I: ProjectInspector + ?Sized>(
        &self,
        inspector: &I,
        solution_root: &Path,
        plan: &ProjectUpgradePlan,
    ) -> Result<()> {
        let ordered = plan.rewrite_order();
        debug!(
            "Synchronizing {} reference(s) in {}",
            ordered.len(),
            plan.project.display()
        );
        inspector
            .rewrite_references(&plan.project, solution_root, &ordered)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;
    use crate::project::MockProjectInspector;
    use mockall::predicate::eq;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn plan() -> ProjectUpgradePlan {
        ProjectUpgradePlan::new(
            Path::new("/src/Web/Web.csproj"),
            vec![
                Package::new("A", "2.0"),
                Package::new("B", "2.0"),
                Package::new("D", "2.0"),
            ],
            HashSet::new(),
        )
    }

    #[tokio::test]
    async fn test_sync_passes_reversed_plan() {
        let mut inspector = MockProjectInspector::new();
        inspector
            .expect_rewrite_references()
            .with(
                eq(PathBuf::from("/src/Web/Web.csproj")),
                eq(PathBuf::from("/src")),
                eq(vec![
                    Package::new("D", "2.0"),
                    Package::new("B", "2.0"),
                    Package::new("A", "2.0"),
                ]),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));

        ReferenceSynchronizer::new()
            .sync(&inspector, Path::new("/src"), &plan())
            .await
            .expect("sync");
    }

    #[test]
    fn test_reversal_is_an_involution() {
        let plan = plan();
        let mut twice = plan.rewrite_order();
        twice.reverse();
        assert_eq!(twice, plan.packages);
    }
}
