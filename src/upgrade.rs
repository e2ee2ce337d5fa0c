//! Upgrade runner driving one invocation end to end.
//!
//! The runner finds the projects referencing the target family, resolves
//! package trees and plans every project, installs the target package, hands
//! the plans to the external executor and, once it reports success,
//! synchronizes project references. The first fatal error ends the run.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::UpgradeConfig;
use crate::error::{ExternalError, InputError, Result};
use crate::executor::{
    CompletionMonitor, CompletionOutcome, ReferenceSynchronizer, UpgradeExecutor,
};
use crate::package::{Package, TreeResolver};
use crate::planner::{
    ProjectUpgradePlan, UpgradeConfigExporter, UpgradeDocument, UpgradePlanSet, UpgradePlanner,
};
use crate::project::{
    ProjectInspector, ReferenceMatcher, containing_dir, find_projects_to_upgrade,
};
use crate::tools::PackageManager;

/// Options for a full upgrade.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpgradeOptions {
    /// Leave project references untouched after the executor finishes.
    pub skip_sync: bool,
}

/// Outcome of a successful upgrade.
#[derive(Debug, Clone)]
pub struct UpgradeReport {
    /// Plans handed to the executor.
    pub plans: UpgradePlanSet,
    /// Document written for the executor.
    pub document: UpgradeDocument,
    /// Number of projects whose references were synchronized.
    pub synchronized: usize,
}

/// Runs upgrades against external collaborators.
pub struct UpgradeRunner<'a> {
    /// Configuration.
    config: &'a UpgradeConfig,
    /// Solution and project inspection.
    inspector: &'a dyn ProjectInspector,
    /// Package tree resolution.
    resolver: &'a dyn TreeResolver,
    /// Restore and install actions.
    package_manager: &'a dyn PackageManager,
    /// External executor.
    executor: &'a dyn UpgradeExecutor,
    /// Family reference matching.
    matcher: ReferenceMatcher,
    /// Per-project planner.
    planner: UpgradePlanner,
}

impl<'a> UpgradeRunner<'a> {
    /// Creates a new runner.
    #[must_use]
    pub fn new(
        config: &'a UpgradeConfig,
        inspector: &'a dyn ProjectInspector,
        resolver: &'a dyn TreeResolver,
        package_manager: &'a dyn PackageManager,
        executor: &'a dyn UpgradeExecutor,
    ) -> Self {
        Self {
            config,
            inspector,
            resolver,
            package_manager,
            executor,
            matcher: ReferenceMatcher::new(&config.package),
            planner: UpgradePlanner::new(),
        }
    }

    /// Computes the plans for `input` without any external action.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is invalid, no project references the
    /// family, or a package tree cannot be resolved.
    pub async fn plan(&self, input: &Path, version: &str) -> Result<UpgradePlanSet> {
        let projects = self.projects(input).await?;
        let target = self.resolve_target(version).await?;
        self.plan_projects(&projects, &target).await
    }

    /// Runs a full upgrade of `input` to `version`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: invalid input, failed resolution, a
    /// failed package manager action, an export failure, an executor
    /// failure or a failed reference rewrite.
    pub async fn upgrade(
        &self,
        input: &Path,
        version: &str,
        options: UpgradeOptions,
    ) -> Result<UpgradeReport> {
        let projects = self.projects(input).await?;
        let target = self.resolve_target(version).await?;

        // Every tree is resolved before the first package manager action.
        let plans = self.plan_projects(&projects, &target).await?;

        let solution_dir = containing_dir(input);
        self.package_manager.restore(input).await?;
        self.package_manager
            .install(&target.id, &target.version, &solution_dir)
            .await?;

        let exporter = UpgradeConfigExporter::new(&self.config.executor.work_dir);
        let document = exporter.export(&plans).await?;

        self.run_executor(input, exporter.path()).await?;

        let synchronized = if options.skip_sync {
            info!("Skipping reference synchronization");
            0
        } else {
            self.synchronize(&plans, &solution_dir).await?
        };

        info!(
            "Successfully updated '{}' to version '{}'",
            input.display(),
            version
        );

        Ok(UpgradeReport {
            plans,
            document,
            synchronized,
        })
    }

    async fn projects(&self, input: &Path) -> Result<Vec<PathBuf>> {
        let projects =
            find_projects_to_upgrade(self.inspector, &self.matcher, input, &self.config.projects)
                .await?;

        if projects.is_empty() {
            return Err(InputError::NoProjects {
                path: input.to_path_buf(),
                package: self.config.package.id.clone(),
            }
            .into());
        }
        Ok(projects)
    }

    async fn resolve_target(&self, version: &str) -> Result<Package> {
        info!(
            "Collecting {} package tree for version \"{version}\"...",
            self.config.package.id
        );
        self.resolver.resolve(&self.config.package.id, version).await
    }

    async fn plan_projects(
        &self,
        projects: &[PathBuf],
        target: &Package,
    ) -> Result<UpgradePlanSet> {
        let mut plans = UpgradePlanSet::new(&self.config.package.id, &target.version);
        for project in projects {
            plans.push(self.plan_project(project, target).await?);
        }
        Ok(plans)
    }

    async fn plan_project(&self, project: &Path, target: &Package) -> Result<ProjectUpgradePlan> {
        let references = self.inspector.references(project).await?;
        let Some(current_version) = self.matcher.detect_version(&references) else {
            warn!(
                "Skip upgrade for project: \"{}\". Current version was not detected.",
                project.display()
            );
            return Ok(ProjectUpgradePlan::skipped(
                project,
                "current version was not detected",
            ));
        };

        info!(
            "Detected version for \"{}\" - \"{current_version}\"",
            project.display()
        );
        let current = self
            .resolver
            .resolve(&self.config.package.id, &current_version)
            .await?;
        let installed = self.inspector.installed_packages(project).await?;

        let plan = self
            .planner
            .plan(project, &current, target, |p| installed.contains(&p.id));
        debug!("{}", plan);
        Ok(plan)
    }

    async fn run_executor(&self, input: &Path, document: &Path) -> Result<()> {
        let monitor = CompletionMonitor::from_config(&self.config.executor);
        monitor.clear_stale_result().await?;

        self.executor.launch(input, document).await?;
        let interval = Duration::from_millis(self.config.executor.poll_interval_ms);
        let outcome = tokio::select! {
            outcome = monitor.await_completion() => outcome,
            exited = self.watch_executor(monitor.result_path(), interval) => exited,
        };

        if let Err(e) = self.executor.shutdown().await {
            warn!("Failed to stop executor: {e}");
        }
        outcome?.into_result()
    }

    /// Resolves with an error once the executor has exited without leaving a
    /// result; never resolves otherwise.
    async fn watch_executor(
        &self,
        result_path: &Path,
        interval: Duration,
    ) -> Result<CompletionOutcome> {
        loop {
            tokio::time::sleep(interval).await;
            if self.executor.has_exited().await? {
                break;
            }
        }

        // The result may land just as the host exits.
        tokio::time::sleep(interval).await;
        if fs::try_exists(result_path).await.unwrap_or(false) {
            debug!("Executor exited after writing its result");
            return std::future::pending().await;
        }

        Err(ExternalError::ExecutorExited {
            path: result_path.to_path_buf(),
        }
        .into())
    }

    async fn synchronize(&self, plans: &UpgradePlanSet, solution_root: &Path) -> Result<usize> {
        let synchronizer = ReferenceSynchronizer::new();
        for plan in &plans.plans {
            synchronizer
                .sync(self.inspector, solution_root, plan)
                .await?;
        }
        Ok(plans.plans.len())
    }
}
