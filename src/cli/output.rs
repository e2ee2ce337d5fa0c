//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{UpgradeConfig, ValidationResult};
use crate::executor::CompletionOutcome;
use crate::planner::{DocumentProject, ProjectUpgradePlan, UpgradePlanSet};
use crate::upgrade::UpgradeReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Planned package row for table display.
#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "#")]
    index: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Version")]
    version: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats per-project upgrade plans.
    #[must_use]
    pub fn format_plans(&self, plans: &UpgradePlanSet) -> String {
        match self.format {
            OutputFormat::Json => to_json(&PlansJson::from(plans)),
            OutputFormat::Text => Self::format_plans_text(plans),
        }
    }

    fn format_plans_text(plans: &UpgradePlanSet) -> String {
        let mut output = String::new();

        let _ = write!(
            output,
            "\nUpgrade plan: {} -> {}\n",
            plans.package_id.bold(),
            plans.target_version.bold()
        );
        let _ = write!(
            output,
            "   Fingerprint: {}\n\n",
            &plans.fingerprint()[..12]
        );

        let rows: Vec<PlanRow> = plans.plans.iter().flat_map(Self::plan_rows).collect();
        if !rows.is_empty() {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let _ = write!(
            output,
            "\nPlan: {} package(s) across {} project(s), {} skipped\n",
            plans.total_packages().to_string().green(),
            plans.plans.len(),
            plans.skipped_count().to_string().yellow()
        );

        output
    }

    fn plan_rows(plan: &ProjectUpgradePlan) -> Vec<PlanRow> {
        let name = plan.name();

        if let Some(reason) = &plan.skip_reason {
            return vec![PlanRow {
                project: name,
                index: String::from("-"),
                package: format!("skipped: {reason}").yellow().to_string(),
                version: String::new(),
            }];
        }

        if plan.is_empty() {
            return vec![PlanRow {
                project: name,
                index: String::from("-"),
                package: "nothing to upgrade".dimmed().to_string(),
                version: String::new(),
            }];
        }

        plan.packages
            .iter()
            .enumerate()
            .map(|(i, p)| PlanRow {
                project: if i == 0 { name.clone() } else { String::new() },
                index: (i + 1).to_string(),
                package: p.id.clone(),
                version: p.version.clone(),
            })
            .collect()
    }

    /// Formats the outcome of a full upgrade.
    #[must_use]
    pub fn format_report(&self, report: &UpgradeReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(&ReportJson {
                status: "success",
                run_id: &report.document.run_id,
                fingerprint: &report.document.fingerprint,
                synchronized: report.synchronized,
                projects: &report.document.projects,
            }),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Upgraded {} project(s) to {} {}\n",
                    "✓".green(),
                    report.plans.plans.len(),
                    report.plans.package_id,
                    report.plans.target_version
                );
                let _ = writeln!(output, "   Run: {}", report.document.run_id);
                let _ = writeln!(output, "   Packages: {}", report.plans.total_packages());
                let _ = writeln!(output, "   References synchronized: {}", report.synchronized);
                output
            }
        }
    }

    /// Formats a validation result with a configuration summary.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &UpgradeConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "valid": result.is_valid(),
                "warnings": result.warnings,
                "package": config.package.id,
                "work_dir": config.executor.work_dir,
            })),
            OutputFormat::Text => {
                let mut output = format!("{} Configuration is valid!\n", "✓".green());

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(output, "   Package: {}", config.package.id);
                let _ = writeln!(output, "   Adapter: {}", config.tools.adapter);
                let _ = writeln!(
                    output,
                    "   Package manager: {}",
                    config.tools.package_manager.display()
                );
                let _ = writeln!(output, "   Host: {}", config.executor.host);
                let _ = writeln!(output, "   Script: {}", config.executor.script.display());
                let _ = writeln!(output, "   Work dir: {}", config.executor.work_dir.display());
                output
            }
        }
    }

    /// Formats an executor outcome.
    #[must_use]
    pub fn format_outcome(&self, outcome: &CompletionOutcome) -> String {
        match (self.format, outcome) {
            (OutputFormat::Json, CompletionOutcome::Succeeded) => {
                to_json(&serde_json::json!({ "status": "success" }))
            }
            (OutputFormat::Json, CompletionOutcome::Failed(detail)) => {
                to_json(&serde_json::json!({ "status": "failed", "detail": detail }))
            }
            (OutputFormat::Text, CompletionOutcome::Succeeded) => {
                format!("{} Operation completed successfully\n", "✓".green())
            }
            (OutputFormat::Text, CompletionOutcome::Failed(detail)) => {
                format!("{} Upgrade script failed. {detail}\n", "✗".red())
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlansJson {
    package: String,
    target_version: String,
    fingerprint: String,
    total_packages: usize,
    projects: Vec<ProjectJson>,
}

#[derive(Serialize)]
struct ProjectJson {
    #[serde(flatten)]
    project: DocumentProject,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<String>,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    status: &'static str,
    run_id: &'a str,
    fingerprint: &'a str,
    synchronized: usize,
    projects: &'a [DocumentProject],
}

impl From<&UpgradePlanSet> for PlansJson {
    fn from(plans: &UpgradePlanSet) -> Self {
        Self {
            package: plans.package_id.clone(),
            target_version: plans.target_version.clone(),
            fingerprint: plans.fingerprint(),
            total_packages: plans.total_packages(),
            projects: plans
                .plans
                .iter()
                .map(|p| ProjectJson {
                    project: DocumentProject::from(p),
                    skipped: p.skip_reason.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;
    use std::collections::HashSet;
    use std::path::Path;

    fn plans() -> UpgradePlanSet {
        let mut plans = UpgradePlanSet::new("Acme.All", "2.0");
        plans.push(ProjectUpgradePlan::new(
            Path::new("/src/Web/Web.csproj"),
            vec![Package::new("Acme.All", "2.0"), Package::new("Acme.Core", "2.0")],
            HashSet::new(),
        ));
        plans.push(ProjectUpgradePlan::skipped(
            Path::new("/src/Old/Old.csproj"),
            "current version was not detected",
        ));
        plans
    }

    #[test]
    fn test_text_plan_lists_packages() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text).format_plans(&plans());

        assert!(text.contains("Acme.Core"));
        assert!(text.contains("skipped: current version was not detected"));
        assert!(text.contains("2 package(s) across 2 project(s), 1 skipped"));
    }

    #[test]
    fn test_json_plan() {
        let json = OutputFormatter::new(OutputFormat::Json).format_plans(&plans());
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");

        assert_eq!(value["total_packages"], 2);
        assert_eq!(value["projects"][0]["name"], "Web");
        assert_eq!(value["projects"][0]["packages"][1]["id"], "Acme.Core");
        assert!(value["projects"][0].get("skipped").is_none());
        assert_eq!(
            value["projects"][1]["skipped"],
            "current version was not detected"
        );
    }

    #[test]
    fn test_failed_outcome_carries_detail() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text)
            .format_outcome(&CompletionOutcome::Failed(String::from("boom")));
        assert!(text.contains("Upgrade script failed. boom"));
    }
}
