//! Upgrade document export.
//!
//! The external executor reads every project's plan from a single JSON
//! document in its working directory. Projects with nothing to upgrade are
//! still listed, with an empty package list, so the executor can skip them
//! explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ExportError, Result, UpgradeError};
use crate::package::Package;

use super::plan::{ProjectUpgradePlan, UpgradePlanSet};

/// File name of the exported document inside the work directory.
pub const DOCUMENT_FILE: &str = "upgrade-config.json";

/// Document handed to the external executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpgradeDocument {
    /// Identifier of the run that produced the document.
    pub run_id: String,
    /// When the document was generated.
    pub generated_at: DateTime<Utc>,
    /// Target package and version.
    pub target: DocumentPackage,
    /// Hash over the exported plans.
    pub fingerprint: String,
    /// One entry per project, in enumeration order.
    pub projects: Vec<DocumentProject>,
}

/// Project entry of the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentProject {
    /// Project name (file stem).
    pub name: String,
    /// Project file path.
    pub path: PathBuf,
    /// Packages to upgrade, in planning order.
    pub packages: Vec<DocumentPackage>,
}

/// Package entry of the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentPackage {
    /// Package id.
    pub id: String,
    /// Version to install.
    pub version: String,
}

/// Writes upgrade documents for the external executor.
#[derive(Debug)]
pub struct UpgradeConfigExporter {
    /// Destination path of the document.
    path: PathBuf,
}

impl UpgradeConfigExporter {
    /// Creates an exporter writing [`DOCUMENT_FILE`] into `work_dir`.
    #[must_use]
    pub fn new(work_dir: &Path) -> Self {
        Self {
            path: work_dir.join(DOCUMENT_FILE),
        }
    }

    /// Destination path of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exports all plans and writes the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized or written.
    pub async fn export(&self, plans: &UpgradePlanSet) -> Result<UpgradeDocument> {
        info!("Exporting upgrade document...");

        let document = UpgradeDocument::from_plans(plans, generate_run_id());
        let content = serde_json::to_string_pretty(&document).map_err(|e| {
            UpgradeError::Export(ExportError::Serialization {
                message: e.to_string(),
            })
        })?;

        self.write_atomic(content.as_bytes()).await?;

        info!(
            "Successfully exported upgrade document to {} ({} projects, {} packages)",
            self.path.display(),
            document.projects.len(),
            plans.total_packages()
        );
        Ok(document)
    }

    /// Reads a previously exported document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(&self) -> Result<UpgradeDocument> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.read_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| self.read_error(e.to_string()))
    }

    async fn write_atomic(&self, content: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e.to_string()))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| self.write_error(e.to_string()))?;
        file.write_all(content)
            .await
            .map_err(|e| self.write_error(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| self.write_error(e.to_string()))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.write_error(e.to_string()))?;

        debug!("Upgrade document written to {}", self.path.display());
        Ok(())
    }

    fn write_error(&self, message: String) -> UpgradeError {
        UpgradeError::Export(ExportError::WriteFailed {
            path: self.path.clone(),
            message,
        })
    }

    fn read_error(&self, message: String) -> UpgradeError {
        UpgradeError::Export(ExportError::ReadFailed {
            path: self.path.clone(),
            message,
        })
    }
}

impl UpgradeDocument {
    /// Builds the document for a plan set.
    #[must_use]
    pub fn from_plans(plans: &UpgradePlanSet, run_id: String) -> Self {
        Self {
            run_id,
            generated_at: Utc::now(),
            target: DocumentPackage {
                id: plans.package_id.clone(),
                version: plans.target_version.clone(),
            },
            fingerprint: plans.fingerprint(),
            projects: plans.plans.iter().map(DocumentProject::from).collect(),
        }
    }

    /// Rebuilds the ordered plan set described by the document.
    ///
    /// Visited sets and skip reasons are not part of the document and come
    /// back empty.
    #[must_use]
    pub fn to_plans(&self) -> UpgradePlanSet {
        let mut set = UpgradePlanSet::new(&self.target.id, &self.target.version);
        for project in &self.projects {
            let packages = project
                .packages
                .iter()
                .map(|p| Package::new(&p.id, &p.version))
                .collect();
            set.push(ProjectUpgradePlan::new(
                &project.path,
                packages,
                std::collections::HashSet::new(),
            ));
        }
        set
    }
}

impl From<&ProjectUpgradePlan> for DocumentProject {
    fn from(plan: &ProjectUpgradePlan) -> Self {
        Self {
            name: plan.name(),
            path: plan.project.clone(),
            packages: plan
                .packages
                .iter()
                .map(|p| DocumentPackage {
                    id: p.id.clone(),
                    version: p.version.clone(),
                })
                .collect(),
        }
    }
}

/// Generates a run identifier of the form `hostname-pid-uuid8`.
#[must_use]
pub fn generate_run_id() -> String {
    let hostname = hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());
    let pid = std::process::id();
    let uuid = &Uuid::new_v4().to_string()[..8];
    format!("{hostname}-{pid}-{uuid}")
}
