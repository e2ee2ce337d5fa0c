//! Project enumeration and reference inspection.
//!
//! Reading solution and project files is delegated to a [`ProjectInspector`].
//! This module turns a user-supplied path into the list of projects that
//! reference the target family.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ProjectsConfig;
use crate::error::{InputError, Result};
use crate::package::Package;

use super::references::ReferenceMatcher;

/// Reads and rewrites project metadata on behalf of the pilot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectInspector: Send + Sync {
    /// Lists the project files that belong to a solution.
    async fn projects(&self, solution: &Path) -> Result<Vec<PathBuf>>;

    /// Lists the declared reference include strings of a project.
    async fn references(&self, project: &Path) -> Result<Vec<String>>;

    /// Lists the ids of packages installed in a project.
    async fn installed_packages(&self, project: &Path) -> Result<HashSet<String>>;

    /// Rewrites the project's references to match `packages`, applied in order.
    async fn rewrite_references(
        &self,
        project: &Path,
        solution_root: &Path,
        packages: &[Package],
    ) -> Result<()>;
}

/// Kind of file given as upgrade input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A single project file.
    Project,
    /// A solution file listing projects.
    Solution,
}

/// Classifies an input path by extension (case-insensitive).
///
/// # Errors
///
/// Returns an error if the path has neither the project nor the solution
/// extension.
pub fn classify_input(path: &Path, config: &ProjectsConfig) -> Result<InputKind> {
    if has_extension(path, &config.project_extension) {
        Ok(InputKind::Project)
    } else if has_extension(path, &config.solution_extension) {
        Ok(InputKind::Solution)
    } else {
        Err(InputError::UnsupportedFile {
            path: path.to_path_buf(),
        }
        .into())
    }
}

/// Collects the projects under `path` that reference the target family.
///
/// The returned order is the inspector's enumeration order.
///
/// # Errors
///
/// Returns an error if the path does not exist, is not a project or
/// solution, or the inspector fails.
pub async fn find_projects_to_upgrade<I>(
    inspector: &I,
    matcher: &ReferenceMatcher,
    path: &Path,
    config: &ProjectsConfig,
) -> Result<Vec<PathBuf>>
where
    I: ProjectInspector + ?Sized,
{
    if !path.exists() {
        return Err(InputError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    info!("Searching {} for projects to upgrade...", path.display());

    let candidates = match classify_input(path, config)? {
        InputKind::Project => vec![path.to_path_buf()],
        InputKind::Solution => inspector
            .projects(path)
            .await?
            .into_iter()
            .filter(|p| has_extension(p, &config.project_extension))
            .collect(),
    };

    let mut projects = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let references = inspector.references(&candidate).await?;
        if matcher.has_family_reference(&references) {
            debug!("Found family references in {}", candidate.display());
            projects.push(candidate);
        } else {
            debug!("No family references in {}", candidate.display());
        }
    }

    if projects.is_empty() {
        warn!("No projects to upgrade were found in {}", path.display());
    } else {
        info!("Found {} project(s) with family references", projects.len());
    }

    Ok(projects)
}

/// Returns the directory holding `path`, or `.` for a bare file name.
#[must_use]
pub fn containing_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Checks a path's extension, ignoring ASCII case. `extension` may carry a
/// leading dot.
fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(wanted))
}
