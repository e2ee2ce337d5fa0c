//! Adapter tool client.
//!
//! Solution parsing, project reference listing, package tree lookup and
//! reference rewriting are answered by a single external adapter command
//! speaking JSON:
//!
//! | request                               | stdout                                   |
//! |---------------------------------------|------------------------------------------|
//! | `tree <package> <version>`            | `{"id", "version", "dependencies": [..]}` |
//! | `projects <solution>`                 | `["path/to/A.csproj", ..]`               |
//! | `references <project>`                | `["Include string", ..]`                 |
//! | `packages <project>`                  | `["Package.Id", ..]`                     |
//! | `rewrite <project> <solution-root>`   | (stdin: `[{"id", "version"}, ..]`)        |
//!
//! Relative project paths returned by `projects` are resolved against the
//! solution directory.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::CommandConfig;
use crate::error::{ExternalError, ResolveError, Result, UpgradeError};
use crate::package::{Package, TreeResolver};
use crate::planner::DocumentPackage;
use crate::project::{ProjectInspector, containing_dir};

use super::process::run_captured;

/// Client for the external adapter command.
#[derive(Debug, Clone)]
pub struct AdapterTool {
    /// Adapter program and leading arguments.
    command: CommandConfig,
}

impl AdapterTool {
    /// Creates a client for the configured adapter command.
    #[must_use]
    pub const fn new(command: CommandConfig) -> Self {
        Self { command }
    }

    fn args(&self, request: &str, extra: &[&OsStr]) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.command.args.iter().map(OsString::from).collect();
        args.push(OsString::from(request));
        args.extend(extra.iter().map(|a| a.to_os_string()));
        args
    }

    async fn request<T: DeserializeOwned>(&self, request: &str, extra: &[&OsStr]) -> Result<T> {
        let args = self.args(request, extra);
        let output = run_captured(&self.command.program, &args, None).await?;
        serde_json::from_str(&output.stdout).map_err(|e| {
            ExternalError::invalid_output(&self.command.program, format!("{request}: {e}")).into()
        })
    }
}

#[async_trait]
impl TreeResolver for AdapterTool {
    async fn resolve(&self, package_id: &str, version: &str) -> Result<Package> {
        let args = self.args("tree", &[OsStr::new(package_id), OsStr::new(version)]);
        let output = run_captured(&self.command.program, &args, None)
            .await
            .map_err(|e| {
                UpgradeError::Resolve(ResolveError::LookupFailed {
                    package: package_id.to_string(),
                    version: version.to_string(),
                    message: e.to_string(),
                })
            })?;

        let tree: Package = serde_json::from_str(&output.stdout).map_err(|e| {
            UpgradeError::Resolve(ResolveError::MalformedTree {
                package: package_id.to_string(),
                version: version.to_string(),
                message: e.to_string(),
            })
        })?;

        debug!("Resolved {} with {} nodes", tree, tree.node_count());
        Ok(tree)
    }
}

#[async_trait]
impl ProjectInspector for AdapterTool {
    async fn projects(&self, solution: &Path) -> Result<Vec<PathBuf>> {
        let listed: Vec<PathBuf> = self.request("projects", &[solution.as_os_str()]).await?;
        let base = containing_dir(solution);
        Ok(listed
            .into_iter()
            .map(|p| if p.is_relative() { base.join(p) } else { p })
            .collect())
    }

    async fn references(&self, project: &Path) -> Result<Vec<String>> {
        self.request("references", &[project.as_os_str()]).await
    }

    async fn installed_packages(&self, project: &Path) -> Result<HashSet<String>> {
        let ids: Vec<String> = self.request("packages", &[project.as_os_str()]).await?;
        Ok(ids.into_iter().collect())
    }

    async fn rewrite_references(
        &self,
        project: &Path,
        solution_root: &Path,
        packages: &[Package],
    ) -> Result<()> {
        let payload: Vec<DocumentPackage> = packages
            .iter()
            .map(|p| DocumentPackage {
                id: p.id.clone(),
                version: p.version.clone(),
            })
            .collect();
        let input = serde_json::to_vec(&payload)
            .map_err(|e| UpgradeError::internal(format!("Failed to encode packages: {e}")))?;

        let args = self.args("rewrite", &[project.as_os_str(), solution_root.as_os_str()]);
        run_captured(&self.command.program, &args, Some(input.as_slice())).await?;

        info!(
            "Synchronized {} reference(s) in {}",
            packages.len(),
            project.display()
        );
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Writes a shell adapter answering each request with canned output.
    fn fake_adapter(dir: &Path) -> AdapterTool {
        let script = dir.join("adapter.sh");
        let body = format!(
            r#"#!/bin/sh
case "$1" in
  tree) printf '{{"id":"%s","version":"%s","dependencies":[{{"id":"Acme.Core","version":"%s"}}]}}' "$2" "$3" "$3" ;;
  projects) printf '["Web/Web.csproj","/abs/Api.csproj"]' ;;
  references) printf '["Acme, Version=1.0.0.0, PublicKeyToken=b28c218413bdf563"]' ;;
  packages) printf '["Acme","Acme.Core","Acme"]' ;;
  rewrite) cat > "{log}" ; printf '%s %s' "$2" "$3" >> "{log}" ;;
  bad) printf 'not json' ;;
  *) exit 2 ;;
esac
"#,
            log = dir.join("rewrite.log").display()
        );
        std::fs::write(&script, body).expect("write adapter");

        AdapterTool::new(CommandConfig {
            program: String::from("sh"),
            args: vec![script.display().to_string()],
        })
    }

    #[tokio::test]
    async fn test_resolve_tree() {
        let temp = TempDir::new().expect("temp dir");
        let adapter = fake_adapter(temp.path());

        let tree = adapter.resolve("Acme", "14.1").await.expect("tree");
        assert_eq!(tree.id, "Acme");
        assert_eq!(tree.version, "14.1");
        assert_eq!(tree.dependencies[0].id, "Acme.Core");
    }

    #[tokio::test]
    async fn test_projects_resolved_against_solution_dir() {
        let temp = TempDir::new().expect("temp dir");
        let adapter = fake_adapter(temp.path());

        let projects = adapter
            .projects(&temp.path().join("All.sln"))
            .await
            .expect("projects");
        assert_eq!(
            projects,
            vec![temp.path().join("Web/Web.csproj"), PathBuf::from("/abs/Api.csproj")]
        );
    }

    #[tokio::test]
    async fn test_projects_of_bare_solution_name() {
        let temp = TempDir::new().expect("temp dir");
        let adapter = fake_adapter(temp.path());

        let projects = adapter
            .projects(Path::new("All.sln"))
            .await
            .expect("projects");
        assert_eq!(projects[0], Path::new(".").join("Web/Web.csproj"));
    }

    #[tokio::test]
    async fn test_installed_packages_deduplicated() {
        let temp = TempDir::new().expect("temp dir");
        let adapter = fake_adapter(temp.path());

        let installed = adapter
            .installed_packages(Path::new("Web.csproj"))
            .await
            .expect("packages");
        assert_eq!(installed.len(), 2);
        assert!(installed.contains("Acme.Core"));
    }

    #[tokio::test]
    async fn test_rewrite_sends_packages_in_order() {
        let temp = TempDir::new().expect("temp dir");
        let adapter = fake_adapter(temp.path());

        adapter
            .rewrite_references(
                Path::new("Web.csproj"),
                Path::new("/src"),
                &[Package::new("Acme.Core", "14.1"), Package::new("Acme", "14.1")],
            )
            .await
            .expect("rewrite");

        let log = std::fs::read_to_string(temp.path().join("rewrite.log")).expect("log");
        assert_eq!(
            log,
            r#"[{"id":"Acme.Core","version":"14.1"},{"id":"Acme","version":"14.1"}]Web.csproj /src"#
        );
    }

    #[tokio::test]
    async fn test_invalid_json_is_reported() {
        let temp = TempDir::new().expect("temp dir");
        let adapter = fake_adapter(temp.path());

        let err = adapter
            .request::<Vec<String>>("bad", &[])
            .await
            .expect_err("must fail");
        assert!(matches!(
            err,
            UpgradeError::External(ExternalError::InvalidOutput { .. })
        ));
    }
}
