//! Package manager invocation.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ToolsConfig;
use crate::error::Result;

use super::process::run_streamed;

/// Package manager actions run once before planning.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Restores every package referenced by a solution.
    async fn restore(&self, solution: &Path) -> Result<()>;

    /// Installs a package version into a solution's package folder.
    async fn install(&self, package_id: &str, version: &str, solution_dir: &Path) -> Result<()>;
}

/// Package manager driven through its command line.
#[derive(Debug, Clone)]
pub struct CliPackageManager {
    executable: PathBuf,
    config_file: Option<PathBuf>,
}

impl CliPackageManager {
    /// Creates a client for a package manager executable.
    #[must_use]
    pub const fn new(executable: PathBuf, config_file: Option<PathBuf>) -> Self {
        Self {
            executable,
            config_file,
        }
    }

    /// Creates a client from the tools configuration.
    #[must_use]
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(
            tools.package_manager.clone(),
            tools.package_manager_config.clone(),
        )
    }

    fn program(&self) -> String {
        self.executable.display().to_string()
    }

    fn restore_args(solution: &Path) -> Vec<OsString> {
        vec![
            OsString::from("restore"),
            solution.as_os_str().to_os_string(),
            OsString::from("-NoHttpCache"),
        ]
    }

    fn install_args(&self, package_id: &str, version: &str, solution_dir: &Path) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("install"),
            OsString::from(package_id),
            OsString::from("-Version"),
            OsString::from(version),
            OsString::from("-SolutionDirectory"),
            solution_dir.as_os_str().to_os_string(),
            OsString::from("-NoHttpCache"),
        ];
        if let Some(config) = &self.config_file {
            args.push(OsString::from("-ConfigFile"));
            args.push(config.as_os_str().to_os_string());
        }
        args
    }
}

#[async_trait]
impl PackageManager for CliPackageManager {
    async fn restore(&self, solution: &Path) -> Result<()> {
        info!("Restoring packages for {}", solution.display());
        run_streamed(&self.program(), Self::restore_args(solution)).await
    }

    async fn install(&self, package_id: &str, version: &str, solution_dir: &Path) -> Result<()> {
        info!("Installing {package_id} {version}");
        run_streamed(
            &self.program(),
            self.install_args(package_id, version, solution_dir),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_args_include_config_file() {
        let manager = CliPackageManager::new(
            PathBuf::from("nuget"),
            Some(PathBuf::from("/src/NuGet.Config")),
        );
        let args = manager.install_args("Acme", "14.1", Path::new("/src"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(
            args,
            vec![
                "install",
                "Acme",
                "-Version",
                "14.1",
                "-SolutionDirectory",
                "/src",
                "-NoHttpCache",
                "-ConfigFile",
                "/src/NuGet.Config",
            ]
        );
    }

    #[test]
    fn test_install_args_without_config_file() {
        let manager = CliPackageManager::new(PathBuf::from("nuget"), None);
        let args = manager.install_args("Acme", "14.1", Path::new("/src"));
        assert_eq!(args.len(), 7);
        assert_eq!(args.last().map(OsString::as_os_str), Some("-NoHttpCache".as_ref()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restore_runs_executable() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let script = temp.path().join("fake-nuget.sh");
        let log = temp.path().join("calls.log");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" >> \"{}\"\n", log.display()),
        )
        .expect("write script");

        // `sh <script>` keeps the test independent of the executable bit.
        let manager = CliPackageManager::new(PathBuf::from("sh"), None);
        let mut args = vec![script.as_os_str().to_os_string()];
        args.extend(CliPackageManager::restore_args(Path::new("All.sln")));
        run_streamed(&manager.program(), args).await.expect("restore");

        let calls = std::fs::read_to_string(&log).expect("log");
        assert_eq!(calls.trim(), "restore All.sln -NoHttpCache");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_install_is_reported() {
        let manager = CliPackageManager::new(PathBuf::from("false"), None);
        assert!(manager.install("Acme", "14.1", Path::new("/src")).await.is_err());
    }
}
