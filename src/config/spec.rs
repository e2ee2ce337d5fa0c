//! Configuration specification types for the upgrade pilot.
//!
//! This module defines the structs that map to the `upgrade-pilot.yaml` file.
//! Every section has defaults so a minimal file only names the adapter tool
//! and the automation host.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpgradeConfig {
    /// Target package family.
    #[serde(default)]
    pub package: PackageConfig,
    /// External tools used for inspection and package management.
    pub tools: ToolsConfig,
    /// External executor and completion handshake.
    pub executor: ExecutorConfig,
    /// Package tree cache.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Project and solution file conventions.
    #[serde(default)]
    pub projects: ProjectsConfig,
}

/// Target package family configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageConfig {
    /// Root package id of the family.
    #[serde(default = "default_package_id")]
    pub id: String,
    /// Keywords identifying family references in project files.
    #[serde(default = "default_reference_keywords")]
    pub reference_keywords: Vec<String>,
    /// Public key token carried by family references.
    #[serde(default = "default_public_key_token")]
    pub public_key_token: String,
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolsConfig {
    /// Adapter command answering `tree`, `projects`, `references`,
    /// `packages` and `rewrite` requests.
    pub adapter: CommandConfig,
    /// Package manager executable.
    #[serde(default = "default_package_manager")]
    pub package_manager: PathBuf,
    /// Optional package manager configuration file.
    #[serde(default)]
    pub package_manager_config: Option<PathBuf>,
}

/// A program and its leading arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandConfig {
    /// Program to run.
    pub program: String,
    /// Arguments placed before the request-specific ones.
    #[serde(default)]
    pub args: Vec<String>,
}

/// External executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Automation host that runs the updater script.
    pub host: CommandConfig,
    /// Updater script passed to the host.
    #[serde(default = "default_script")]
    pub script: PathBuf,
    /// Directory holding the upgrade document and marker files.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Marker polling interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum time to wait for the result marker (unbounded if unset).
    #[serde(default)]
    pub max_wait_secs: Option<u64>,
    /// Result marker content that signals success.
    #[serde(default = "default_success_token")]
    pub success_token: String,
}

/// Package tree cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Whether resolved trees are persisted on disk.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache directory (defaults to the user cache directory).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Project and solution file conventions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectsConfig {
    /// Project file extension.
    #[serde(default = "default_project_extension")]
    pub project_extension: String,
    /// Solution file extension.
    #[serde(default = "default_solution_extension")]
    pub solution_extension: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            id: default_package_id(),
            reference_keywords: default_reference_keywords(),
            public_key_token: default_public_key_token(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            project_extension: default_project_extension(),
            solution_extension: default_solution_extension(),
        }
    }
}

impl CacheConfig {
    /// Resolves the cache directory, if caching is enabled.
    #[must_use]
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        self.dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("upgrade-pilot").join("trees")))
    }
}

impl ExecutorConfig {
    /// Path of the progress marker.
    #[must_use]
    pub fn progress_path(&self) -> PathBuf {
        self.work_dir.join(PROGRESS_FILE)
    }

    /// Path of the result marker.
    #[must_use]
    pub fn result_path(&self) -> PathBuf {
        self.work_dir.join(RESULT_FILE)
    }
}

impl std::fmt::Display for CommandConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Progress marker file name.
pub const PROGRESS_FILE: &str = "progress.log";

/// Result marker file name.
pub const RESULT_FILE: &str = "result.log";

fn default_package_id() -> String {
    String::from("Telerik.Sitefinity.All")
}

fn default_reference_keywords() -> Vec<String> {
    vec![
        String::from("Telerik.Sitefinity"),
        String::from("Progress.Sitefinity"),
    ]
}

fn default_public_key_token() -> String {
    String::from("b28c218413bdf563")
}

fn default_package_manager() -> PathBuf {
    PathBuf::from("nuget")
}

fn default_script() -> PathBuf {
    PathBuf::from("Updater.ps1")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".upgrade-pilot")
}

const fn default_poll_interval_ms() -> u64 {
    500
}

fn default_success_token() -> String {
    String::from("success")
}

const fn default_true() -> bool {
    true
}

fn default_project_extension() -> String {
    String::from(".csproj")
}

fn default_solution_extension() -> String {
    String::from(".sln")
}
