//! Configuration parser for loading configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, UpgradeError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::UpgradeConfig;

/// Configuration parser for loading upgrade configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<UpgradeConfig> {
        let mut config = self.read_file(path.as_ref())?;
        self.resolve_relative_paths(&mut config);
        Ok(config)
    }

    fn read_file(&self, path: &Path) -> Result<UpgradeConfig> {
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(UpgradeError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            UpgradeError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<UpgradeConfig> {
        debug!("Parsing YAML configuration");

        let config: UpgradeConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            UpgradeError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed configuration for package: {}", config.package.id);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are checked in the format
    /// `UPGRADE_PILOT_<KEY>` (e.g., `UPGRADE_PILOT_WORK_DIR`). Overrides are
    /// applied before relative paths are resolved, so a relative override is
    /// taken relative to the base path like the same key in the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// has an invalid value.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<UpgradeConfig> {
        self.load_with_lookup(path.as_ref(), |key| std::env::var(key).ok())
    }

    fn load_with_lookup<F>(&self, path: &Path, lookup: F) -> Result<UpgradeConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.read_file(path)?;
        Self::apply_overrides(&mut config, lookup)?;
        self.resolve_relative_paths(&mut config);
        Ok(config)
    }

    /// Applies `UPGRADE_PILOT_*` overrides found by `lookup`.
    fn apply_overrides<F>(config: &mut UpgradeConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("UPGRADE_PILOT_PACKAGE_ID") {
            debug!("Overriding package.id from environment");
            config.package.id = id;
        }

        if let Some(dir) = lookup("UPGRADE_PILOT_WORK_DIR") {
            debug!("Overriding executor.work_dir from environment");
            config.executor.work_dir = PathBuf::from(dir);
        }

        if let Some(interval) = lookup("UPGRADE_PILOT_POLL_INTERVAL_MS") {
            debug!("Overriding executor.poll_interval_ms from environment");
            config.executor.poll_interval_ms = interval.parse().map_err(|e| {
                UpgradeError::Config(ConfigError::validation(
                    format!("UPGRADE_PILOT_POLL_INTERVAL_MS is not a number: {e}"),
                    "executor.poll_interval_ms",
                ))
            })?;
        }

        Ok(())
    }

    /// Makes relative file locations relative to the base path.
    fn resolve_relative_paths(&self, config: &mut UpgradeConfig) {
        let Some(base) = &self.base_path else {
            return;
        };

        for path in [
            &mut config.executor.work_dir,
            &mut config.executor.script,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }

        if let Some(cfg) = config.tools.package_manager_config.as_mut()
            && cfg.is_relative()
        {
            *cfg = base.join(&*cfg);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                UpgradeError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "upgrade-pilot.yaml",
    "upgrade-pilot.yml",
    ".upgrade-pilot.yaml",
];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(UpgradeError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r"
tools:
  adapter:
    program: upgrade-adapter
executor:
  host:
    program: pwsh
    args: ['-NoProfile', '-File']
";

    #[test]
    fn test_parse_minimal_config() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(MINIMAL, None).expect("minimal config");

        assert_eq!(config.package.id, "Telerik.Sitefinity.All");
        assert_eq!(config.package.public_key_token, "b28c218413bdf563");
        assert_eq!(config.executor.poll_interval_ms, 500);
        assert_eq!(config.executor.success_token, "success");
        assert_eq!(config.executor.max_wait_secs, None);
        assert_eq!(config.executor.host.args.len(), 2);
        assert!(config.cache.enabled);
        assert_eq!(config.projects.project_extension, ".csproj");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
package:
  id: Acme.Platform
  reference_keywords: [Acme.Platform]
  public_key_token: 0123456789abcdef
tools:
  adapter:
    program: dotnet
    args: [acme-adapter.dll]
  package_manager: /opt/nuget/nuget.exe
  package_manager_config: NuGet.Config
executor:
  host:
    program: pwsh
  script: scripts/Updater.ps1
  work_dir: out
  poll_interval_ms: 250
  max_wait_secs: 3600
cache:
  enabled: false
";
        let config = ConfigParser::new().parse_yaml(yaml, None).expect("full config");

        assert_eq!(config.package.id, "Acme.Platform");
        assert_eq!(config.tools.adapter.to_string(), "dotnet acme-adapter.dll");
        assert_eq!(config.executor.max_wait_secs, Some(3600));
        assert_eq!(config.cache.resolved_dir(), None);
    }

    #[test]
    fn test_missing_required_section_is_parse_error() {
        let err = ConfigParser::new()
            .parse_yaml("package:\n  id: Acme\n", None)
            .expect_err("tools and executor are required");
        assert!(matches!(err, UpgradeError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_file_resolves_relative_paths() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("upgrade-pilot.yaml");
        std::fs::write(&path, MINIMAL).expect("write config");

        let config = ConfigParser::new()
            .with_base_path(temp.path())
            .load_file(&path)
            .expect("load");

        assert_eq!(config.executor.work_dir, temp.path().join(".upgrade-pilot"));
        assert_eq!(config.executor.result_path(), temp.path().join(".upgrade-pilot/result.log"));
    }

    #[test]
    fn test_relative_override_resolves_against_base_path() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("upgrade-pilot.yaml");
        std::fs::write(&path, MINIMAL).expect("write config");

        let config = ConfigParser::new()
            .with_base_path(temp.path())
            .load_with_lookup(&path, |key| match key {
                "UPGRADE_PILOT_WORK_DIR" => Some(String::from("override")),
                "UPGRADE_PILOT_POLL_INTERVAL_MS" => Some(String::from("50")),
                _ => None,
            })
            .expect("load");

        assert_eq!(config.executor.work_dir, temp.path().join("override"));
        assert_eq!(config.executor.poll_interval_ms, 50);
        assert_eq!(config.package.id, "Telerik.Sitefinity.All");
    }

    #[test]
    fn test_invalid_interval_override_is_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("upgrade-pilot.yaml");
        std::fs::write(&path, MINIMAL).expect("write config");

        let err = ConfigParser::new()
            .load_with_lookup(&path, |key| {
                (key == "UPGRADE_PILOT_POLL_INTERVAL_MS").then(|| String::from("soon"))
            })
            .expect_err("not a number");
        assert!(matches!(
            err,
            UpgradeError::Config(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let temp = TempDir::new().expect("temp dir");
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("create nested");
        std::fs::write(temp.path().join("upgrade-pilot.yml"), MINIMAL).expect("write config");

        let found = find_config_file(&nested).expect("found");
        assert_eq!(found, temp.path().join("upgrade-pilot.yml"));
    }
}
