//! Configuration validation.
//!
//! This module checks a loaded configuration for values that would only fail
//! later, after external actions have already started.

use crate::error::{ConfigError, Result, UpgradeError};
use tracing::debug;

use super::spec::{CommandConfig, UpgradeConfig};

/// Validator for upgrade configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates an upgrade configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &UpgradeConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_package(config, &mut result);
        Self::validate_command(&config.tools.adapter, "tools.adapter", &mut result);
        Self::validate_command(&config.executor.host, "executor.host", &mut result);
        Self::validate_executor(config, &mut result);
        Self::validate_projects(config, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(UpgradeError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    fn validate_package(config: &UpgradeConfig, result: &mut ValidationResult) {
        let package = &config.package;

        if package.id.trim().is_empty() {
            result.error("package.id", "Package id cannot be empty");
        }

        if package.reference_keywords.is_empty() {
            result.error(
                "package.reference_keywords",
                "At least one reference keyword is required",
            );
        } else if package.reference_keywords.iter().any(|k| k.trim().is_empty()) {
            result.error(
                "package.reference_keywords",
                "Reference keywords cannot be empty",
            );
        }

        if !is_valid_token(&package.public_key_token) {
            result.error(
                "package.public_key_token",
                format!(
                    "Public key token '{}' must be 16 hexadecimal characters",
                    package.public_key_token
                ),
            );
        }
    }

    fn validate_command(command: &CommandConfig, field: &str, result: &mut ValidationResult) {
        if command.program.trim().is_empty() {
            result.error(format!("{field}.program"), "Program cannot be empty");
        }
    }

    fn validate_executor(config: &UpgradeConfig, result: &mut ValidationResult) {
        let executor = &config.executor;

        if executor.poll_interval_ms == 0 {
            result.error(
                "executor.poll_interval_ms",
                "Poll interval must be greater than zero",
            );
        }

        if executor.success_token.is_empty() {
            result.error("executor.success_token", "Success token cannot be empty");
        }

        match executor.max_wait_secs {
            None => result.warnings.push(String::from(
                "executor.max_wait_secs is not set; the upgrade waits forever if the script never reports a result",
            )),
            Some(0) => result.error(
                "executor.max_wait_secs",
                "Maximum wait must be greater than zero",
            ),
            Some(secs) if secs.saturating_mul(1000) < executor.poll_interval_ms => {
                result.warnings.push(format!(
                    "executor.max_wait_secs ({secs}s) is shorter than one poll interval"
                ));
            }
            Some(_) => {}
        }
    }

    fn validate_projects(config: &UpgradeConfig, result: &mut ValidationResult) {
        let projects = &config.projects;
        let project_ext = projects.project_extension.trim_start_matches('.');
        let solution_ext = projects.solution_extension.trim_start_matches('.');

        if project_ext.is_empty() {
            result.error("projects.project_extension", "Extension cannot be empty");
        }
        if solution_ext.is_empty() {
            result.error("projects.solution_extension", "Extension cannot be empty");
        }
        if !project_ext.is_empty() && project_ext.eq_ignore_ascii_case(solution_ext) {
            result.error(
                "projects.solution_extension",
                "Project and solution extensions must differ",
            );
        }
    }
}

impl ValidationResult {
    /// Returns true if no errors were found.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

/// Checks that a public key token is 16 hex digits.
fn is_valid_token(token: &str) -> bool {
    token.len() == 16 && token.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn config() -> UpgradeConfig {
        ConfigParser::new()
            .parse_yaml(
                r"
tools:
  adapter:
    program: upgrade-adapter
executor:
  host:
    program: pwsh
  max_wait_secs: 600
",
                None,
            )
            .expect("config")
    }

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::new().validate(&config()).expect("valid");
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_max_wait_is_a_warning() {
        let mut cfg = config();
        cfg.executor.max_wait_secs = None;
        let result = ConfigValidator::new().validate(&cfg).expect("valid");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_invalid_token() {
        assert!(is_valid_token("b28c218413bdf563"));
        assert!(!is_valid_token("b28c218413bdf56"));
        assert!(!is_valid_token("z28c218413bdf563"));

        let mut cfg = config();
        cfg.package.public_key_token = String::from("nope");
        let err = ConfigValidator::new().validate(&cfg).expect_err("invalid");
        assert!(err.to_string().contains("Public key token"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut cfg = config();
        cfg.executor.poll_interval_ms = 0;
        assert!(ConfigValidator::new().validate(&cfg).is_err());
    }

    #[test]
    fn test_same_extensions_rejected() {
        let mut cfg = config();
        cfg.projects.solution_extension = String::from("CSPROJ");
        assert!(ConfigValidator::new().validate(&cfg).is_err());
    }
}
