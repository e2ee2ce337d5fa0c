//! Configuration module for the upgrade pilot.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `upgrade-pilot.yaml`
//! - Environment overrides and `.env` loading
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use spec::{
    CacheConfig, CommandConfig, ExecutorConfig, PROGRESS_FILE, PackageConfig, ProjectsConfig,
    RESULT_FILE, ToolsConfig, UpgradeConfig,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
