//! Error types for the upgrade pilot.
//!
//! This module provides the error hierarchy for every stage of an upgrade:
//! configuration, input validation, package tree resolution, plan export,
//! and the external actions driven by this process.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the upgrade pilot.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid solution or project input.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Package tree resolution errors.
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Plan export errors.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Errors raised by external processes and the executor handshake.
    #[error("External action failed: {0}")]
    External(#[from] ExternalError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Errors in the solution or project paths given by the user.
#[derive(Debug, Error)]
pub enum InputError {
    /// The solution or project file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The path is neither a project nor a solution file.
    #[error("'{path}' is not a project or solution file")]
    UnsupportedFile {
        /// Offending path.
        path: PathBuf,
    },

    /// No project references the target package family.
    #[error("No projects with references to {package} were found in {path}")]
    NoProjects {
        /// Solution or project that was searched.
        path: PathBuf,
        /// Target package family id.
        package: String,
    },
}

/// Package tree resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolver could not produce a tree for the version.
    #[error("Failed to resolve {package} {version}: {message}")]
    LookupFailed {
        /// Package id.
        package: String,
        /// Requested version.
        version: String,
        /// Description of the failure.
        message: String,
    },

    /// The resolver returned a tree that could not be decoded.
    #[error("Malformed package tree for {package} {version}: {message}")]
    MalformedTree {
        /// Package id.
        package: String,
        /// Requested version.
        version: String,
        /// Description of the decoding failure.
        message: String,
    },
}

/// Plan export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The document could not be serialized.
    #[error("Failed to serialize upgrade document: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },

    /// The document could not be written.
    #[error("Failed to write upgrade document {path}: {message}")]
    WriteFailed {
        /// Destination path.
        path: PathBuf,
        /// Description of the IO failure.
        message: String,
    },

    /// A previously exported document could not be read back.
    #[error("Failed to read upgrade document {path}: {message}")]
    ReadFailed {
        /// Source path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Errors raised by external collaborators and the executor.
#[derive(Debug, Error)]
pub enum ExternalError {
    /// A process could not be started.
    #[error("Failed to start '{program}': {message}")]
    SpawnFailed {
        /// Program that was launched.
        program: String,
        /// Description of the failure.
        message: String,
    },

    /// A process exited unsuccessfully.
    #[error("'{program}' exited with status {status}: {stderr}")]
    ProcessFailed {
        /// Program that was launched.
        program: String,
        /// Exit status code, or -1 when killed by a signal.
        status: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// A process produced output that could not be decoded.
    #[error("Invalid output from '{program}': {message}")]
    InvalidOutput {
        /// Program that was launched.
        program: String,
        /// Description of the decoding failure.
        message: String,
    },

    /// The executor reported a failure through the result marker.
    #[error("Upgrade script failed. {detail}")]
    ExecutorFailed {
        /// Content of the result marker.
        detail: String,
    },

    /// The executor did not report a result in time.
    #[error("Timed out after {waited_secs}s waiting for {path}")]
    Timeout {
        /// Result marker that never appeared.
        path: PathBuf,
        /// Seconds waited.
        waited_secs: u64,
    },

    /// The executor stopped running without writing a result.
    #[error("Upgrade script exited without writing {path}")]
    ExecutorExited {
        /// Result marker that never appeared.
        path: PathBuf,
    },

    /// The result marker exists but could not be read.
    #[error("Failed to read result marker {path}: {message}")]
    ResultUnreadable {
        /// Result marker path.
        path: PathBuf,
        /// Description of the IO failure.
        message: String,
    },
}

/// Result type alias for upgrade pilot operations.
pub type Result<T> = std::result::Result<T, UpgradeError>;

impl UpgradeError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if no external action can have run when this error was raised.
    #[must_use]
    pub const fn is_pre_mutation(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Input(_) | Self::Resolve(_))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ExternalError {
    /// Creates a spawn error for a program.
    #[must_use]
    pub fn spawn(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid-output error for a program.
    #[must_use]
    pub fn invalid_output(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            program: program.into(),
            message: message.into(),
        }
    }
}
