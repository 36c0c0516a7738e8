//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! for applications embedding the TryCatch runtime.
//!
//! # Usage
//!
//! ```rust,no_run
//! use trycatch_common::config::{ConfigLoader, TryCatchConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = TryCatchConfig::load(Path::new("config.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// configuration files.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across all TryCatch applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "trycatch-demo"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where raise trace lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TraceTarget {
    /// Tracing disabled.
    #[default]
    Off,
    /// Standard error stream.
    Stderr,
    /// Standard output stream.
    Stdout,
    /// File named by `trace_file` (truncated on open).
    File,
}

/// Diagnostic sink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Destination of the raise trace.
    #[serde(default)]
    pub trace: TraceTarget,

    /// Trace file, required when `trace = "file"`.
    #[serde(default)]
    pub trace_file: Option<PathBuf>,
}

impl DiagnosticsConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `trace = "file"` has no
    /// `trace_file`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trace == TraceTarget::File && self.trace_file.is_none() {
            return Err(ConfigError::ValidationError(
                "trace = \"file\" requires trace_file".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration of an application embedding the runtime.
///
/// # TOML Example
///
/// ```toml
/// fault_bridge = true
///
/// [shared]
/// service_name = "trycatch-demo"
///
/// [diagnostics]
/// trace = "file"
/// trace_file = "/tmp/raise.log"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryCatchConfig {
    /// Base fields.
    pub shared: SharedConfig,

    /// Diagnostic sink.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Install the fault bridge at start-up.
    #[serde(default)]
    pub fault_bridge: bool,
}

impl TryCatchConfig {
    /// Configuration used when no file is given.
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::default(),
                service_name: service_name.into(),
            },
            diagnostics: DiagnosticsConfig::default(),
            fault_bridge: false,
        }
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.diagnostics.validate()
    }
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation: any serde-deserializable struct can be loaded.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
