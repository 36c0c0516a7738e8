//! Error types for runtime set-up.
//!
//! Raised conditions never show up here: they travel as
//! [`crate::Raised`] inside an [`crate::Outcome`].

use std::path::PathBuf;

use nix::sys::signal::Signal;
use thiserror::Error;
use trycatch_common::config::ConfigError;

/// Errors that can occur while configuring the runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Installing a fault signal handler failed
    #[error("Failed to install fault handler for {signal:?}: {source}")]
    SignalInstall {
        /// Signal being bridged
        signal: Signal,
        /// Source nix error
        #[source]
        source: nix::Error,
    },

    /// The trace file could not be created
    #[error("Failed to open trace file {}: {source}", path.display())]
    TraceFile {
        /// Configured path
        path: PathBuf,
        /// Source IO error
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for runtime set-up
pub type RuntimeResult<T> = Result<T, RuntimeError>;
