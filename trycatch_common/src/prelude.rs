//! Prelude module for common re-exports.
//!
//! ```rust
//! use trycatch_common::prelude::*;
//!
//! assert!(ConditionId::FAULT.is_reserved());
//! ```

// ─── Conditions ─────────────────────────────────────────────────────
pub use crate::condition::{ConditionId, builtin_label};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, DiagnosticsConfig, LogLevel, SharedConfig, TraceTarget,
    TryCatchConfig,
};

// ─── Capacities ─────────────────────────────────────────────────────
pub use crate::consts::{MAX_DEPTH, MAX_RESOLVERS};
