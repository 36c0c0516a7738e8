//! TryCatch Common Library
//!
//! This crate provides the constants, condition identifiers and configuration
//! loading utilities shared by all TryCatch workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Compile-time capacities of the runtime
//! - [`condition`] - Condition identifiers and the built-in label table
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use trycatch_common::condition::ConditionId;
//! use trycatch_common::consts::MAX_DEPTH;
//!
//! assert!(ConditionId::NAN.is_reserved());
//! assert!(MAX_DEPTH > 0);
//! ```

pub mod condition;
pub mod config;
pub mod consts;
pub mod prelude;
