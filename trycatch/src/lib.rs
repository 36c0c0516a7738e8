//! TryCatch runtime
//!
//! Structured raise-and-catch of integer-identified conditions with
//! per-thread handler stacks, bounded nesting and a process-wide label
//! registry.
//!
//! # Module Structure
//!
//! - [`stack`] - Per-thread handler stack and region entry/exit
//! - [`raise`] - Raise engine: `raise`, `raise_at`, `forward`
//! - [`clause`] - Clause state of the top frame, default fall-through
//! - [`region`] - `try_region` builder, `recatch`
//! - [`labels`] - Label registry and resolvers
//! - [`sink`] - Diagnostic line output
//! - [`fault`] - Opt-in bridge from panics and fault signals to conditions
//! - [`site`] - Source locations attached to raises
//! - [`error`] - Set-up errors
//!
//! # Usage
//!
//! ```rust
//! use trycatch::{raise, try_region, ConditionId, Outcome};
//!
//! fn checked_div(a: i32, b: i32) -> Outcome<i32> {
//!     if b == 0 {
//!         raise(ConditionId::OUT_OF_RANGE)?;
//!     }
//!     Ok(a / b)
//! }
//!
//! let result = try_region(|| checked_div(7, 0))
//!     .catch(ConditionId::OUT_OF_RANGE, |_| Ok(i32::MAX))
//!     .end();
//! assert_eq!(result, Ok(Some(i32::MAX)));
//! ```

pub mod clause;
pub mod error;
pub mod fault;
pub mod labels;
pub mod raise;
pub mod region;
pub mod sink;
pub mod site;
pub mod stack;

pub use error::{RuntimeError, RuntimeResult};
pub use raise::{Outcome, Raised, forward, raise, raise_at};
pub use region::{Defaulted, Region, recatch, try_region};
pub use site::Site;
pub use stack::{depth, last_condition};
pub use trycatch_common::condition::ConditionId;
pub use trycatch_common::condition_set;

use tracing::info;
use trycatch_common::config::TryCatchConfig;

/// Apply `config` to the process-wide runtime state.
///
/// Validates it, opens the diagnostic stream and installs the fault bridge
/// when enabled. Call once during start-up, before other threads raise.
///
/// # Errors
///
/// - `RuntimeError::Config` if validation fails
/// - `RuntimeError::TraceFile` if the trace file cannot be created
/// - `RuntimeError::SignalInstall` if a fault handler cannot be installed
pub fn init(config: &TryCatchConfig) -> RuntimeResult<()> {
    config.validate()?;
    sink::configure(&config.diagnostics)?;
    if config.fault_bridge {
        fault::install()?;
    }
    info!(
        service = %config.shared.service_name,
        trace = ?config.diagnostics.trace,
        fault_bridge = config.fault_bridge,
        "trycatch runtime initialized"
    );
    Ok(())
}

/// Common re-exports.
pub mod prelude {
    pub use crate::labels::{Resolver, register, resolve};
    pub use crate::{
        ConditionId, Defaulted, Outcome, Raised, Region, Site, condition_set, forward, raise,
        raise_at, recatch, try_region,
    };
}
