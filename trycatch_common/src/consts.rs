//! Workspace-wide constants for the TryCatch runtime.
//!
//! Single source of truth for all capacities. Both are fixed at compile time;
//! the runtime never grows its tables.

use static_assertions::const_assert;

/// Maximum nesting depth of protected regions per thread.
pub const MAX_DEPTH: usize = 256;

/// Maximum number of label resolvers in the process-wide registry.
pub const MAX_RESOLVERS: usize = 256;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/trycatch/config.toml";

const_assert!(MAX_DEPTH > 0);
const_assert!(MAX_RESOLVERS > 0);
