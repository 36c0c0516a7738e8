//! Label registry.
//!
//! Maps condition identifiers to display names. Names come from the fixed
//! table of reserved identifiers plus resolvers contributed by independent
//! modules. Because modules pick their identifiers without coordination,
//! two sources naming the same identifier is reported as a conflict; the
//! last name found wins and resolution carries on.
//!
//! The process-wide registry grows monotonically. Register resolvers during
//! start-up; the lock only keeps concurrent registration memory-safe, the
//! resulting order between racing registrations is unspecified.

use std::borrow::Cow;

use parking_lot::{RwLock, const_rwlock};
use tracing::debug;
use trycatch_common::condition::{ConditionId, builtin_label};
use trycatch_common::consts::MAX_RESOLVERS;

use crate::raise::{Outcome, raise_at};
use crate::sink;
use crate::site::Site;

/// Maps identifiers a module owns to names, `None` for any other.
pub type Resolver = fn(ConditionId) -> Option<&'static str>;

/// Display name of a condition.
pub type Label = Cow<'static, str>;

/// Two sources naming the same identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    /// Name returned by the later source.
    pub found: &'static str,
    /// Name it replaces.
    pub previous: &'static str,
}

/// Result of resolving one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub label: Label,
    pub conflicts: Vec<Conflict>,
}

/// Outcome of inserting a resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Added,
    AlreadyPresent,
    Full,
}

/// Ordered set of resolvers with a fixed capacity.
#[derive(Debug, Clone)]
pub struct LabelRegistry<const N: usize = MAX_RESOLVERS> {
    resolvers: heapless::Vec<Resolver, N>,
}

impl<const N: usize> Default for LabelRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LabelRegistry<N> {
    pub const fn new() -> Self {
        Self {
            resolvers: heapless::Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Identity check on the function pointer.
    pub fn contains(&self, resolver: Resolver) -> bool {
        self.resolvers
            .iter()
            .any(|known| std::ptr::fn_addr_eq(*known, resolver))
    }

    /// Append `resolver` unless it is already known or the registry is full.
    pub fn insert(&mut self, resolver: Resolver) -> Insert {
        if self.contains(resolver) {
            return Insert::AlreadyPresent;
        }
        match self.resolvers.push(resolver) {
            Ok(()) => Insert::Added,
            Err(_) => Insert::Full,
        }
    }

    /// Insert `resolver`, raising [`ConditionId::TOO_MANY_RESOLVERS`] when full.
    #[track_caller]
    pub fn register(&mut self, resolver: Resolver) -> Outcome<()> {
        let site = Site::caller();
        match self.insert(resolver) {
            Insert::Full => raise_at(ConditionId::TOO_MANY_RESOLVERS, site),
            Insert::Added | Insert::AlreadyPresent => Ok(()),
        }
    }

    /// Name `id` without emitting anything.
    ///
    /// The built-in table is consulted first, then every resolver in
    /// registration order. Unnamed identifiers get a placeholder.
    pub fn lookup(&self, id: ConditionId) -> Lookup {
        let mut found = builtin_label(id);
        let mut conflicts = Vec::new();
        for resolver in &self.resolvers {
            if let Some(name) = resolver(id) {
                if let Some(previous) = found {
                    conflicts.push(Conflict {
                        found: name,
                        previous,
                    });
                }
                found = Some(name);
            }
        }
        let label = match found {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("User-defined exception ({id})")),
        };
        Lookup { label, conflicts }
    }
}

static REGISTRY: RwLock<LabelRegistry> = const_rwlock(LabelRegistry::new());

/// Add `resolver` to the process-wide registry.
///
/// Registering the same function twice has no effect. A full registry
/// raises [`ConditionId::TOO_MANY_RESOLVERS`] at the caller's site.
#[track_caller]
pub fn register(resolver: Resolver) -> Outcome<()> {
    let site = Site::caller();
    // The write lock must be released before raising: raising resolves labels.
    let inserted = REGISTRY.write().insert(resolver);
    debug!(?inserted, "label resolver registration");
    match inserted {
        Insert::Full => raise_at(ConditionId::TOO_MANY_RESOLVERS, site),
        Insert::Added | Insert::AlreadyPresent => Ok(()),
    }
}

/// Name `id` through the process-wide registry, reporting conflicts.
///
/// Resolvers run under the registry's read lock and must not call
/// [`register`] or [`resolve`].
pub fn resolve(id: ConditionId) -> Label {
    // Conflicts are reported after the guard drops: the sink may block.
    let Lookup { label, conflicts } = REGISTRY.read().lookup(id);
    for conflict in &conflicts {
        sink::emit_conflict(conflict.found, conflict.previous);
    }
    label
}

/// Number of resolvers in the process-wide registry.
pub fn resolver_count() -> usize {
    REGISTRY.read().len()
}

/// Returns true if `resolver` is in the process-wide registry.
pub fn is_registered(resolver: Resolver) -> bool {
    REGISTRY.read().contains(resolver)
}
