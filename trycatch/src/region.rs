//! Protected regions.
//!
//! A region pushes one frame, runs its body and dispatches whatever the body
//! raised to the first clause declaring that identifier:
//!
//! ```rust
//! use trycatch::{raise, try_region, ConditionId};
//!
//! let mut log = Vec::new();
//! let result = try_region(|| {
//!     if (0.0_f64 / 0.0).is_nan() {
//!         raise(ConditionId::NAN)?;
//!     }
//!     Ok(1.0)
//! })
//! .catch(ConditionId::NAN, |_| {
//!     log.push("Caught exception NaN");
//!     Ok(0.0)
//! })
//! .end();
//!
//! assert_eq!(result, Ok(Some(0.0)));
//! assert_eq!(log, ["Caught exception NaN"]);
//! ```
//!
//! `end()` on a region without default clause passes unclaimed conditions
//! to the enclosing region. Its `Ok(None)` means the condition left the
//! outermost region and was reported unhandled. A region closed through
//! [`Region::default`] claims everything, so its `end()` yields the value
//! directly.

use tracing::trace;
use trycatch_common::condition::ConditionId;

use crate::clause;
use crate::raise::{Outcome, Raised, raise_at};
use crate::site::Site;
use crate::stack::{self, ResumeToken};

enum State<T> {
    /// Body or clause finished normally.
    Completed(T),
    /// Raised into this region, no clause has claimed it yet.
    Caught(ConditionId),
    /// On its way to an outer region.
    Propagating(Raised),
}

impl<T> From<Outcome<T>> for State<T> {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Ok(value) => Self::Completed(value),
            Err(raised) => Self::Propagating(raised),
        }
    }
}

/// Pops the region's frame when dropped, if still pending.
struct FrameGuard {
    token: ResumeToken,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        stack::leave(self.token);
    }
}

/// An entered region awaiting its clauses.
///
/// Dropping it pops the frame if still pending.
#[must_use = "a region must be closed with `end()`"]
pub struct Region<T> {
    frame: FrameGuard,
    state: State<T>,
}

/// A region whose default clause has run.
#[must_use = "a region must be closed with `end()`"]
#[derive(Debug)]
pub struct Defaulted<T> {
    outcome: Outcome<T>,
}

/// Enter a region at the caller's location and run `body` inside it.
///
/// Terminates the process when the thread already holds
/// [`trycatch_common::consts::MAX_DEPTH`] regions.
#[track_caller]
pub fn try_region<T>(body: impl FnOnce() -> Outcome<T>) -> Region<T> {
    let frame = FrameGuard {
        token: stack::enter_region_at(Site::caller()),
    };
    let state = match body() {
        Ok(value) => State::Completed(value),
        Err(raised) if raised.target() == frame.token.depth() => State::Caught(raised.id()),
        Err(raised) => State::Propagating(raised),
    };
    Region { frame, state }
}

impl<T> Region<T> {
    /// Frame of this region.
    pub fn token(&self) -> ResumeToken {
        self.frame.token
    }

    /// Identifier waiting for a clause, if any.
    pub fn pending(&self) -> Option<ConditionId> {
        match self.state {
            State::Caught(id) => Some(id),
            _ => None,
        }
    }

    /// Clause for `id`.
    pub fn catch(
        self,
        id: impl Into<ConditionId>,
        clause: impl FnOnce(ConditionId) -> Outcome<T>,
    ) -> Self {
        self.catch_any(&[id.into()], clause)
    }

    /// Clause shared by several identifiers; it receives the one raised.
    pub fn catch_any(
        self,
        ids: &[ConditionId],
        clause: impl FnOnce(ConditionId) -> Outcome<T>,
    ) -> Self {
        let Region { frame, state } = self;
        let state = match state {
            State::Caught(id) if ids.contains(&id) => run_clause(&frame, id, clause).into(),
            other => other,
        };
        Region { frame, state }
    }

    /// Clause for every identifier no earlier clause claimed.
    pub fn default(self, clause: impl FnOnce(ConditionId) -> Outcome<T>) -> Defaulted<T> {
        let Region { frame, state } = self;
        let outcome = match state {
            State::Caught(id) => run_clause(&frame, id, clause),
            State::Completed(value) => Ok(value),
            State::Propagating(raised) => Err(raised),
        };
        drop(frame);
        Defaulted { outcome }
    }

    /// Close the region.
    ///
    /// An unclaimed condition goes to the enclosing region as `Err`, or is
    /// reported unhandled at the outermost level and yields `Ok(None)`.
    pub fn end(self) -> Outcome<Option<T>> {
        let Region { frame, state } = self;
        match state {
            State::Completed(value) => Ok(Some(value)),
            State::Propagating(raised) => Err(raised),
            State::Caught(id) => {
                trace!(condition = id.get(), depth = frame.token.depth(), "no clause matched");
                clause::default_fallthrough(id).map(|()| None)
            }
        }
    }
}

fn run_clause<T>(
    frame: &FrameGuard,
    id: ConditionId,
    clause: impl FnOnce(ConditionId) -> Outcome<T>,
) -> Outcome<T> {
    clause::enter_clause();
    let outcome = clause(id);
    // A raise from the clause has already popped the frame.
    if stack::holds(frame.token) {
        clause::exit_clause();
    }
    outcome
}

impl<T> Defaulted<T> {
    /// Close the region.
    pub fn end(self) -> Outcome<T> {
        self.outcome
    }
}

/// Run `body` in a fresh region that re-raises anything it catches from the
/// `recatch` call site.
///
/// Conditions keep their identifier but the trace points at this statement,
/// which helps when the first raise site says little (a fault bridged
/// from deep inside a library, say).
///
/// `Ok(None)` means the re-raise found no enclosing region.
#[track_caller]
pub fn recatch<T>(body: impl FnOnce() -> Outcome<T>) -> Outcome<Option<T>> {
    let site = Site::caller();
    try_region(|| body().map(Some))
        .default(|id| raise_at(id, site).map(|()| None))
        .end()
}
