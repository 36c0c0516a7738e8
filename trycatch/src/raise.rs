//! Raise engine.
//!
//! A raise never jumps. It records the condition in the thread's context,
//! picks the frame that must receive it and returns `Err(Raised)`; callers
//! propagate it with `?` until the region owning that frame dispatches it.
//!
//! With no frame to receive it the condition is reported as unhandled and
//! the raise returns `Ok(())`, so execution continues after the raise.

use thiserror::Error;
use tracing::trace;
use trycatch_common::condition::ConditionId;

use crate::labels;
use crate::sink;
use crate::site::Site;
use crate::stack;

/// A condition in flight towards the frame at depth `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("condition {id} in flight to frame {target}")]
pub struct Raised {
    id: ConditionId,
    target: usize,
}

impl Raised {
    /// The raised identifier.
    #[inline]
    pub const fn id(&self) -> ConditionId {
        self.id
    }

    /// Depth of the frame that dispatches it.
    #[inline]
    pub const fn target(&self) -> usize {
        self.target
    }
}

/// Result of code running inside a protected region.
pub type Outcome<T> = Result<T, Raised>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Raised by user code; traced.
    Caller,
    /// Re-raised by the runtime itself; not traced again.
    Internal,
}

/// Raise `id` at the caller's location.
///
/// ```rust
/// use trycatch::{raise, try_region, ConditionId};
///
/// let caught = try_region(|| {
///     raise(ConditionId::NAN)?;
///     Ok("unreachable")
/// })
/// .catch(ConditionId::NAN, |_| Ok("caught"))
/// .end();
/// assert_eq!(caught, Ok(Some("caught")));
/// ```
#[track_caller]
pub fn raise(id: impl Into<ConditionId>) -> Outcome<()> {
    raise_at(id.into(), Site::caller())
}

/// Raise `id` attributed to `site`.
pub fn raise_at(id: ConditionId, site: Site) -> Outcome<()> {
    dispatch(id, Some(site), Origin::Caller)
}

/// Re-raise the last condition of this thread unchanged.
///
/// The trace line names the `forward` call site. Without a last condition
/// this does nothing.
#[track_caller]
pub fn forward() -> Outcome<()> {
    match stack::last_condition() {
        Some(id) => raise_at(id, Site::caller()),
        None => Ok(()),
    }
}

pub(crate) fn dispatch(id: ConditionId, site: Option<Site>, origin: Origin) -> Outcome<()> {
    if origin == Origin::Caller && sink::is_tracing() {
        if let Some(site) = site {
            sink::emit_raise(&labels::resolve(id), site);
        }
    }

    let target = stack::with_context(|ctx| ctx.begin_dispatch(id, site));
    match target {
        Some(target) => {
            trace!(condition = id.get(), target, "dispatching");
            Err(Raised { id, target })
        }
        None => {
            let site = site.or_else(stack::last_site);
            sink::emit_unhandled(&labels::resolve(id), site);
            Ok(())
        }
    }
}
