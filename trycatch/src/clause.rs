//! Catch-block controller.
//!
//! Tracks whether the top frame is executing its body or one of its
//! clauses. A raise from inside a clause must not land back in the same
//! frame, so the raise engine reads this flag to decide where the
//! condition goes.
//!
//! ```text
//! push ──► Body ──(raise claimed by a clause)──► Clause
//!           │                                      │
//!           └──(end)──► Exited ◄──(end / raise)────┘
//! ```

use trycatch_common::condition::ConditionId;

use crate::labels;
use crate::raise::{self, Origin, Outcome};
use crate::sink;
use crate::stack::{self, ResumeToken};

/// State of one region frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Running the protected code.
    Body,
    /// Running a matching or default clause.
    Clause,
    /// Popped.
    Exited,
}

/// Flag the top frame as running a clause.
pub fn enter_clause() {
    stack::with_context(|ctx| {
        if let Some(frame) = ctx.top_mut() {
            frame.in_clause = true;
        }
    });
}

/// Clear the clause flag of the top frame.
pub fn exit_clause() {
    stack::with_context(|ctx| {
        if let Some(frame) = ctx.top_mut() {
            frame.in_clause = false;
        }
    });
}

/// State of the frame behind `token`.
pub fn frame_state(token: ResumeToken) -> FrameState {
    stack::with_context(|ctx| match ctx.frame(token.depth()) {
        None => FrameState::Exited,
        Some(frame) if frame.in_clause => FrameState::Clause,
        Some(_) => FrameState::Body,
    })
}

/// No clause claimed `caught`: pop the top frame and pass the last
/// condition on to the next frame out, or report it unhandled when none is
/// left.
///
/// [`crate::Region::end`] calls this; use it directly only when driving the
/// stack by hand.
pub fn default_fallthrough(caught: ConditionId) -> Outcome<()> {
    let (remaining, last, site) = stack::with_context(|ctx| {
        ctx.pop();
        (
            ctx.depth(),
            ctx.last_condition().unwrap_or(caught),
            ctx.last_site(),
        )
    });
    if remaining > 0 {
        raise::dispatch(last, None, Origin::Internal)
    } else {
        sink::emit_unhandled(&labels::resolve(last), site);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raise::raise;

    #[test]
    fn clause_flag_follows_enter_and_exit() {
        let token = stack::enter_region();
        assert_eq!(frame_state(token), FrameState::Body);

        enter_clause();
        assert_eq!(frame_state(token), FrameState::Clause);
        exit_clause();
        assert_eq!(frame_state(token), FrameState::Body);

        stack::exit_region();
        assert_eq!(frame_state(token), FrameState::Exited);
    }

    #[test]
    fn raise_from_clause_exits_the_frame() {
        let outer = stack::enter_region();
        let inner = stack::enter_region();
        enter_clause();

        let raised = raise(ConditionId::OUT_OF_RANGE).unwrap_err();
        assert_eq!(raised.target(), outer.depth());
        assert_eq!(frame_state(inner), FrameState::Exited);
        assert_eq!(frame_state(outer), FrameState::Body);

        stack::leave(outer);
    }

    #[test]
    fn fallthrough_forwards_to_outer_frame() {
        let outer = stack::enter_region();
        let _inner = stack::enter_region();
        let _ = raise(ConditionId::user(7));

        let forwarded = default_fallthrough(ConditionId::user(7)).unwrap_err();
        assert_eq!(forwarded.id(), ConditionId::user(7));
        assert_eq!(forwarded.target(), outer.depth());
        assert_eq!(stack::depth(), outer.depth() + 1);

        stack::leave(outer);
    }

    #[test]
    fn fallthrough_at_outermost_frame_is_unhandled() {
        let _token = stack::enter_region();
        let _ = raise(ConditionId::user(8));

        assert_eq!(default_fallthrough(ConditionId::user(8)), Ok(()));
        assert_eq!(stack::depth(), 0);
    }
}
