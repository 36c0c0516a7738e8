//! Handler stack (per-thread region frames).
//!
//! Every thread owns one [`ExecutionContext`] in thread-local storage. It
//! holds up to [`MAX_DEPTH`] pending frames, the last raised condition and
//! the site of that raise. Threads never observe each other's context, so
//! nothing here takes a lock.
//!
//! ## Invariants
//!
//! - `depth()` is always in `[0, MAX_DEPTH]`.
//! - Each region entry pushes exactly one frame; each region exit pops
//!   exactly one (normal end, default fall-through or a raise that leaves
//!   the frame from inside one of its clauses).
//! - Entering a region clears the last condition.
//!
//! Overflow terminates the process: the frame table has a fixed capacity
//! and a runaway nesting is a structural bug, not a condition.

use std::cell::RefCell;

use tracing::{error, trace};
use trycatch_common::condition::ConditionId;
use trycatch_common::consts::MAX_DEPTH;

use crate::sink;
use crate::site::Site;

/// Resumption point of a pushed frame.
///
/// Raises travel as [`crate::Raised`] values carrying the depth of the
/// frame they target; the region holding the token with that depth
/// dispatches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeToken {
    depth: usize,
}

impl ResumeToken {
    /// Index of the frame in the stack.
    #[inline]
    pub const fn depth(self) -> usize {
        self.depth
    }
}

/// One pending protected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerFrame {
    /// Position in the stack.
    pub depth: usize,
    /// Set while one of the region's clauses runs.
    pub in_clause: bool,
    /// Where the region was entered.
    pub site: Site,
}

/// Per-thread region state.
#[derive(Debug)]
pub struct ExecutionContext {
    frames: heapless::Vec<HandlerFrame, MAX_DEPTH>,
    last: Option<ConditionId>,
    last_site: Option<Site>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub const fn new() -> Self {
        Self {
            frames: heapless::Vec::new(),
            last: None,
            last_site: None,
        }
    }

    /// Number of pending frames.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Last raised condition, cleared on region entry.
    #[inline]
    pub fn last_condition(&self) -> Option<ConditionId> {
        self.last
    }

    /// Site of the last raise.
    #[inline]
    pub fn last_site(&self) -> Option<Site> {
        self.last_site
    }

    /// Frame at `depth`, if pushed.
    pub fn frame(&self, depth: usize) -> Option<&HandlerFrame> {
        self.frames.get(depth)
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut HandlerFrame> {
        self.frames.last_mut()
    }

    /// Push a frame. `None` when the stack is full.
    pub(crate) fn push(&mut self, site: Site) -> Option<ResumeToken> {
        let depth = self.frames.len();
        let frame = HandlerFrame {
            depth,
            in_clause: false,
            site,
        };
        self.frames.push(frame).ok()?;
        self.last = None;
        Some(ResumeToken { depth })
    }

    /// Pop the top frame. No-op on an empty stack.
    pub(crate) fn pop(&mut self) -> Option<HandlerFrame> {
        self.frames.pop()
    }

    /// Record a raise and pick the frame that receives it.
    ///
    /// When the top frame is running a clause it is popped first, so the
    /// condition goes to the next frame out. Returns `None` when no frame is
    /// left to receive it.
    pub(crate) fn begin_dispatch(
        &mut self,
        id: ConditionId,
        site: Option<Site>,
    ) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        self.last = Some(id);
        if site.is_some() {
            self.last_site = site;
        }
        if self.frames.last().is_some_and(|frame| frame.in_clause) {
            self.frames.pop();
        }
        self.frames.len().checked_sub(1)
    }
}

thread_local! {
    static CONTEXT: RefCell<ExecutionContext> = const { RefCell::new(ExecutionContext::new()) };
}

/// Run `f` on the current thread's context.
///
/// Never call user code from `f`: the context stays borrowed.
pub(crate) fn with_context<R>(f: impl FnOnce(&mut ExecutionContext) -> R) -> R {
    CONTEXT.with(|ctx| f(&mut ctx.borrow_mut()))
}

/// Push a frame for a region entered at the caller's location.
///
/// Terminates the process when [`MAX_DEPTH`] frames are already pending.
#[track_caller]
pub fn enter_region() -> ResumeToken {
    enter_region_at(Site::caller())
}

/// Push a frame for a region entered at `site`.
pub fn enter_region_at(site: Site) -> ResumeToken {
    match with_context(|ctx| ctx.push(site)) {
        Some(token) => {
            trace!(depth = token.depth, %site, "region entered");
            token
        }
        None => overflow(site),
    }
}

fn overflow(site: Site) -> ! {
    error!(max_depth = MAX_DEPTH, %site, "protected region nesting overflow");
    sink::emit_overflow(MAX_DEPTH);
    std::process::exit(1)
}

/// Pop the top frame. No-op at depth 0.
pub fn exit_region() {
    with_context(|ctx| {
        ctx.pop();
    });
}

/// Pop the frame of `token` if it is still pending.
///
/// Safe to call during unwinding and thread teardown.
pub(crate) fn leave(token: ResumeToken) {
    let _ = CONTEXT.try_with(|ctx| {
        if let Ok(mut ctx) = ctx.try_borrow_mut() {
            if ctx.depth() > token.depth {
                ctx.pop();
            }
        }
    });
}

/// Returns true while the frame of `token` is pending.
pub(crate) fn holds(token: ResumeToken) -> bool {
    with_context(|ctx| ctx.depth() > token.depth)
}

/// Current nesting depth of the calling thread.
pub fn depth() -> usize {
    with_context(|ctx| ctx.depth())
}

/// Last condition raised on this thread since the last region entry.
pub fn last_condition() -> Option<ConditionId> {
    with_context(|ctx| ctx.last)
}

/// Site of the last raise on this thread.
pub fn last_site() -> Option<Site> {
    with_context(|ctx| ctx.last_site)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERE: Site = Site::new("stack.rs", 1);

    #[test]
    fn push_pop_tracks_depth() {
        let mut ctx = ExecutionContext::new();
        assert_eq!(ctx.depth(), 0);

        let outer = ctx.push(HERE).unwrap();
        let inner = ctx.push(HERE).unwrap();
        assert_eq!(outer.depth(), 0);
        assert_eq!(inner.depth(), 1);
        assert_eq!(ctx.depth(), 2);

        ctx.pop();
        ctx.pop();
        assert!(ctx.pop().is_none(), "pop at depth 0 is a no-op");
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn push_fails_only_at_capacity() {
        let mut ctx = ExecutionContext::new();
        for _ in 0..MAX_DEPTH - 1 {
            assert!(ctx.push(HERE).is_some());
        }
        // Depth MAX_DEPTH - 1: one more frame fits.
        assert!(ctx.push(HERE).is_some());
        assert_eq!(ctx.depth(), MAX_DEPTH);
        assert!(ctx.push(HERE).is_none());
        assert_eq!(ctx.depth(), MAX_DEPTH);
    }

    #[test]
    fn entry_clears_last_condition() {
        let mut ctx = ExecutionContext::new();
        ctx.push(HERE).unwrap();
        ctx.begin_dispatch(ConditionId::NAN, Some(HERE));
        assert_eq!(ctx.last_condition(), Some(ConditionId::NAN));

        ctx.push(HERE).unwrap();
        assert_eq!(ctx.last_condition(), None);
    }

    #[test]
    fn dispatch_targets_top_frame() {
        let mut ctx = ExecutionContext::new();
        ctx.push(HERE).unwrap();
        ctx.push(HERE).unwrap();
        assert_eq!(ctx.begin_dispatch(ConditionId::IO_ERROR, None), Some(1));
        assert_eq!(ctx.depth(), 2, "body raise keeps the frame");
    }

    #[test]
    fn dispatch_from_clause_skips_own_frame() {
        let mut ctx = ExecutionContext::new();
        ctx.push(HERE).unwrap();
        ctx.push(HERE).unwrap();
        ctx.top_mut().unwrap().in_clause = true;

        assert_eq!(ctx.begin_dispatch(ConditionId::IO_ERROR, None), Some(0));
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn dispatch_from_outermost_clause_is_unhandled() {
        let mut ctx = ExecutionContext::new();
        ctx.push(HERE).unwrap();
        ctx.top_mut().unwrap().in_clause = true;

        assert_eq!(ctx.begin_dispatch(ConditionId::NAN, Some(HERE)), None);
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.last_condition(), Some(ConditionId::NAN));
    }

    #[test]
    fn dispatch_on_empty_stack_records_nothing() {
        let mut ctx = ExecutionContext::new();
        assert_eq!(ctx.begin_dispatch(ConditionId::NAN, Some(HERE)), None);
        assert_eq!(ctx.last_condition(), None);
    }

    #[test]
    fn threads_have_independent_stacks() {
        let token = enter_region();
        assert_eq!(depth(), token.depth() + 1);

        let other = std::thread::spawn(|| {
            let before = depth();
            let t = enter_region();
            let inside = depth();
            exit_region();
            (before, t.depth(), inside)
        })
        .join()
        .unwrap();
        assert_eq!(other, (0, 0, 1));

        leave(token);
        assert_eq!(depth(), token.depth());
    }

    #[test]
    fn leave_is_idempotent() {
        let token = enter_region();
        leave(token);
        leave(token);
        assert_eq!(depth(), token.depth());
        assert!(!holds(token));
    }
}
