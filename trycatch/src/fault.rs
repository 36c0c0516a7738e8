//! Fault bridge.
//!
//! Turns faults delivered by the execution environment into raises of
//! [`ConditionId::FAULT`]. Opt-in: call [`install`] once at start-up,
//! then wrap suspect code in [`guarded`].
//!
//! Two kinds of fault are bridged:
//!
//! - **Panics** (bounds checks, failed unwraps, arithmetic overflow in debug
//!   builds). They are caught at the `guarded` boundary with
//!   `catch_unwind`; the panic hook keeps them off stderr.
//! - **Synchronous signals** SIGSEGV, SIGBUS and SIGFPE sent to the thread
//!   (`raise(3)`, `pthread_kill(3)`) while it runs inside `guarded`. The
//!   handler records the signal in a thread-local slot; [`checkpoint`] or the
//!   end of the guarded body turns it into the raise.
//!
//! Everything else terminates the process with a fixed message and exit
//! status 1:
//!
//! - a signal generated by the kernel for a faulting instruction, which
//!   cannot be resumed (returning from the handler re-executes it);
//! - a bridged signal arriving outside any `guarded` call, where nothing
//!   would ever observe it.
//!
//! ## Signal Safety
//!
//! The handler only reads and stores const-initialized thread-local `Cell`s
//! (no lazy initialization, no destructor), calls `write(2)` and `_exit(2)`.
//! No allocation, no locks.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use tracing::{debug, info};
use trycatch_common::condition::ConditionId;

use crate::error::{RuntimeError, RuntimeResult};
use crate::labels;
use crate::raise::{Outcome, raise_at};
use crate::sink;
use crate::site::Site;

/// Signals routed through the bridge.
pub const BRIDGED_SIGNALS: [Signal; 3] = [Signal::SIGSEGV, Signal::SIGBUS, Signal::SIGFPE];

const UNRECOVERABLE_MSG: &[u8] = b"TryCatch: unrecoverable hardware fault, exiting.\n";
const UNGUARDED_MSG: &[u8] = b"TryCatch: fault signal outside a guarded call, exiting.\n";

static INSTALLED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static PENDING_SIGNAL: Cell<libc::c_int> = const { Cell::new(0) };
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
}

extern "C" fn on_fault_signal(
    signal: libc::c_int,
    info: *mut libc::siginfo_t,
    _context: *mut libc::c_void,
) {
    // SAFETY: the kernel passes a valid siginfo_t with SA_SIGINFO.
    let code = if info.is_null() {
        0
    } else {
        unsafe { (*info).si_code }
    };
    let guard_depth = GUARD_DEPTH.try_with(Cell::get).unwrap_or(0);
    match signal_disposition(code, guard_depth) {
        Disposition::Record => {
            let _ = PENDING_SIGNAL.try_with(|pending| pending.set(signal));
        }
        Disposition::Exit(message) => {
            // SAFETY: write(2) and _exit(2) are async-signal-safe.
            unsafe {
                libc::write(libc::STDERR_FILENO, message.as_ptr().cast(), message.len());
                libc::_exit(libc::EXIT_FAILURE);
            }
        }
    }
}

/// What the signal handler does with one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Keep it for the enclosing `guarded` call.
    Record,
    /// Write the message and terminate.
    Exit(&'static [u8]),
}

/// `si_code > 0` marks a signal generated by the kernel for the faulting
/// instruction; `<= 0` one sent by a process or thread.
const fn signal_disposition(si_code: libc::c_int, guard_depth: usize) -> Disposition {
    if si_code > 0 {
        Disposition::Exit(UNRECOVERABLE_MSG)
    } else if guard_depth == 0 {
        Disposition::Exit(UNGUARDED_MSG)
    } else {
        Disposition::Record
    }
}

/// Install the signal handlers and the panic hook. Idempotent.
///
/// # Errors
///
/// Returns `RuntimeError::SignalInstall` if `sigaction(2)` fails; the bridge
/// then stays uninstalled.
pub fn install() -> RuntimeResult<()> {
    if INSTALLED.load(Ordering::Acquire) {
        return Ok(());
    }

    let action = SigAction::new(
        SigHandler::SigAction(on_fault_signal),
        SaFlags::SA_SIGINFO,
        SigSet::empty(),
    );
    for signal in BRIDGED_SIGNALS {
        // SAFETY: the handler only touches async-signal-safe state.
        unsafe { sigaction(signal, &action) }
            .map_err(|source| RuntimeError::SignalInstall { signal, source })?;
    }

    if INSTALLED.swap(true, Ordering::AcqRel) {
        return Ok(());
    }
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if GUARD_DEPTH.with(Cell::get) > 0 {
            debug!(
                location = ?info.location().map(ToString::to_string),
                "panic bridged into a fault"
            );
        } else {
            previous(info);
        }
    }));

    info!(signals = ?BRIDGED_SIGNALS, "fault bridge installed");
    Ok(())
}

/// Returns true once [`install`] has succeeded.
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::Acquire)
}

/// Take the signal recorded for this thread, if any.
pub fn take_pending_fault() -> Option<Signal> {
    let raw = PENDING_SIGNAL.with(|pending| pending.replace(0));
    if raw == 0 {
        return None;
    }
    Signal::try_from(raw).ok()
}

/// Raise [`ConditionId::FAULT`] at the caller's site if a bridged signal
/// is pending for this thread.
///
/// A signal cannot interrupt the guarded body; call this after operations
/// that may fault so the rest of the body is abandoned.
#[track_caller]
pub fn checkpoint() -> Outcome<()> {
    let site = Site::caller();
    match take_pending_fault() {
        Some(signal) => {
            debug!(?signal, %site, "signal bridged into a fault");
            raise_at(ConditionId::FAULT, site)
        }
        None => Ok(()),
    }
}

/// Run `body`, turning a panic or a bridged signal into a raise of
/// [`ConditionId::FAULT`] attributed to this call.
///
/// A panic abandons the rest of `body`. A signal does not: the body runs
/// to completion (or to the next [`checkpoint`]) and the fault is raised
/// when it returns. A signal still pending from an enclosing guarded body
/// is raised before `body` starts, so `body` does not run at all.
///
/// When `body` itself returns a raise while a signal is pending, the raise
/// continues and the fault is reported unhandled. `Ok(None)` means the
/// fault was raised outside any region and reported unhandled. Without
/// [`install`], `body` runs unguarded and panics propagate.
///
/// ```rust,no_run
/// use trycatch::{fault, try_region, ConditionId};
///
/// fault::install().expect("fault bridge");
/// let caught = try_region(|| {
///     fault::guarded(|| {
///         let empty: Vec<u8> = Vec::new();
///         Ok(empty[3])
///     })
/// })
/// .catch(ConditionId::FAULT, |_| Ok(None))
/// .end();
/// assert_eq!(caught, Ok(Some(None)));
/// ```
#[track_caller]
pub fn guarded<T>(body: impl FnOnce() -> Outcome<T>) -> Outcome<Option<T>> {
    let site = Site::caller();
    if !is_installed() {
        return body().map(Some);
    }

    if let Some(signal) = take_pending_fault() {
        debug!(?signal, %site, "signal pending from an enclosing guard");
        return raise_at(ConditionId::FAULT, site).map(|()| None);
    }
    GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(body));
    GUARD_DEPTH.with(|depth| depth.set(depth.get() - 1));
    let signal = take_pending_fault();

    match (result, signal) {
        (Ok(Err(raised)), None) => Err(raised),
        (Ok(Err(raised)), Some(signal)) => {
            debug!(?signal, %site, condition = raised.id().get(), "fault superseded by a raise");
            sink::emit_unhandled(&labels::resolve(ConditionId::FAULT), Some(site));
            Err(raised)
        }
        (Ok(Ok(value)), None) => Ok(Some(value)),
        (Ok(Ok(_)), Some(signal)) => {
            debug!(?signal, %site, "signal bridged into a fault");
            raise_at(ConditionId::FAULT, site).map(|()| None)
        }
        (Err(_), _) => {
            debug!(%site, "panic bridged into a fault");
            raise_at(ConditionId::FAULT, site).map(|()| None)
        }
    }
}
