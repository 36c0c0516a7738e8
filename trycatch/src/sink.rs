//! Diagnostic sink.
//!
//! Process-wide output channel for the runtime's fixed-format lines:
//!
//! ```text
//! Exception (<name>) raised in <file>, line <n>.
//! Unhandled exception (<name>)[ in <file>, line <n>].
//! !!! TryCatch: Exception ID conflict, between <nameA> and <nameB> !!!
//! ```
//!
//! Raise lines are written only while a stream is set (disabled by default).
//! Unhandled and conflict lines go to the stream when one is set and to
//! stderr otherwise. The overflow line always reaches stderr.
//!
//! The stream is meant to be configured once during start-up. Swapping it
//! while other threads raise is safe but the interleaving of their lines
//! across the swap is unspecified.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, const_mutex};
use tracing::{debug, warn};
use trycatch_common::config::{DiagnosticsConfig, TraceTarget};

use crate::error::{RuntimeError, RuntimeResult};
use crate::site::Site;

type Stream = Box<dyn Write + Send>;

static STREAM: Mutex<Option<Stream>> = const_mutex(None);
static TRACING: AtomicBool = AtomicBool::new(false);

/// Set the stream receiving diagnostic lines; `None` turns raise tracing off.
pub fn set_raise_stream(stream: Option<Box<dyn Write + Send>>) {
    let mut guard = STREAM.lock();
    TRACING.store(stream.is_some(), Ordering::Release);
    *guard = stream;
}

/// Returns true while a stream is set.
#[inline]
pub fn is_tracing() -> bool {
    TRACING.load(Ordering::Acquire)
}

/// Open the stream described by `config`.
///
/// # Errors
///
/// - `RuntimeError::Config` if the configuration is inconsistent
/// - `RuntimeError::TraceFile` if the trace file cannot be created
pub fn configure(config: &DiagnosticsConfig) -> RuntimeResult<()> {
    config.validate()?;
    let stream: Option<Stream> = match config.trace {
        TraceTarget::Off => None,
        TraceTarget::Stderr => Some(Box::new(io::stderr())),
        TraceTarget::Stdout => Some(Box::new(io::stdout())),
        TraceTarget::File => {
            // validate() guarantees the path.
            let path = config.trace_file.clone().unwrap_or_default();
            let file = File::create(&path)
                .map_err(|source| RuntimeError::TraceFile { path, source })?;
            Some(Box::new(file))
        }
    };
    debug!(target_kind = ?config.trace, "diagnostic sink configured");
    set_raise_stream(stream);
    Ok(())
}

pub(crate) fn emit_raise(label: &str, site: Site) {
    debug!(condition = label, %site, "raise");
    write_line(false, format_args!("Exception ({label}) raised in {site}."));
}

pub(crate) fn emit_unhandled(label: &str, site: Option<Site>) {
    debug!(condition = label, site = ?site, "unhandled");
    match site {
        Some(site) => write_line(true, format_args!("Unhandled exception ({label}) in {site}.")),
        None => write_line(true, format_args!("Unhandled exception ({label}).")),
    }
}

pub(crate) fn emit_conflict(found: &str, previous: &str) {
    warn!(found, previous, "condition ID conflict");
    write_line(
        true,
        format_args!("!!! TryCatch: Exception ID conflict, between {found} and {previous} !!!"),
    );
}

pub(crate) fn emit_overflow(max_depth: usize) {
    let message = format!(
        "TryCatch: protected region nesting overflow, exiting. (MAX_DEPTH was: {max_depth})"
    );
    if is_tracing() {
        write_line(false, format_args!("{message}"));
    }
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{message}");
}

fn write_line(fallback_to_stderr: bool, line: fmt::Arguments<'_>) {
    let mut guard = STREAM.lock();
    match guard.as_mut() {
        Some(stream) => {
            let _ = writeln!(stream, "{line}").and_then(|()| stream.flush());
        }
        None if fallback_to_stderr => {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "{line}");
        }
        None => {}
    }
}

/// In-memory stream; clones share one buffer.
///
/// ```rust
/// use trycatch::sink::{set_raise_stream, MemoryStream};
///
/// let capture = MemoryStream::new();
/// set_raise_stream(Some(Box::new(capture.clone())));
/// // ... raise something ...
/// set_raise_stream(None);
/// let _lines: Vec<String> = capture.lines();
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Written lines, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
