//! Diagnostic line formats and the process-wide label registry.
//!
//! Every test here swaps the process-wide stream, so they serialize on
//! `SINK_LOCK`.

use parking_lot::{Mutex, MutexGuard, const_mutex};
use tempfile::TempDir;
use trycatch::labels::{self, register, resolve, resolver_count};
use trycatch::sink::{self, MemoryStream, set_raise_stream};
use trycatch::{ConditionId, Outcome, forward, raise, recatch, try_region};
use trycatch_common::config::{TraceTarget, TryCatchConfig};

static SINK_LOCK: Mutex<()> = const_mutex(());

/// Captures the sink for the lifetime of the guard.
struct Capture {
    stream: MemoryStream,
    _lock: MutexGuard<'static, ()>,
}

impl Capture {
    fn start() -> Self {
        let lock = SINK_LOCK.lock();
        let stream = MemoryStream::new();
        set_raise_stream(Some(Box::new(stream.clone())));
        Self {
            stream,
            _lock: lock,
        }
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        set_raise_stream(None);
    }
}

fn at(line: u32) -> String {
    format!("{}, line {line}", file!())
}

fn clash_first(id: ConditionId) -> Option<&'static str> {
    (id == ConditionId::user(700)).then_some("ClashFirst")
}

fn clash_second(id: ConditionId) -> Option<&'static str> {
    (id == ConditionId::user(700)).then_some("ClashSecond")
}

fn parser_names(id: ConditionId) -> Option<&'static str> {
    (id == ConditionId::user(710)).then_some("ParserError")
}

/// Test: each raise writes one trace line naming the label and the site.
#[test]
fn raise_writes_trace_line() {
    let capture = Capture::start();

    let line = line!() + 2;
    let result = try_region(|| -> Outcome<()> {
        raise(ConditionId::NAN)?;
        Ok(())
    })
    .catch(ConditionId::NAN, |_| Ok(()))
    .end();

    assert_eq!(result, Ok(Some(())));
    assert_eq!(
        capture.stream.lines(),
        vec![format!("Exception (NaN) raised in {}.", at(line))]
    );
}

/// Test: nothing is traced while no stream is set.
#[test]
fn tracing_is_off_without_stream() {
    let _lock = SINK_LOCK.lock();
    set_raise_stream(None);
    assert!(!sink::is_tracing());
}

/// Test: an unhandled raise names the raise site.
#[test]
fn unhandled_report_names_raise_site() {
    let capture = Capture::start();

    let line = line!() + 1;
    raise(ConditionId::IO_ERROR).unwrap();

    assert_eq!(
        capture.stream.lines(),
        vec![
            format!("Exception (IoError) raised in {}.", at(line)),
            format!("Unhandled exception (IoError) in {}.", at(line)),
        ]
    );
}

/// Test: default fall-through re-raises silently; only the first raise
/// is traced.
#[test]
fn fallthrough_is_not_traced_again() {
    let capture = Capture::start();

    let result = try_region(|| {
        try_region(|| -> Outcome<()> {
            raise(ConditionId::OUT_OF_RANGE)?;
            Ok(())
        })
        .end()?;
        Ok(false)
    })
    .catch(ConditionId::OUT_OF_RANGE, |_| Ok(true))
    .end();

    assert_eq!(result, Ok(Some(true)));
    assert_eq!(capture.stream.lines().len(), 1);
}

/// Test: `forward()` traces a second line naming the forward call site.
#[test]
fn forward_traces_its_own_site() {
    let capture = Capture::start();

    let mut forward_line = 0;
    let result = try_region(|| {
        try_region(|| -> Outcome<()> {
            raise(ConditionId::INT_OVERFLOW)?;
            Ok(())
        })
        .default(|_| {
            forward_line = line!() + 1;
            forward()
        })
        .end()?;
        Ok(false)
    })
    .catch(ConditionId::INT_OVERFLOW, |_| Ok(true))
    .end();

    assert_eq!(result, Ok(Some(true)));
    let lines = capture.stream.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        format!("Exception (IntOverflow) raised in {}.", at(forward_line))
    );
}

/// Test: `recatch` attributes the re-raise to the wrapped statement.
#[test]
fn recatch_traces_wrapping_statement() {
    let capture = Capture::start();

    let recatch_line = line!() + 2;
    let result = try_region(|| {
        recatch(|| raise(ConditionId::UNIT_TEST_FAILED))?;
        Ok(false)
    })
    .catch(ConditionId::UNIT_TEST_FAILED, |_| Ok(true))
    .end();

    assert_eq!(result, Ok(Some(true)));
    let lines = capture.stream.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        format!("Exception (UnitTestFailed) raised in {}.", at(recatch_line))
    );
}

/// Test: two resolvers naming one identifier report a conflict and the
/// later name wins.
#[test]
fn conflicting_resolvers_report_and_resolve() {
    let capture = Capture::start();

    register(clash_first).unwrap();
    register(clash_second).unwrap();
    let label = resolve(ConditionId::user(700));

    assert_eq!(label, "ClashSecond");
    assert_eq!(
        capture.stream.lines(),
        vec!["!!! TryCatch: Exception ID conflict, between ClashSecond and ClashFirst !!!"]
    );
}

/// Test: registering a resolver twice changes nothing.
#[test]
fn double_registration_has_no_effect() {
    let capture = Capture::start();

    register(parser_names).unwrap();
    let count = resolver_count();
    register(parser_names).unwrap();

    assert_eq!(resolver_count(), count);
    assert!(labels::is_registered(parser_names));
    assert_eq!(resolve(ConditionId::user(710)), "ParserError");
    assert!(capture.stream.lines().is_empty());
}

/// Test: identifiers nobody names get the numeric placeholder.
#[test]
fn unnamed_identifier_placeholder() {
    let _capture = Capture::start();
    let id = ConditionId::user(4000);
    assert_eq!(resolve(id), format!("User-defined exception ({id})"));
}

/// Test: `init` opens a trace file from configuration.
#[test]
fn init_with_trace_file() {
    let _lock = SINK_LOCK.lock();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("raise.log");

    let mut config = TryCatchConfig::with_service_name("diagnostics-test");
    config.diagnostics.trace = TraceTarget::File;
    config.diagnostics.trace_file = Some(path.clone());
    trycatch::init(&config).unwrap();

    let line = line!() + 2;
    let result = try_region(|| -> Outcome<()> {
        raise(ConditionId::NOT_YET_IMPLEMENTED)?;
        Ok(())
    })
    .default(|_| Ok(()))
    .end();
    set_raise_stream(None);

    assert_eq!(result, Ok(()));
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        written,
        format!("Exception (NotYetImplemented) raised in {}.\n", at(line))
    );
}

/// Test: `init` rejects an invalid configuration without touching the sink.
#[test]
fn init_rejects_invalid_config() {
    let _lock = SINK_LOCK.lock();
    let config = TryCatchConfig::with_service_name("");
    assert!(matches!(
        trycatch::init(&config),
        Err(trycatch::RuntimeError::Config(_))
    ));
    assert!(!sink::is_tracing());
}
