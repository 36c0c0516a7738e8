//! # TryCatch Demo Binary
//!
//! Runs illustrative scenarios against the TryCatch runtime. Clause output
//! goes to stdout, diagnostic lines (unhandled reports, conflicts, raise
//! traces) to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Every scenario in order
//! trycatch_demo
//!
//! # One scenario, with raise tracing
//! trycatch_demo --trace conflict
//!
//! # Nest regions 257 deep: overflow, exit status 1
//! trycatch_demo nest 257
//!
//! # Read an unmapped page: unrecoverable, exit status 1
//! trycatch_demo segv
//!
//! # Settings from a file
//! trycatch_demo --config /etc/trycatch/config.toml all
//! ```

#![deny(warnings)]

use clap::{Parser, Subcommand};
use nix::sys::mman::{MapFlags, ProtFlags, mmap_anonymous};
use nix::sys::signal::{self, Signal};
use std::hint::black_box;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;
use trycatch::fault::{self, guarded};
use trycatch::labels;
use trycatch::{
    ConditionId, Outcome, condition_set, forward, last_condition, raise, recatch, try_region,
};
use trycatch_common::config::{ConfigLoader, TraceTarget, TryCatchConfig};
use trycatch_common::consts::DEFAULT_CONFIG_PATH;

condition_set! {
    /// Conditions owned by the demo.
    mod user from ConditionId::LAST_ID => {
        CONDITION_A = "UserConditionA",
        CONDITION_B = "UserConditionB",
        CONDITION_C = "UserConditionC",
    }
}

condition_set! {
    /// A module that picked the same base without coordination.
    mod clashing from ConditionId::LAST_ID => {
        CONFLICTING = "ConflictingCondition",
    }
}

type ScenarioResult = Result<(), Box<dyn std::error::Error>>;

/// TryCatch Demo - scenarios for the exception-propagation runtime
#[derive(Parser, Debug)]
#[command(name = "trycatch_demo")]
#[command(version)]
#[command(about = "Runs TryCatch runtime scenarios")]
#[command(long_about = None)]
struct Args {
    /// Path to a TOML configuration file (default: /etc/trycatch/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trace every raise on stderr (overrides the configured target)
    #[arg(short, long)]
    trace: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    scenario: Option<Scenario>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Scenario {
    /// Every scenario below except `nest`, `segv` and `unguarded`
    All,
    /// NaN raised and caught in the same region
    Nan,
    /// NaN ignored by an inner region, caught by the outer one
    Nested,
    /// User condition before and after registering its resolver
    User,
    /// Two resolvers naming the same identifier
    Conflict,
    /// Several clauses, the first matching one runs
    Multi,
    /// Panic inside a guarded call caught as a fault
    Fault,
    /// NaN raised in a called function, caught by the caller
    Called,
    /// NaN raised in a called function, caught by nobody
    Uncaught,
    /// Raise outside any region
    Outside,
    /// One clause shared by several identifiers
    Shared,
    /// Default clause
    Default,
    /// Default clause forwarding to the enclosing region
    Forward,
    /// Statement wrapped in recatch
    Recatch,
    /// Nest regions `levels` deep around a raising call
    Nest {
        /// Number of nested regions
        levels: usize,
    },
    /// Read a PROT_NONE page inside a guarded call (terminates the process)
    Segv,
    /// Send SIGSEGV to the thread outside any guarded call (terminates the process)
    Unguarded,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Demo failed: {}", e);
        eprintln!("trycatch_demo: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    let mut config = match &args.config {
        Some(path) => TryCatchConfig::load(path)?,
        None if default_path.exists() => TryCatchConfig::load(default_path)?,
        None => TryCatchConfig::with_service_name("trycatch_demo"),
    };
    if args.trace {
        config.diagnostics.trace = TraceTarget::Stderr;
    }

    setup_tracing(&args, &config);
    info!("TryCatch demo v{} starting...", env!("CARGO_PKG_VERSION"));

    trycatch::init(&config)?;

    let scenario = args.scenario.unwrap_or(Scenario::All);
    match scenario {
        Scenario::All => run_all(),
        other => run_scenario(other),
    }
}

fn run_all() -> ScenarioResult {
    const ORDER: [Scenario; 13] = [
        Scenario::Nan,
        Scenario::Nested,
        Scenario::User,
        Scenario::Conflict,
        Scenario::Multi,
        Scenario::Fault,
        Scenario::Called,
        Scenario::Uncaught,
        Scenario::Outside,
        Scenario::Shared,
        Scenario::Default,
        Scenario::Forward,
        Scenario::Recatch,
    ];
    for scenario in ORDER {
        run_scenario(scenario)?;
    }
    Ok(())
}

fn run_scenario(scenario: Scenario) -> ScenarioResult {
    info!(?scenario, "running scenario");
    match scenario {
        Scenario::All => run_all(),
        Scenario::Nan => nan(),
        Scenario::Nested => nested(),
        Scenario::User => user_conditions(),
        Scenario::Conflict => conflict(),
        Scenario::Multi => multi(),
        Scenario::Fault => fault_scenario(),
        Scenario::Called => called(),
        Scenario::Uncaught => uncaught(),
        Scenario::Outside => outside(),
        Scenario::Shared => shared_clause(),
        Scenario::Default => default_clause(),
        Scenario::Forward => forwarding(),
        Scenario::Recatch => recatching(),
        Scenario::Nest { levels } => nest_scenario(levels),
        Scenario::Segv => segv(),
        Scenario::Unguarded => unguarded(),
    }
}

fn produce_nan() -> Outcome<f64> {
    let x = black_box(0.0_f64) / 0.0;
    if x.is_nan() {
        raise(ConditionId::NAN)?;
    }
    Ok(x)
}

fn nan() -> ScenarioResult {
    try_region(|| {
        let x = black_box(0.0_f64) / 0.0;
        if x.is_nan() {
            raise(ConditionId::NAN)?;
        }
        Ok(())
    })
    .catch(ConditionId::NAN, |_| {
        println!("Caught exception NaN");
        Ok(())
    })
    .end()?;
    Ok(())
}

fn nested() -> ScenarioResult {
    try_region(|| {
        try_region(|| produce_nan().map(drop)).end()?;
        Ok(())
    })
    .catch(ConditionId::NAN, |_| {
        println!("Caught exception NaN at sublevel");
        Ok(())
    })
    .end()?;
    Ok(())
}

fn user_conditions() -> ScenarioResult {
    // Unnamed until its resolver is registered.
    try_region(|| raise(user::CONDITION_A)).end()?;
    labels::register(user::resolve)?;
    try_region(|| raise(user::CONDITION_A)).end()?;
    Ok(())
}

fn conflict() -> ScenarioResult {
    labels::register(user::resolve)?;
    // Named after the first set while the second one is unknown.
    try_region(|| raise(clashing::CONFLICTING)).end()?;
    labels::register(clashing::resolve)?;
    try_region(|| raise(clashing::CONFLICTING)).end()?;
    Ok(())
}

fn multi() -> ScenarioResult {
    try_region(|| raise(user::CONDITION_A))
        .catch(user::CONDITION_A, |_| {
            println!("Caught user condition A");
            Ok(())
        })
        .catch(user::CONDITION_B, |_| {
            println!("Caught user condition B");
            Ok(())
        })
        .catch(user::CONDITION_C, |_| {
            println!("Caught user condition C");
            Ok(())
        })
        .end()?;
    Ok(())
}

fn fault_scenario() -> ScenarioResult {
    fault::install()?;
    try_region(|| {
        let empty: Vec<i32> = Vec::new();
        let index = black_box(3);
        guarded(|| Ok(empty[index]))?;
        Ok(())
    })
    .catch(ConditionId::FAULT, |_| {
        println!("Caught exception Fault");
        Ok(())
    })
    .end()?;
    Ok(())
}

fn called() -> ScenarioResult {
    try_region(|| produce_nan().map(drop))
        .catch(ConditionId::NAN, |_| {
            println!("Caught exception NaN raised in called function");
            Ok(())
        })
        .end()?;
    Ok(())
}

fn uncaught() -> ScenarioResult {
    try_region(|| produce_nan().map(drop)).end()?;
    Ok(())
}

fn outside() -> ScenarioResult {
    raise(ConditionId::NAN)?;
    println!("Execution continues after an unhandled raise");
    Ok(())
}

fn shared_clause() -> ScenarioResult {
    try_region(|| raise(ConditionId::NAN))
        .catch_any(
            &[ConditionId::FAULT, ConditionId::NAN, ConditionId::ALLOC_FAILED],
            |id| {
                println!("Caught exception {id}");
                Ok(())
            },
        )
        .end()?;
    Ok(())
}

fn default_clause() -> ScenarioResult {
    try_region(|| raise(ConditionId::NAN))
        .default(|_| {
            if let Some(id) = last_condition() {
                println!("Caught exception {} with default clause", labels::resolve(id));
            }
            Ok(())
        })
        .end()?;
    Ok(())
}

fn forwarding() -> ScenarioResult {
    try_region(|| {
        try_region(|| raise(ConditionId::OUT_OF_RANGE))
            .catch(ConditionId::NAN, |_| Ok(()))
            .default(|_| forward())
            .end()
    })
    .catch(ConditionId::OUT_OF_RANGE, |id| {
        println!("Forwarded exception {} reached the outer region", labels::resolve(id));
        Ok(())
    })
    .end()?;
    Ok(())
}

fn recatching() -> ScenarioResult {
    try_region(|| {
        recatch(produce_nan)?;
        Ok(())
    })
    .catch(ConditionId::NAN, |_| {
        println!("Caught exception NaN re-raised by recatch");
        Ok(())
    })
    .end()?;
    Ok(())
}

fn nest(levels: usize) -> Outcome<Option<f64>> {
    if levels == 0 {
        return produce_nan().map(Some);
    }
    try_region(|| nest(levels - 1)).end().map(Option::flatten)
}

fn nest_scenario(levels: usize) -> ScenarioResult {
    nest(levels)?;
    println!("Nested {levels} regions");
    Ok(())
}

const PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(size) => size,
    None => panic!("page size is zero"),
};

fn segv() -> ScenarioResult {
    fault::install()?;
    // SAFETY: a fresh private anonymous mapping aliases nothing.
    let page = unsafe {
        mmap_anonymous(None, PAGE_SIZE, ProtFlags::PROT_NONE, MapFlags::MAP_PRIVATE)?
    };
    try_region(|| {
        // SAFETY: the page stays mapped; the read faults and the bridge exits.
        guarded(|| Ok(unsafe { std::ptr::read_volatile(page.cast::<u8>().as_ptr()) }))?;
        Ok(())
    })
    .catch(ConditionId::FAULT, |_| {
        println!("Caught exception Fault");
        Ok(())
    })
    .end()?;
    Ok(())
}

fn unguarded() -> ScenarioResult {
    fault::install()?;
    signal::raise(Signal::SIGSEGV)?;
    println!("Execution continues after an unguarded signal");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and configuration.
fn setup_tracing(args: &Args, config: &TryCatchConfig) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config
            .shared
            .log_level
            .as_directive()
            .parse()
            .unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
