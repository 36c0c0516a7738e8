//! Region scenarios: clause selection, propagation between nested regions,
//! raises from inside clauses and forwarding.
//!
//! Complements the inline `mod tests` blocks of `trycatch::region` and
//! `trycatch::clause`.

use trycatch::labels::LabelRegistry;
use trycatch::{
    ConditionId, Outcome, depth, forward, last_condition, raise, recatch, try_region,
};
use trycatch_common::consts::MAX_DEPTH;

const A: ConditionId = ConditionId::user(1);
const B: ConditionId = ConditionId::user(2);

/// Test: NaN raised in the body is handled by its clause, and code after the
/// region runs normally.
#[test]
fn nan_scenario_clause_message_then_continue() {
    let mut output = Vec::new();

    let result = try_region(|| {
        let x = 0.0_f64 / 0.0;
        if x.is_nan() {
            raise(ConditionId::NAN)?;
        }
        output.push("no NaN");
        Ok(x)
    })
    .catch(ConditionId::NAN, |_| {
        output.push("Caught exception NaN");
        Ok(0.0)
    })
    .end();
    output.push("after region");

    assert_eq!(result, Ok(Some(0.0)));
    assert_eq!(output, ["Caught exception NaN", "after region"]);
    assert_eq!(depth(), 0);
}

/// Test: an inner region without clauses lets identifier 3 through to the
/// outer clause, which fires exactly once.
#[test]
fn inner_region_without_clauses_propagates_to_outer() {
    let mut outer_runs = 0;
    let mut inner_tail_ran = false;

    let result = try_region(|| {
        try_region(|| {
            raise(ConditionId::IO_ERROR)?;
            inner_tail_ran = true;
            Ok(())
        })
        .end()?;
        Ok("outer body finished")
    })
    .catch(ConditionId::IO_ERROR, |id| {
        outer_runs += 1;
        assert_eq!(id.get(), 3);
        Ok("outer clause")
    })
    .end();

    assert_eq!(result, Ok(Some("outer clause")));
    assert_eq!(outer_runs, 1);
    assert!(!inner_tail_ran);
    assert_eq!(depth(), 0);
}

/// Test: raising from inside a clause goes to the enclosing frame, never
/// back into the frame whose clause is running.
#[test]
fn raise_from_clause_goes_to_enclosing_frame() {
    let mut inner_clause_runs = 0;
    let mut outer_clause_runs = 0;

    let result = try_region(|| {
        try_region(|| {
            raise(A)?;
            Ok(())
        })
        .catch(A, |_| {
            inner_clause_runs += 1;
            raise(B)?;
            Ok(())
        })
        .catch(B, |_| panic!("inner frame re-entered"))
        .end()?;
        Ok(false)
    })
    .catch(B, |id| {
        outer_clause_runs += 1;
        assert_eq!(last_condition(), Some(id));
        Ok(true)
    })
    .end();

    assert_eq!(result, Ok(Some(true)));
    assert_eq!(inner_clause_runs, 1);
    assert_eq!(outer_clause_runs, 1);
    assert_eq!(depth(), 0);
}

/// Test: re-raising the very identifier a clause is handling does not loop.
#[test]
fn reraise_same_id_from_clause_does_not_loop() {
    let mut inner_clause_runs = 0;

    let result = try_region(|| {
        try_region(|| -> Outcome<()> {
            raise(A)?;
            Ok(())
        })
        .catch(A, |id| {
            inner_clause_runs += 1;
            raise(id)
        })
        .end()?;
        Ok("body")
    })
    .catch(A, |_| Ok("outer"))
    .end();

    assert_eq!(result, Ok(Some("outer")));
    assert_eq!(inner_clause_runs, 1);
}

/// Test: a raise from the clause of the outermost region is unhandled and
/// the clause resumes after the raise.
#[test]
fn raise_from_outermost_clause_is_unhandled_and_continues() {
    let mut resumed = false;

    let result = try_region(|| {
        raise(A)?;
        Ok(0)
    })
    .catch(A, |_| {
        raise(B)?;
        resumed = true;
        Ok(1)
    })
    .end();

    assert_eq!(result, Ok(Some(1)));
    assert!(resumed);
    assert_eq!(depth(), 0);
}

/// Test: `forward()` in a default clause delivers the same identifier to the
/// next outer handler.
#[test]
fn forward_from_default_clause_round_trips() {
    let result = try_region(|| {
        try_region(|| -> Outcome<()> {
            raise(B)?;
            Ok(())
        })
        .catch(A, |_| Ok(()))
        .default(|_| forward())
        .end()?;
        Ok(None)
    })
    .default(|id| Ok(Some(id)))
    .end();

    assert_eq!(result, Ok(Some(B)));
    assert_eq!(depth(), 0);
}

/// Test: `forward()` also works from ordinary code after a nested region
/// handled the condition.
#[test]
fn forward_from_body_after_handled_region() {
    let result = try_region(|| {
        try_region(|| -> Outcome<()> {
            raise(A)?;
            Ok(())
        })
        .catch(A, |_| Ok(()))
        .end()?;
        assert_eq!(last_condition(), Some(A));
        forward()?;
        Ok(ConditionId(0))
    })
    .catch(A, Ok)
    .end();

    assert_eq!(result, Ok(Some(A)));
}

/// Test: a raise outside any region returns to the next statement.
#[test]
fn raise_outside_region_returns_to_caller() {
    let mut steps = Vec::new();
    steps.push("before");
    raise(ConditionId::NOT_YET_IMPLEMENTED).unwrap();
    steps.push("after");
    assert_eq!(steps, ["before", "after"]);
    assert_eq!(depth(), 0);
}

/// Test: leaving the outermost region unclaimed yields `Ok(None)`.
#[test]
fn unclaimed_at_outermost_region_yields_none() {
    let result = try_region(|| -> Outcome<u8> {
        raise(ConditionId::INFINITE_LOOP)?;
        Ok(1)
    })
    .catch(A, |_| Ok(2))
    .end();

    assert_eq!(result, Ok(None));
    assert_eq!(depth(), 0);
}

/// Test: a condition crosses several clause-less regions unchanged.
#[test]
fn propagation_crosses_many_levels() {
    fn nest(levels: usize) -> Outcome<Option<()>> {
        if levels == 0 {
            raise(ConditionId::OUT_OF_RANGE)?;
            return Ok(Some(()));
        }
        try_region(|| nest(levels - 1)).end().map(Option::flatten)
    }

    let result = try_region(|| nest(10).map(|_| None))
        .catch(ConditionId::OUT_OF_RANGE, |id| Ok(Some(id)))
        .end();
    assert_eq!(result, Ok(Some(Some(ConditionId::OUT_OF_RANGE))));
    assert_eq!(depth(), 0);
}

/// Test: exactly `MAX_DEPTH` nested regions fit.
#[test]
fn max_depth_nesting_succeeds() {
    fn nest(levels: usize) -> Outcome<Option<usize>> {
        if levels == 0 {
            return Ok(Some(depth()));
        }
        try_region(|| nest(levels - 1)).end().map(Option::flatten)
    }

    std::thread::spawn(|| {
        assert_eq!(nest(MAX_DEPTH), Ok(Some(MAX_DEPTH)));
        assert_eq!(depth(), 0);
    })
    .join()
    .unwrap();
}

/// Test: `recatch` keeps the identifier while re-raising.
#[test]
fn recatch_preserves_identifier() {
    let result = try_region(|| {
        recatch(|| -> Outcome<()> {
            raise(ConditionId::ALLOC_FAILED)?;
            Ok(())
        })?;
        Ok(None)
    })
    .default(|id| Ok(Some(id)))
    .end();
    assert_eq!(result, Ok(Some(ConditionId::ALLOC_FAILED)));
}

/// Test: a full registry raises `TOO_MANY_RESOLVERS`, which regions catch
/// like any other condition.
#[test]
fn registry_exhaustion_is_catchable() {
    fn first(_: ConditionId) -> Option<&'static str> {
        None
    }
    fn second(_: ConditionId) -> Option<&'static str> {
        Some("second")
    }

    let mut registry = LabelRegistry::<1>::new();
    let result = try_region(|| {
        registry.register(first)?;
        registry.register(first)?;
        registry.register(second)?;
        Ok(false)
    })
    .catch(ConditionId::TOO_MANY_RESOLVERS, |_| Ok(true))
    .end();

    assert_eq!(result, Ok(Some(true)));
    assert_eq!(registry.len(), 1);
}
