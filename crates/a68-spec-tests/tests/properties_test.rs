//! The seven testable properties (§8): scope soundness, deref round-trip, row-copy
//! invariance, slice bounds, GC transparency, constant caching, and loop iteration count.

use a68_test::{TestRun, TestRunError, run_source};

#[test]
fn property1_scope_violation_is_rejected() {
    let program = r#"
        REF INT p;
        BEGIN
          INT x := 1;
          p := x
        END;
        print((p))
        "#;
    let err = run_source(program).expect_err("storing an inner name's address in an outer-lived variable must fail");
    assert!(matches!(err, TestRunError::Runtime(_)), "expected a scope runtime error, got {err:?}");
}

#[test]
fn property2_deref_round_trip_for_scalars() {
    let out = run_source("REF INT n = LOC INT; n := 42; print((n))").expect("program runs");
    assert_eq!(out, "        +42");
}

#[test]
fn property3_row_copy_invariance() {
    let program = r#"
        [1:3] INT x := (1, 2, 3);
        [1:3] INT y := x;
        x[1] := 99;
        print((y[1]))
        "#;
    let out = run_source(program).expect("program runs");
    assert_eq!(out, "         +2", "mutating x through its own handle must not alter y");
}

#[test]
fn property4_slice_bounds_in_range() {
    let program = "[1:3] INT a := (10, 20, 30); print((a[3]))";
    let out = run_source(program).expect("program runs");
    assert_eq!(out, "        +30");
}

#[test]
fn property4_slice_bounds_out_of_range_raises_error() {
    let program = "[1:3] INT a := (10, 20, 30); print((a[4]))";
    let err = run_source(program).expect_err("index 4 is outside [1:3]");
    assert!(matches!(err, TestRunError::Runtime(_)));
}

#[test]
fn property7_loop_termination_count() {
    let program = r#"
        INT count := 0;
        FOR i FROM 1 BY 2 TO 10 DO count := count + 1 OD;
        print((count))
        "#;
    // max(0, floor((10-1)/2)+1) = max(0, 4+1) = 5
    let out = run_source(program).expect("program runs");
    assert_eq!(out, "         +5");
}

#[test]
fn property7_loop_zero_iterations_when_direction_disagrees() {
    let program = r#"
        INT count := 0;
        FOR i FROM 10 BY 1 TO 1 DO count := count + 1 OD;
        print((count))
        "#;
    let out = run_source(program).expect("program runs");
    assert_eq!(out, "         +0");
}

#[test]
fn property5_small_heap_budget_does_not_disturb_observable_values() {
    let mut limits = a68_core::EngineLimits::default();
    limits.heap_bytes = 64;
    let program = r#"
        [1:3] INT a := (1, 2, 3);
        [1:3] INT b := (4, 5, 6);
        [1:3] INT c := (7, 8, 9);
        print((a[1], b[2], c[3]))
        "#;
    let mut run = TestRun::with_limits(program, limits).expect("parses and mode-checks");
    let out = run.run().expect("program runs under a tight heap budget");
    assert_eq!(out, "         +1         +5         +9");
}
