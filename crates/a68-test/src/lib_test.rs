use super::*;

#[test]
fn run_source_captures_stdout() {
    let out = run_source("print((\"hello\"))").expect("program runs");
    assert_eq!(out, "hello");
}

#[test]
fn run_source_reports_parse_error() {
    let err = run_source("BEGIN print((1))").expect_err("missing END");
    assert!(matches!(err, TestRunError::Parse(_)));
}

#[test]
fn run_source_reports_mode_error() {
    let err = run_source("print((undeclared))").expect_err("undeclared tag");
    assert!(matches!(err, TestRunError::Mode(_)));
}

#[test]
fn test_run_exposes_engine_after_failure() {
    let mut run = TestRun::new("INT x := 1 / 0; print((x))").expect("parses and mode-checks");
    let err = run.run().expect_err("division by zero");
    assert!(matches!(err, TestRunError::Runtime(_)));
}
