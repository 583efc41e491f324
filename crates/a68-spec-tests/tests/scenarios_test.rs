//! End-to-end scenarios S1-S6: whole program text in, captured stdout out.

use a68_test::run_source;

#[test]
fn s1_whole_formatter() {
    let out = run_source("print((whole(12345, 0)))").expect("program runs");
    assert_eq!(out, "+12345");
}

#[test]
fn s2_fixed_formatter() {
    let out = run_source("print((fixed(3.14159, -8, 3)))").expect("program runs");
    assert_eq!(out, "   3.142");
}

#[test]
fn s3_floating_formatter() {
    let out = run_source("print((float(6.022e23, -12, 4, 2)))").expect("program runs");
    assert_eq!(out, " +6.0220e+23");
}

#[test]
fn s4_row_slice() {
    let out = run_source("[1:3] INT a := (7, 8, 9); print((a[2]))").expect("program runs");
    assert_eq!(out, "         +8");
}

#[test]
fn s5_format_text_round_trip() {
    let out = run_source(
        r#"
        FORMAT f = $3d.2d$;
        printf ((f, 1.23))
        "#,
    )
    .expect("program runs");
    assert_eq!(out, "001.23");
}

#[test]
fn s6_non_local_jump() {
    let out = run_source(
        r#"
        BEGIN
          proc: GOTO out;
          print(("unreachable"));
          out: print(("ok"))
        END
        "#,
    )
    .expect("program runs");
    assert_eq!(out, "ok");
}
