use super::*;

#[test]
fn whole_pads_and_signs() {
    assert_eq!(whole(12345, 0), "+12345");
    assert_eq!(whole(8, 11), "         +8");
    assert_eq!(whole(-3, 5), "   -3");
}

#[test]
fn fixed_respects_sign_and_places() {
    assert_eq!(fixed(3.14159, -8, 3), "   3.142");
    assert_eq!(fixed(-2.5, 6, 1), "  -2.5");
}

#[test]
fn float_normalizes_scientific() {
    assert_eq!(float(6.022e23, -12, 4, 2), "6.0220e+23");
}

#[test]
fn float_forces_mantissa_sign_when_width_nonnegative() {
    let out = float(6.022e23, 12, 4, 2);
    assert_eq!(out, "+6.0220e+23");
}

#[test]
fn parse_format_splits_literal_and_pattern() {
    let items = parse_format("3d.2d").unwrap();
    assert_eq!(
        items,
        vec![FormatItem::Pattern(Pattern {
            integral_digits: 3,
            frac_digits: Some(2),
            forced_sign: false
        })]
    );
}

#[test]
fn parse_format_passes_through_unknown_insertions() {
    let items = parse_format("l3dx").unwrap();
    assert_eq!(
        items,
        vec![
            FormatItem::Literal("l".to_string()),
            FormatItem::Pattern(Pattern {
                integral_digits: 3,
                frac_digits: None,
                forced_sign: false
            }),
            FormatItem::Literal("x".to_string()),
        ]
    );
}

#[test]
fn apply_pattern_zero_pads_and_applies_places() {
    let pattern = Pattern {
        integral_digits: 3,
        frac_digits: Some(2),
        forced_sign: false,
    };
    assert_eq!(apply_pattern(&pattern, 1.23), "001.23");
}

#[test]
fn apply_pattern_integral_only_rounds() {
    let pattern = Pattern {
        integral_digits: 2,
        frac_digits: None,
        forced_sign: true,
    };
    assert_eq!(apply_pattern(&pattern, 7.0), "+07");
}

proptest::proptest! {
    /// `whole` always signs its output, and only ever pads with leading spaces —
    /// it never truncates regardless of how wide the requested column is.
    #[test]
    fn whole_always_signed_and_wide_enough(value: i64, width in 0i64..40) {
        let out = whole(value, width);
        proptest::prop_assert!(out.starts_with('+') || out.starts_with('-'));
        proptest::prop_assert!(out.chars().count() >= width as usize);
    }

    /// `pad` never shortens `body`, and only ever pads with spaces up to `width`.
    #[test]
    fn pad_never_truncates(body in "[a-zA-Z0-9+-]{0,16}", width in 0i64..40) {
        let out = pad(&body, width);
        proptest::prop_assert!(out.ends_with(&body));
        proptest::prop_assert!(out.chars().count() >= body.chars().count());
        proptest::prop_assert!(out.chars().count() >= width as usize);
    }
}
