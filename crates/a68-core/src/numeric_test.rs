// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

use super::*;

#[test]
fn plain_mode_keeps_base_width() {
    assert_eq!(scaled_width(INT_WIDTH, 0), INT_WIDTH);
}

#[test]
fn long_mode_widens() {
    assert!(scaled_width(INT_WIDTH, 1) > INT_WIDTH);
    assert!(scaled_width(INT_WIDTH, 2) > scaled_width(INT_WIDTH, 1));
}

#[test]
fn short_mode_narrows_but_stays_positive() {
    let narrowed = scaled_width(INT_WIDTH, -1);
    assert!(narrowed > 0);
    assert!(narrowed <= INT_WIDTH);
}

proptest::proptest! {
    /// Every width `decorate.rs` can actually request (`SHORT SHORT` through
    /// `LONG LONG`, i.e. `extra_longs` in `-2..=2`) stays positive and widening never
    /// narrows relative to the plain mode.
    #[test]
    fn scaled_width_stays_positive(base in 1usize..64, extra_longs in -2i32..=2) {
        let width = scaled_width(base, extra_longs);
        proptest::prop_assert!(width > 0);
        if extra_longs >= 0 {
            proptest::prop_assert!(width >= base);
        } else {
            proptest::prop_assert!(width <= base);
        }
    }
}
