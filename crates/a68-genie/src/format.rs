// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Formatted transput (C10): the `whole`/`fixed`/`float` standard formatters and the
//! `FORMAT` picture engine behind `printf`/`readf`.
//!
//! Grounded in the Revised Report's stated conventions for the three standard
//! formatters (no `transput.c` source was available to crib from, see `SPEC_FULL.md`
//! §11.3) and, for pictures, a pragmatic subset of `format.c`'s insertion/pattern
//! grammar: `[+|-]<n>d[.<n>d][e<n>d]`, enough to drive `printf`/`readf` over
//! `INT`/`REAL` moulds without the full C-style `%d`/`%e`/`%s` variant set or
//! `COMPLEX`/`BITS`/`CHOICE` pictures.

use crate::error::RuntimeError;

/// `whole(n, width)`: a signed integer, right-justified in `width` columns (§8 S1).
/// `width == 0` means "natural width, no padding".
#[must_use]
pub fn whole(value: i64, width: i64) -> String {
    let sign = if value < 0 { "-" } else { "+" };
    let body = format!("{sign}{}", value.unsigned_abs());
    pad(&body, width)
}

/// `fixed(x, width, places)`: fixed-point notation with `places` digits after the
/// point (§8 S2). A negative `width` suppresses the `+` sign on non-negative values
/// (only `-` is ever forced); a non-negative `width` always shows a sign.
#[must_use]
pub fn fixed(value: f64, width: i64, places: i64) -> String {
    let places = places.max(0) as usize;
    let sign_optional = width < 0;
    let sign = if value.is_sign_negative() && value != 0.0 {
        "-"
    } else if sign_optional {
        ""
    } else {
        "+"
    };
    let body = format!("{sign}{:.*}", places, value.abs());
    pad(&body, width)
}

/// `float(x, width, mantissa_digits, exp_digits)`: scientific notation with a forced
/// sign on both mantissa and exponent (§8 S3), right-justified in `width` columns.
#[must_use]
pub fn float(value: f64, width: i64, mantissa_digits: i64, exp_digits: i64) -> String {
    let mantissa_digits = mantissa_digits.max(0) as usize;
    let exp_digits = exp_digits.max(0) as usize;
    let (mantissa, exponent) = normalize_scientific(value, mantissa_digits);
    let value_sign = if value.is_sign_negative() && value != 0.0 { "-" } else { "+" };
    let exp_sign = if exponent < 0 { "-" } else { "+" };
    let body = format!(
        "{value_sign}{:.*}e{exp_sign}{:0width$}",
        mantissa_digits,
        mantissa,
        exponent.unsigned_abs(),
        width = exp_digits
    );
    pad(&body, width)
}

/// Right-justifies `body` to `abs(width)` columns with spaces. `width == 0` leaves
/// `body` untouched (natural width).
fn pad(body: &str, width: i64) -> String {
    let target = width.unsigned_abs() as usize;
    if target <= body.chars().count() {
        return body.to_string();
    }
    let padding = target - body.chars().count();
    format!("{}{body}", " ".repeat(padding))
}

/// Normalizes `value.abs()` to `d.ddd * 10^exponent` with one nonzero leading digit,
/// rounding the mantissa to `mantissa_digits` decimal places and bumping the exponent
/// if rounding carries the mantissa up to `10.0`.
fn normalize_scientific(value: f64, mantissa_digits: usize) -> (f64, i32) {
    let abs = value.abs();
    if abs == 0.0 {
        return (0.0, 0);
    }
    let mut exponent = abs.log10().floor() as i32;
    let mut mantissa = abs / 10f64.powi(exponent);
    let scale = 10f64.powi(mantissa_digits as i32);
    let rounded = (mantissa * scale).round() / scale;
    if rounded >= 10.0 {
        mantissa = rounded / 10.0;
        exponent += 1;
    } else {
        mantissa = rounded;
    }
    (mantissa, exponent)
}

/// One item of a parsed `FORMAT` picture list: either passed-through literal text
/// (insertions this subset doesn't specialise: `l`/`L`, `x`/`X`, plain characters) or
/// a numeric mould pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatItem {
    Literal(String),
    Pattern(Pattern),
}

/// An `INTEGRAL` or `REAL` mould: `integral_digits` zero-padded leading digits,
/// optionally followed by a point and `frac_digits` fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    pub integral_digits: usize,
    pub frac_digits: Option<usize>,
    pub forced_sign: bool,
}

/// Parses the raw text between a `FORMAT-TEXT`'s `$...$` delimiters into a picture
/// list. Unrecognised characters pass through as literal insertions rather than
/// erroring, matching the "pragmatic subset" stance taken throughout this workspace.
pub fn parse_format(text: &str) -> Result<Vec<FormatItem>, RuntimeError> {
    let chars: Vec<char> = text.chars().collect();
    let mut items = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '+' || c == '-' || c.is_ascii_digit() || c == 'd' || c == 'D' {
            if let Some((pattern, consumed)) = try_parse_pattern(&chars[i..]) {
                if !literal.is_empty() {
                    items.push(FormatItem::Literal(std::mem::take(&mut literal)));
                }
                items.push(FormatItem::Pattern(pattern));
                i += consumed;
                continue;
            }
        }
        literal.push(c);
        i += 1;
    }
    if !literal.is_empty() {
        items.push(FormatItem::Literal(literal));
    }
    Ok(items)
}

/// Tries to consume a `[+|-]<n>d[.<n>d]` mould starting at `chars[0]`. Returns the
/// parsed pattern and how many characters it consumed, or `None` if `chars` doesn't
/// start with a recognisable mould (the caller then treats the lead character as a
/// literal insertion).
fn try_parse_pattern(chars: &[char]) -> Option<(Pattern, usize)> {
    let mut i = 0;
    let forced_sign = matches!(chars.first(), Some('+') | Some('-'));
    if forced_sign {
        i += 1;
    }
    let (integral_digits, consumed) = parse_mould(&chars[i..])?;
    i += consumed;
    if integral_digits == 0 {
        return None;
    }
    let mut frac_digits = None;
    if chars.get(i) == Some(&'.') {
        if let Some((digits, consumed)) = parse_mould(&chars[i + 1..]) {
            frac_digits = Some(digits);
            i += 1 + consumed;
        }
    }
    Some((Pattern { integral_digits, frac_digits, forced_sign }, i))
}

/// A mould is either `<n>d` (a repetition count followed by one `d`) or a run of
/// literal `d`/`D` characters (`"ddd"` means three digits), per `format.c`'s replicator
/// convention (§4.10).
fn parse_mould(chars: &[char]) -> Option<(usize, usize)> {
    let digit_run: String = chars.iter().take_while(|c| c.is_ascii_digit()).collect();
    if !digit_run.is_empty() {
        let mut i = digit_run.len();
        if matches!(chars.get(i), Some('d') | Some('D')) {
            i += 1;
            return digit_run.parse().ok().map(|n: usize| (n, i));
        }
        return None;
    }
    let d_run = chars.iter().take_while(|c| **c == 'd' || **c == 'D').count();
    if d_run == 0 {
        None
    } else {
        Some((d_run, d_run))
    }
}

/// Applies an `INTEGRAL` or `REAL` pattern to a value already converted to `f64`
/// (callers widen `INT`/`BITS` moulds to `f64` before calling this, since the mould
/// logic — zero-padding, optional point — is identical either way).
#[must_use]
pub fn apply_pattern(pattern: &Pattern, value: f64) -> String {
    let negative = value.is_sign_negative() && value != 0.0;
    let sign = if negative {
        "-"
    } else if pattern.forced_sign {
        "+"
    } else {
        ""
    };
    match pattern.frac_digits {
        Some(frac) => {
            let formatted = format!("{:.*}", frac, value.abs());
            let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));
            format!("{sign}{:0width$}.{frac_part}", int_part, width = pattern.integral_digits)
        }
        None => {
            let rounded = value.abs().round() as i128;
            format!("{sign}{:0width$}", rounded, width = pattern.integral_digits)
        }
    }
}

#[cfg(test)]
mod format_test;
