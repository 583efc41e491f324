// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Engine configuration: region sizes, numeric precision, and time limits.
//!
//! Threaded explicitly into the engine constructor rather than read from globals, the
//! same way the reference runtime's `Process` takes its region sizes as constructor
//! arguments instead of consulting process-wide statics.

use std::fmt;
use std::time::Duration;

/// Default frame stack size: 8 MiB.
pub const DEFAULT_FRAME_STACK: usize = 8 * 1024 * 1024;
/// Default expression stack size: 4 MiB.
pub const DEFAULT_EXPR_STACK: usize = 4 * 1024 * 1024;
/// Default heap size: 32 MiB.
pub const DEFAULT_HEAP: usize = 32 * 1024 * 1024;
/// Default maximum number of live handles.
pub const DEFAULT_HANDLES: usize = 1 << 20;
/// Default minimum significant digits for LONG LONG numeric modes.
pub const DEFAULT_PRECISION: u32 = 34;
/// Number of executed units between time-limit / interrupt samples.
pub const SAMPLE_PERIOD: u64 = 25_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLimits {
    pub frame_stack_bytes: usize,
    pub expr_stack_bytes: usize,
    pub heap_bytes: usize,
    pub max_handles: usize,
    pub precision: u32,
    pub time_limit: Option<Duration>,
    pub trace: bool,
    pub assertions: bool,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            frame_stack_bytes: DEFAULT_FRAME_STACK,
            expr_stack_bytes: DEFAULT_EXPR_STACK,
            heap_bytes: DEFAULT_HEAP,
            max_handles: DEFAULT_HANDLES,
            precision: DEFAULT_PRECISION,
            time_limit: None,
            trace: false,
            assertions: true,
        }
    }
}

/// Error parsing a `--stack`/`--heap`/`--handles`/`--frame` style size argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeParseError(String);

impl fmt::Display for SizeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid size '{}': expected a number optionally followed by k, M or G", self.0)
    }
}

impl std::error::Error for SizeParseError {}

/// Parses a byte-count argument with an optional `k`/`M`/`G` suffix (case-insensitive,
/// base 1024), as accepted by `--stack`, `--heap`, `--handles`, and `--frame`.
pub fn parse_size(text: &str) -> Result<usize, SizeParseError> {
    let trimmed = text.trim();
    let (digits, multiplier) = match trimmed.chars().last() {
        Some(c) if c.eq_ignore_ascii_case(&'k') => (&trimmed[..trimmed.len() - 1], 1024),
        Some(c) if c.eq_ignore_ascii_case(&'m') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some(c) if c.eq_ignore_ascii_case(&'g') => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };
    let value: usize = digits
        .trim()
        .parse()
        .map_err(|_| SizeParseError(text.to_string()))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| SizeParseError(text.to_string()))
}

#[cfg(test)]
mod limits_test;
