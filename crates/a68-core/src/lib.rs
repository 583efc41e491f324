// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Foundational types shared by every other crate in this workspace.
//!
//! This crate provides:
//! - Source spans and source-file identity (`Span`, `SourceId`)
//! - Diagnostic severities shared by syntax, mode, and runtime errors
//! - `EngineLimits`, the configuration record for region sizes, precision and time limits
//! - Small numeric-width helpers used by the formatter and the value layout

pub mod limits;
pub mod numeric;
pub mod severity;
pub mod span;

pub use limits::EngineLimits;
pub use severity::Severity;
pub use span::{SourceId, Span};
