// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Mode resolution, symbol-table construction, and offset assignment.
//!
//! Decorates an [`a68_syntax::Tree`] with the mode and tag information the genie
//! trusts, without mutating the tree itself (see `a68_syntax::node` for why). A
//! pragmatic subset of the Revised Report's mode-equivalence and coercion-insertion
//! algorithm is implemented — enough to resolve every identifier and label to a
//! concrete frame slot and every expression to a concrete mode for the language subset
//! this workspace supports, not the full firmness/coercion lattice.

pub mod decorate;
pub mod error;
pub mod mode;
pub mod symtab;

pub use decorate::{Decoration, DecoratedTree, elaborate};
pub use error::ModeError;
pub use mode::{Mode, ModeId, ModeTable};
pub use symtab::{GeneratorScope, ResolvedTag, Scope, SymbolTables, Tag, TagKind, TableId};
