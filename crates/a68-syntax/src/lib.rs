// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Lexer and recursive-descent parser for the Algol 68 Revised Report subset.
//!
//! This crate turns source text into an undecorated [`Tree`] of [`Node`]s over the
//! attribute vocabulary a68-modes and a68-genie share. It does not resolve tags, assign
//! modes, or insert coercions; that is `a68-modes`'s job.

pub mod attribute;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod token;

pub use attribute::Attribute;
pub use lexer::{LexError, Lexer};
pub use node::{Node, NodeId, Tree};
pub use parser::{ParseError, Parser};
pub use token::{Token, TokenKind};
