// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Mode-check diagnostics (§7 "Mode check" and the subset of "Syntax/elaboration"
//! that `a68-modes` itself detects: undeclared tags, multiple declaration, invalid
//! priority).

use std::fmt;

use a68_core::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    UndeclaredTag { name: String, span: Span },
    MultipleDeclaration { name: String, span: Span },
    NoUniqueMode { detail: String, span: Span },
    CannotWiden { from: String, to: String, span: Span },
    NotFirmlyRelated { member: String, union: String, span: Span },
    NoComponent { field: String, mode: String, span: Span },
    InvalidPriority { level: i64, span: Span },
    LabelInParallelClause { name: String, span: Span },
}

impl ModeError {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            ModeError::UndeclaredTag { span, .. }
            | ModeError::MultipleDeclaration { span, .. }
            | ModeError::NoUniqueMode { span, .. }
            | ModeError::CannotWiden { span, .. }
            | ModeError::NotFirmlyRelated { span, .. }
            | ModeError::NoComponent { span, .. }
            | ModeError::InvalidPriority { span, .. }
            | ModeError::LabelInParallelClause { span, .. } => *span,
        }
    }
}

impl fmt::Display for ModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeError::UndeclaredTag { name, .. } => write!(f, "undeclared tag '{name}'"),
            ModeError::MultipleDeclaration { name, .. } => write!(f, "'{name}' declared more than once in this range"),
            ModeError::NoUniqueMode { detail, .. } => write!(f, "no unique mode: {detail}"),
            ModeError::CannotWiden { from, to, .. } => write!(f, "cannot widen {from} to {to}"),
            ModeError::NotFirmlyRelated { member, union, .. } => {
                write!(f, "{member} is not firmly related to {union}")
            }
            ModeError::NoComponent { field, mode, .. } => write!(f, "mode {mode} has no component '{field}'"),
            ModeError::InvalidPriority { level, .. } => write!(f, "invalid priority level {level}, must be 1..9"),
            ModeError::LabelInParallelClause { name, .. } => {
                write!(f, "label '{name}' declared inside a parallel clause")
            }
        }
    }
}

impl std::error::Error for ModeError {}
