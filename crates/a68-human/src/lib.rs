// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Human-readable rendering of the three diagnostic taxonomies (F4): `a68-syntax`'s
//! `ParseError`, `a68-modes`'s `ModeError`, and `a68-genie`'s `RuntimeError`.
//!
//! A [`Span`] carries only byte offsets and a 1-based line/column of its start, not the
//! source text itself, so every render call here takes the loaded source alongside the
//! diagnostic. The CLI driver owns that text for as long as it's running a program and
//! passes it down rather than this crate caching its own copy.

use std::fmt;

use a68_core::{Severity, Span};
use a68_genie::error::RuntimeError;
use a68_modes::error::ModeError;
use a68_syntax::parser::ParseError;

/// A rendered diagnostic: severity, message, and an optional source location.
///
/// `span` is `None` only for the handful of `RuntimeError` variants that have no
/// meaningful source position (`TimeLimitExceeded`, `Interrupted`).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    #[must_use]
    pub fn from_parse_error(error: &ParseError) -> Self {
        Self {
            severity: Severity::Fatal,
            message: error.to_string(),
            span: Some(error.span()),
        }
    }

    #[must_use]
    pub fn from_mode_error(error: &ModeError) -> Self {
        Self {
            severity: Severity::Error,
            message: error.to_string(),
            span: Some(error.span()),
        }
    }

    #[must_use]
    pub fn from_runtime_error(error: &RuntimeError) -> Self {
        Self {
            severity: Severity::Fatal,
            message: error.to_string(),
            span: error.span(),
        }
    }

    /// Renders as `severity: message`, plus a `-->` location line and a source
    /// excerpt with a `^` caret under the offending column, when `source` still
    /// covers the span (it may not, for a synthesized or cross-file span).
    #[must_use]
    pub fn render(&self, source: &str) -> String {
        let mut out = format!("{}: {}", self.severity, self.message);
        let Some(span) = self.span else {
            return out;
        };
        out.push_str(&format!("\n  --> {span}"));
        if let Some(line_text) = line_at(source, span.start as usize, span.line) {
            let gutter = span.line.to_string();
            let pad = " ".repeat(gutter.len());
            out.push_str(&format!("\n{pad} |\n{gutter} | {line_text}\n{pad} | "));
            let caret_col = span.column.saturating_sub(1) as usize;
            out.push_str(&" ".repeat(caret_col));
            let width = span.len().max(1) as usize;
            out.push_str(&"^".repeat(width.min(line_text.len().saturating_sub(caret_col).max(1))));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Extracts the full text of the line containing byte offset `start`, given that line's
/// known 1-based number (used only to label the gutter; the text itself is found by
/// scanning `source` for the newlines bracketing `start`).
fn line_at(source: &str, start: usize, _line_number: u32) -> Option<&str> {
    if start > source.len() {
        return None;
    }
    let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[start..].find('\n').map_or(source.len(), |i| start + i);
    Some(&source[line_start..line_end])
}

/// Collects every `ModeError` produced by a mode-check pass into rendered diagnostics,
/// in the order elaboration reported them.
#[must_use]
pub fn render_mode_errors(errors: &[ModeError], source: &str) -> Vec<String> {
    errors.iter().map(|e| Diagnostic::from_mode_error(e).render(source)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use a68_core::SourceId;

    fn span(start: u32, end: u32, line: u32, column: u32) -> Span {
        Span::new(SourceId::new(0), start, end, line, column)
    }

    #[test]
    fn renders_caret_under_offending_column() {
        let source = "BEGIN\n  print (x)\nEND";
        let err = ModeError::UndeclaredTag { name: "x".to_string(), span: span(15, 16, 2, 10) };
        let rendered = Diagnostic::from_mode_error(&err).render(source);
        assert!(rendered.contains("undeclared tag 'x'"));
        assert!(rendered.contains("print (x)"));
        assert!(rendered.contains('^'));
    }

    #[test]
    fn runtime_error_without_span_still_renders_message() {
        let err = RuntimeError::TimeLimitExceeded;
        let rendered = Diagnostic::from_runtime_error(&err).render("");
        assert_eq!(rendered, "fatal error: time limit exceeded");
    }

    #[test]
    fn line_at_handles_first_and_last_line() {
        let source = "one\ntwo\nthree";
        assert_eq!(line_at(source, 0, 1), Some("one"));
        assert_eq!(line_at(source, 8, 3), Some("three"));
    }
}
