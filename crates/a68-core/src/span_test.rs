// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

use super::*;

#[test]
fn merge_takes_earliest_start_and_latest_end() {
    let src = SourceId::new(0);
    let a = Span::new(src, 10, 20, 2, 3);
    let b = Span::new(src, 5, 15, 1, 1);
    let merged = a.merge(b);
    assert_eq!(merged.start, 5);
    assert_eq!(merged.end, 20);
    assert_eq!(merged.line, 1);
    assert_eq!(merged.column, 1);
}

#[test]
fn len_and_is_empty() {
    let src = SourceId::new(0);
    let empty = Span::synthetic(src);
    assert!(empty.is_empty());
    assert_eq!(empty.len(), 0);

    let non_empty = Span::new(src, 0, 4, 1, 1);
    assert!(!non_empty.is_empty());
    assert_eq!(non_empty.len(), 4);
}

#[test]
fn display_shows_line_and_column() {
    let src = SourceId::new(0);
    let span = Span::new(src, 0, 1, 7, 12);
    assert_eq!(span.to_string(), "7:12");
}
