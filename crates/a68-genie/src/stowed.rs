// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Stowed-value deep copy and default-value construction (C4).
//!
//! `ROW`/`STRUCT`/`UNION` assignment, parameter passing, and identity declarations all
//! copy rather than alias: a generic depth-first walk driven by `ModeTable`, grounded
//! on the teacher's `realm/copy.rs` allocate-before-recurse `deep_copy_to_realm`.

use a68_core::Span;
use a68_modes::{Mode, ModeId, ModeTable};

use crate::error::RuntimeError;
use crate::heap::{Heap, HeapObject};
use crate::value::{Reference, Value};

/// Deep-copies a value. Scalars and `REF`s copy trivially (a name copies the pointer
/// it denotes, never what it denotes — Algol 68 assignment to `REF` variables is
/// itself just a scalar copy); `ROW`/`STRUCT` allocate fresh heap objects and copy
/// their contents recursively; `UNION` copies its tag and recursively copies its
/// payload.
pub fn deep_copy(modes: &ModeTable, heap: &mut Heap, value: &Value, span: Span) -> Result<Value, RuntimeError> {
    match value {
        Value::Row(h) => {
            let row = match heap.get(*h) {
                HeapObject::Row(row) => row,
                _ => unreachable!("Value::Row handle must point at a RowObject"),
            };
            let elem_mode = match modes.get(row.mode) {
                Mode::Row { elem, .. } => *elem,
                _ => row.mode,
            };
            let source_mode = row.mode;
            let bounds = row.bounds.clone();
            let source_elements = row.elements.clone();
            let mut elements = Vec::with_capacity(source_elements.len());
            for v in &source_elements {
                elements.push(deep_copy_as(modes, heap, v, elem_mode, span)?);
            }
            let handle = heap.alloc(
                HeapObject::Row(crate::heap::RowObject {
                    mode: source_mode,
                    bounds,
                    elements,
                }),
                span,
            )?;
            Ok(Value::Row(handle))
        }
        Value::Struct(h) => {
            let (mode, source_fields) = match heap.get(*h) {
                HeapObject::Struct { mode, fields } => (*mode, fields.clone()),
                _ => unreachable!("Value::Struct handle must point at a struct HeapObject"),
            };
            let field_modes = modes.struct_fields(mode);
            let mut out = Vec::with_capacity(source_fields.len());
            for (v, (_, fmode, _)) in source_fields.iter().zip(field_modes.iter()) {
                out.push(deep_copy_as(modes, heap, v, *fmode, span)?);
            }
            let handle = heap.alloc(HeapObject::Struct { mode, fields: out }, span)?;
            Ok(Value::Struct(handle))
        }
        Value::Union(tag, inner) => Ok(Value::Union(*tag, Box::new(deep_copy_as(modes, heap, inner, *tag, span)?))),
        other => Ok(other.clone()),
    }
}

/// As `deep_copy`, but dispatches on a known element/field mode instead of
/// rediscovering it from the value — needed when the value came from a generic slot
/// (a union payload, a freshly defaulted element) rather than a live heap object.
fn deep_copy_as(modes: &ModeTable, heap: &mut Heap, value: &Value, _mode: ModeId, span: Span) -> Result<Value, RuntimeError> {
    deep_copy(modes, heap, value, span)
}

/// The default ("undefined" in the Revised Report) value of a scalar or `STRUCT`
/// mode: an [`Value::Empty`] marker that raises `EMPTY-VALUE` on its first read
/// (§4.3), rather than a concrete zero. `ROW` modes can't be defaulted from the mode
/// alone — their bounds come from the generator's bound expressions — so the
/// engine's generator evaluation builds `ROW` defaults itself, element-by-element,
/// via this same function for each element mode.
pub fn zero_value(modes: &ModeTable, heap: &mut Heap, mode: ModeId, span: Span) -> Result<Value, RuntimeError> {
    match modes.get(mode).clone() {
        Mode::Void => Ok(Value::Void),
        Mode::Numeric(..) | Mode::Bool | Mode::Char | Mode::Bits => Ok(Value::Empty(mode)),
        Mode::String => {
            let handle = heap.alloc(
                HeapObject::Row(crate::heap::RowObject {
                    mode,
                    bounds: vec![(1, 0)],
                    elements: Vec::new(),
                }),
                span,
            )?;
            Ok(Value::Row(handle))
        }
        Mode::Format => Ok(Value::Void),
        Mode::Ref(_) => Ok(Value::Ref(Reference::Nil)),
        Mode::Row { .. } => Ok(Value::Void),
        Mode::Struct(fields) => {
            let mut out = Vec::with_capacity(fields.len());
            for (_, fmode) in &fields {
                out.push(zero_value(modes, heap, *fmode, span)?);
            }
            let handle = heap.alloc(HeapObject::Struct { mode, fields: out }, span)?;
            Ok(Value::Struct(handle))
        }
        Mode::Union(variants) => {
            let first = *variants.first().unwrap_or(&mode);
            Ok(Value::Union(first, Box::new(zero_value(modes, heap, first, span)?)))
        }
        Mode::Proc { .. } | Mode::File => Ok(Value::Void),
    }
}
