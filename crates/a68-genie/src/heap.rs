// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! The GC heap (C2): a handle-indexed arena of stowed values.
//!
//! `ROW` and `STRUCT` values live here, addressed by [`Handle`] rather than by
//! pointer, mirroring the teacher's own `Vaddr`-by-index addressing
//! (`heap/mod.rs::alloc`) — reimplemented as a safe `Vec`-backed arena instead of a
//! raw byte buffer. A mark-and-sweep pass (no compaction: see `DESIGN.md`) reclaims
//! unreachable slots for reuse rather than ever shrinking the arena.

use a68_core::Span;
use a68_modes::ModeId;

use crate::error::RuntimeError;
use crate::value::{Reference, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct RowObject {
    pub mode: ModeId,
    /// `(lower, upper)` per dimension, inclusive, Revised Report convention.
    pub bounds: Vec<(i64, i64)>,
    /// Row-major flattened elements. Empty iff any dimension has `upper < lower`.
    pub elements: Vec<Value>,
}

impl RowObject {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Flat index of `indices` (one per dimension, Revised Report order), or the
    /// offending `(index, lower, upper)` triple on an out-of-bounds access.
    pub fn offset(&self, indices: &[i64]) -> Result<usize, (i64, i64, i64)> {
        let mut offset = 0usize;
        for (dim, &ix) in indices.iter().enumerate() {
            let (lower, upper) = self.bounds[dim];
            if ix < lower || ix > upper {
                return Err((ix, lower, upper));
            }
            let extent = (upper - lower + 1) as usize;
            let local = (ix - lower) as usize;
            offset = offset * extent + local;
        }
        Ok(offset)
    }
}

#[derive(Debug)]
pub enum HeapObject {
    Row(RowObject),
    Struct { mode: ModeId, fields: Vec<Value> },
    /// A single boxed scalar: the heap-side target of a `LOC`/`HEAP` generator whose
    /// declarer isn't itself stowed (`HEAP INT`, `HEAP REF REAL`, ...). `ROW`/`STRUCT`
    /// generators skip this wrapper entirely since they already have an addressable
    /// heap object of their own (see `engine.rs::execute_generator`).
    Cell(Value),
}

/// Handle-indexed arena with free-list reuse after a collection pass.
pub struct Heap {
    slots: Vec<Option<HeapObject>>,
    marked: Vec<bool>,
    free: Vec<u32>,
    max_handles: usize,
    cell_budget: usize,
    cells_used: usize,
    /// Handles a collection pass must always mark regardless of frame reachability:
    /// cached constant denoters (§4.6), which stay reachable through `PropagatorCache`
    /// rather than through any frame slot.
    protected: std::collections::HashSet<Handle>,
}

impl Heap {
    #[must_use]
    pub fn new(max_handles: usize, cell_budget: usize) -> Self {
        Self {
            slots: Vec::new(),
            marked: Vec::new(),
            free: Vec::new(),
            max_handles,
            cell_budget,
            cells_used: 0,
            protected: std::collections::HashSet::new(),
        }
    }

    /// Pins `handle` as a permanent extra root. Used for constant-cached denoters,
    /// never unprotected: a denoter's heap copy lives for the rest of the run once
    /// created, same as the frame its defining closure pins (`FrameStack::retain`).
    pub fn protect(&mut self, handle: Handle) {
        self.protected.insert(handle);
    }

    /// Marks every permanently protected handle, in addition to whatever `mark`
    /// finds reachable from frame roots.
    pub fn mark_protected(&mut self) {
        let handles: Vec<Handle> = self.protected.iter().copied().collect();
        for h in handles {
            self.mark(h);
        }
    }

    fn cells_of(obj: &HeapObject) -> usize {
        match obj {
            HeapObject::Row(row) => row.elements.len().max(1),
            HeapObject::Struct { fields, .. } => fields.len().max(1),
            HeapObject::Cell(_) => 1,
        }
    }

    pub fn alloc(&mut self, obj: HeapObject, span: Span) -> Result<Handle, RuntimeError> {
        let cells = Self::cells_of(&obj);
        if self.cells_used + cells > self.cell_budget {
            return Err(RuntimeError::HeapExhausted { span });
        }
        self.cells_used += cells;
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(obj);
            self.marked[idx as usize] = false;
            return Ok(Handle(idx));
        }
        if self.slots.len() >= self.max_handles {
            return Err(RuntimeError::HandleTableExhausted { span });
        }
        let idx = u32::try_from(self.slots.len()).expect("handle table exceeds u32::MAX");
        self.slots.push(Some(obj));
        self.marked.push(false);
        Ok(Handle(idx))
    }

    #[must_use]
    pub fn get(&self, handle: Handle) -> &HeapObject {
        self.slots[handle.index()].as_ref().expect("dangling handle: object was swept")
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut HeapObject {
        self.slots[handle.index()].as_mut().expect("dangling handle: object was swept")
    }

    /// Marks `handle` and everything transitively reachable from it as live.
    pub fn mark(&mut self, handle: Handle) {
        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            if self.marked[h.index()] {
                continue;
            }
            self.marked[h.index()] = true;
            if let Some(obj) = &self.slots[h.index()] {
                match obj {
                    HeapObject::Row(row) => {
                        for v in &row.elements {
                            collect_handles(v, &mut stack);
                        }
                    }
                    HeapObject::Struct { fields, .. } => {
                        for v in fields {
                            collect_handles(v, &mut stack);
                        }
                    }
                    HeapObject::Cell(v) => collect_handles(v, &mut stack),
                }
            }
        }
    }

    pub fn mark_value(&mut self, value: &Value) {
        let mut stack = Vec::new();
        collect_handles(value, &mut stack);
        for h in stack {
            self.mark(h);
        }
    }

    /// True once live usage has crossed 90% of budget, the engine's cue to run a
    /// mark-sweep pass (§4.2) rather than waiting for an outright allocation failure.
    #[must_use]
    pub fn is_under_pressure(&self) -> bool {
        self.cells_used * 10 >= self.cell_budget * 9
    }

    /// Frees every unmarked slot and clears mark bits for the next pass.
    pub fn sweep(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !self.marked[i] {
                let freed = slot.take().map(|o| Self::cells_of(&o)).unwrap_or(0);
                self.cells_used = self.cells_used.saturating_sub(freed);
                self.free.push(u32::try_from(i).expect("handle index overflow"));
            }
        }
        self.marked.iter_mut().for_each(|m| *m = false);
    }
}

fn collect_handles(value: &Value, out: &mut Vec<Handle>) {
    match value {
        Value::Row(h) | Value::Struct(h) => out.push(*h),
        Value::Union(_, inner) => collect_handles(inner, out),
        Value::Ref(Reference::Heap { handle, .. })
        | Value::Ref(Reference::Element { handle, .. })
        | Value::Ref(Reference::Field { handle, .. }) => out.push(*handle),
        _ => {}
    }
}
