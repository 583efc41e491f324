// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! The frame stack (C1/C5): one activation record per range entered at run time.
//!
//! Frames are arena-allocated (`Vec`-indexed, slots reused after release) rather
//! than a literal push/pop stack over a byte buffer, because a non-local `PROC`
//! value that outlives the call that created it needs its defining frame to stay
//! addressable after that call returns — the classic funarg problem. Every frame
//! starts owned by the call that pushed it (one reference) and by its static link
//! (`push` gives the parent an extra reference, since a live child can still resolve
//! non-local tags through it); `release` drops the caller's share on normal exit
//! from the range the frame backs and, once every owner has let go, frees the slot
//! for reuse and releases the frame's own hold on its parent in turn. A closure that
//! captures a frame as its defining environment (`Value::Proc`, a user `OP`
//! declaration recorded for later calls) takes one extra reference at the point
//! it's created and never gives it back — the one case `release` can't claw back
//! without tracking every place a captured frame might still be reachable from. See
//! `DESIGN.md`.

use a68_core::Span;
use a68_modes::TableId;

use crate::error::RuntimeError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u32);

impl FrameId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct Frame {
    pub table: TableId,
    /// Static link: the lexically enclosing frame, used to resolve non-local tags.
    pub parent: Option<FrameId>,
    pub slots: Vec<Value>,
    size: usize,
    ref_count: u32,
}

/// Handle-indexed arena with free-list reuse after a frame's last owner releases it,
/// mirroring `Heap`'s own slot-reuse discipline.
pub struct FrameStack {
    frames: Vec<Option<Frame>>,
    free: Vec<u32>,
    cell_budget: usize,
    cells_used: usize,
}

impl FrameStack {
    #[must_use]
    pub fn new(cell_budget: usize) -> Self {
        Self {
            frames: Vec::new(),
            free: Vec::new(),
            cell_budget,
            cells_used: 0,
        }
    }

    pub fn push(&mut self, table: TableId, parent: Option<FrameId>, size: usize, span: Span) -> Result<FrameId, RuntimeError> {
        if self.cells_used + size > self.cell_budget {
            return Err(RuntimeError::FrameStackExhausted { span });
        }
        self.cells_used += size;
        let frame = Frame {
            table,
            parent,
            slots: vec![Value::Void; size],
            size,
            ref_count: 1,
        };
        let id = if let Some(idx) = self.free.pop() {
            self.frames[idx as usize] = Some(frame);
            FrameId(idx)
        } else {
            let idx = u32::try_from(self.frames.len()).expect("frame stack exceeds u32::MAX frames");
            self.frames.push(Some(frame));
            FrameId(idx)
        };
        if let Some(parent) = parent {
            self.retain(parent);
        }
        Ok(id)
    }

    fn frame(&self, id: FrameId) -> &Frame {
        self.frames[id.index()].as_ref().expect("dangling frame: frame was released")
    }

    fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        self.frames[id.index()].as_mut().expect("dangling frame: frame was released")
    }

    #[must_use]
    pub fn get(&self, id: FrameId) -> &Frame {
        self.frame(id)
    }

    pub fn get_mut(&mut self, id: FrameId) -> &mut Frame {
        self.frame_mut(id)
    }

    /// One more owner of `id`: a closure capturing it as its defining environment
    /// (`Value::Proc`, a recorded `OP` declaration), or, internally, a child frame's
    /// static link to its parent.
    pub fn retain(&mut self, id: FrameId) {
        self.frame_mut(id).ref_count += 1;
    }

    /// Drops the caller's share of `id` on normal (or jump-driven) exit from the
    /// range it backs. Once every owner has released it, the slot is freed for reuse
    /// and the frame's own hold on its parent (taken at `push`) is released in turn.
    pub fn release(&mut self, id: FrameId) {
        let (ref_count, parent, size) = {
            let frame = self.frame_mut(id);
            frame.ref_count -= 1;
            (frame.ref_count, frame.parent, frame.size)
        };
        if ref_count > 0 {
            return;
        }
        self.cells_used -= size;
        self.frames[id.index()] = None;
        self.free.push(id.0);
        if let Some(parent) = parent {
            self.release(parent);
        }
    }

    /// Walks the static-link chain from `from` until it reaches the frame that
    /// instantiates `table`. `a68-modes` guarantees every resolved tag's table is an
    /// ancestor of the range it's used in, so this chain always terminates.
    #[must_use]
    pub fn find_frame(&self, from: FrameId, table: TableId) -> FrameId {
        let mut current = from;
        loop {
            if self.frame(current).table == table {
                return current;
            }
            current = self
                .frame(current)
                .parent
                .unwrap_or_else(|| panic!("static link chain broken: table not found from frame {from:?}"));
        }
    }

    #[must_use]
    pub fn slot(&self, from: FrameId, table: TableId, offset: usize) -> &Value {
        let frame = self.find_frame(from, table);
        &self.frame(frame).slots[offset]
    }

    pub fn slot_mut(&mut self, from: FrameId, table: TableId, offset: usize) -> &mut Value {
        let frame = self.find_frame(from, table);
        &mut self.frame_mut(frame).slots[offset]
    }

    /// All live values across every still-referenced frame, used as GC roots (§4.2).
    pub fn all_values(&self) -> impl Iterator<Item = &Value> {
        self.frames.iter().flatten().flat_map(|f| f.slots.iter())
    }
}
