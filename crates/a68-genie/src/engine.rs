// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! The engine (C1/C5/C7): owns the three memory regions and drives a program from its
//! decorated tree to completion.
//!
//! Grounded on the teacher's `process/mod.rs` `Process` struct, which bundles its
//! young/old heap fields with `ip` and a call stack behind one owner that every
//! dispatch helper borrows `&mut` — generalised here into three distinct regions
//! (frame stack, heap, and the implicit Rust call stack standing in for the
//! reference runtime's separate expression stack, see `DESIGN.md`) plus the handful
//! of cross-cutting tables (user operators, variable-slot bookkeeping, the
//! propagator cache) a tree-walking interpreter needs that a bytecode VM does not.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use a68_core::{EngineLimits, Span, SourceId};
use a68_modes::decorate::{Coercion, DecoratedTree};
use a68_modes::mode::{Mode, ModeId, NumKind};
use a68_modes::symtab::TagKind;
use a68_modes::TableId;
use a68_syntax::node::NodeId;

use crate::error::RuntimeError;
use crate::frame::{FrameId, FrameStack};
use crate::heap::{Handle, Heap, HeapObject, RowObject};
use crate::propagator::PropagatorCache;
use crate::stowed;
use crate::value::{ProcValue, Reference, Value};

/// A non-local control transfer. Threaded through `Result` alongside ordinary runtime
/// errors so every `?` in the executor propagates both uniformly; `execute_serial`
/// is the only place that ever catches a `Jump` rather than letting it bubble.
#[derive(Debug, Clone)]
pub enum Signal {
    Error(RuntimeError),
    Jump { label: String, table: TableId },
}

impl From<RuntimeError> for Signal {
    fn from(e: RuntimeError) -> Self {
        Signal::Error(e)
    }
}

impl Signal {
    pub fn into_error(self) -> RuntimeError {
        match self {
            Signal::Error(e) => e,
            Signal::Jump { label, .. } => RuntimeError::UnresolvedJump { label },
        }
    }
}

/// One key a user `OP` declaration is recorded under: the table `tables.resolve`
/// reports when a later use site looks the operator's name up, paired with the
/// closure frame captured when the declaration statement executed.
pub type OperatorKey = (TableId, String);

fn cells_for(bytes: usize) -> usize {
    (bytes / std::mem::size_of::<Value>()).max(16)
}

pub struct Engine {
    pub decorated: DecoratedTree,
    pub frames: FrameStack,
    pub heap: Heap,
    pub propagator: PropagatorCache,
    /// Populated as `OperatorDeclaration` statements execute (§4.7); looked up by
    /// formula evaluation via `tables.resolve(.., TagKind::Operator, name)`.
    pub operators: std::collections::HashMap<OperatorKey, (NodeId, FrameId)>,
    /// `(table, offset)` pairs that hold a `VariableDeclaration`'s implicit address
    /// rather than an `IdentityDeclaration`-bound explicit `REF` value — see
    /// `DESIGN.md` for why both share the same `Mode::Ref` shape in the symbol table.
    pub variable_slots: std::collections::HashSet<(TableId, usize)>,
    pub limits: EngineLimits,
    pub stdout: Box<dyn Write>,
    pub stdin: Box<dyn BufRead>,
    executed: u64,
    start: Instant,
    time_limit: Option<Duration>,
    pub interrupted: std::sync::Arc<std::sync::atomic::AtomicBool>,
    /// Nesting counter for `up_garbage_sema`/`down_garbage_sema` (§4.2 items 5-6): a
    /// collection pass is skipped entirely while this is above zero, rather than
    /// tracked per handle, so a multi-step construction (gathering collateral-clause
    /// elements, call arguments, or formatted-transput values) can hold several
    /// not-yet-rooted heap handles across more than one `tick()` in between.
    gc_suspended: u32,
}

impl Engine {
    #[must_use]
    pub fn new(decorated: DecoratedTree, limits: EngineLimits, stdout: Box<dyn Write>, stdin: Box<dyn BufRead>) -> Self {
        let frame_cells = cells_for(limits.frame_stack_bytes);
        let heap_cells = cells_for(limits.heap_bytes);
        let time_limit = limits.time_limit;
        Self {
            decorated,
            frames: FrameStack::new(frame_cells),
            heap: Heap::new(limits.max_handles, heap_cells),
            propagator: PropagatorCache::new(),
            operators: std::collections::HashMap::new(),
            variable_slots: std::collections::HashSet::new(),
            limits,
            stdout,
            stdin,
            executed: 0,
            start: Instant::now(),
            time_limit,
            interrupted: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
            gc_suspended: 0,
        }
    }

    fn root_span(&self) -> Span {
        Span::synthetic(SourceId::new(0))
    }

    /// Runs the program to completion: opens the root frame and executes the
    /// top-level serial clause, swallowing a `Jump` that escapes every range (it
    /// can't, since the root serial is its own table, but the conversion keeps this
    /// function's signature a plain `RuntimeError`).
    pub fn run(&mut self) -> Result<Value, RuntimeError> {
        let program = self.decorated.tree.root;
        let serial = self.decorated.tree.children(program)[0];
        let root_table = self.decorated.decoration(program).table;
        let size = self.decorated.tables.table(root_table).ap_increment;
        let frame = self.frames.push(root_table, None, size, self.root_span()).map_err(Signal::Error)?;
        self.execute_serial(serial, root_table, frame).map_err(Signal::into_error)
    }

    /// Called once per executed unit (§5 "Suspension points"/"Cancellation"):
    /// samples the time limit and the interrupt flag every `SAMPLE_PERIOD` units, and
    /// triggers a GC pass when heap pressure crosses the 90%-full threshold (§4.2).
    pub fn tick(&mut self, span: Span) -> Result<(), Signal> {
        self.executed += 1;
        if self.executed % a68_core::limits::SAMPLE_PERIOD == 0 {
            if self.interrupted.load(std::sync::atomic::Ordering::Relaxed) {
                return Err(Signal::Error(RuntimeError::Interrupted));
            }
            if let Some(limit) = self.time_limit {
                if self.start.elapsed() > limit {
                    return Err(Signal::Error(RuntimeError::TimeLimitExceeded));
                }
            }
        }
        if self.limits.trace {
            eprintln!("{} {span}", self.executed);
        }
        self.maybe_collect();
        Ok(())
    }

    /// Suspends collection (§4.2 items 5-6, "guarded by `up_garbage_sema()`"): callers
    /// that gather several not-yet-rooted heap handles into a Rust-local `Vec` across
    /// more than one `tick()` (collateral-clause elements, call arguments, printed
    /// values, a formula's left/right operands) bracket that gathering with a matching
    /// `down_garbage_sema` so a sweep can never run mid-construction.
    pub fn up_garbage_sema(&mut self) {
        self.gc_suspended += 1;
    }

    pub fn down_garbage_sema(&mut self) {
        self.gc_suspended = self.gc_suspended.saturating_sub(1);
    }

    fn maybe_collect(&mut self) {
        if self.gc_suspended > 0 {
            return;
        }
        if !self.heap.is_under_pressure() {
            return;
        }
        for v in self.frames.all_values() {
            self.heap.mark_value(v);
        }
        self.heap.mark_protected();
        self.heap.sweep();
    }

    // --- declarations ----------------------------------------------------------

    pub fn execute_identity_declaration(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(id).to_vec();
        let (ident, rhs) = (children[1], children[2]);
        let span = self.decorated.tree.get(id).span;
        let value = self.execute_unit_coerced(rhs, table, frame)?;
        let value = stowed::deep_copy(&self.decorated.modes, &mut self.heap, &value, span).map_err(Signal::Error)?;
        self.bind_local(table, &self.tag_name(ident), value, frame)?;
        Ok(Value::Void)
    }

    pub fn execute_variable_declaration(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(id).to_vec();
        let declarer = children[0];
        let ident = children[1];
        let span = self.decorated.tree.get(id).span;
        let inner_mode = self.decorated.mode_of(declarer);
        let name = self.tag_name(ident);
        let resolved = self
            .decorated
            .tables
            .resolve(table, TagKind::Identifier, &name)
            .expect("variable declaration must have registered its own tag");
        self.variable_slots.insert((resolved.table, resolved.tag.offset));
        let default = self.execute_allocate(declarer, inner_mode, table, frame, span)?;
        *self.frames.slot_mut(frame, resolved.table, resolved.tag.offset) = default;
        if children.len() == 3 {
            let rhs = children[2];
            let value = self.execute_unit_coerced(rhs, table, frame)?;
            let value = stowed::deep_copy(&self.decorated.modes, &mut self.heap, &value, span).map_err(Signal::Error)?;
            *self.frames.slot_mut(frame, resolved.table, resolved.tag.offset) = value;
        }
        Ok(Value::Void)
    }

    /// Records the closure frame an `OP` declaration statement executes under, the
    /// run-time counterpart to `elaborate_operator_declaration`'s symbol-table entry.
    pub fn execute_operator_declaration(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let name = self.decorated.tree.get(id).text.clone().unwrap_or_default();
        // `operators` outlives the declaring range itself, so its closure frame needs
        // the same permanent hold a `Value::Proc` takes.
        self.frames.retain(frame);
        self.operators.insert((table, name), (id, frame));
        Ok(Value::Void)
    }

    fn bind_local(&mut self, table: TableId, name: &str, value: Value, frame: FrameId) -> Result<(), Signal> {
        let resolved = self
            .decorated
            .tables
            .resolve(table, TagKind::Identifier, name)
            .expect("identity declaration must have registered its own tag");
        *self.frames.slot_mut(frame, resolved.table, resolved.tag.offset) = value;
        Ok(())
    }

    fn tag_name(&self, ident: NodeId) -> String {
        self.decorated.tree.get(ident).text.clone().unwrap_or_default()
    }

    // --- generators / allocation (C7) -------------------------------------------

    /// Builds the content a `LOC`/`HEAP` generator or a bare `VariableDeclaration`
    /// produces before any explicit assignment: a fresh heap handle for `ROW`/`STRUCT`
    /// (bounds evaluated now, since they may be non-constant, §4.7), a `Cell` wrapper
    /// for any other mode, and the scalar zero value in both cases.
    pub fn execute_allocate(&mut self, declarer: NodeId, mode: ModeId, table: TableId, frame: FrameId, span: Span) -> Result<Value, Signal> {
        match self.decorated.modes.get(mode).clone() {
            Mode::Row { elem, dims, .. } => {
                let bound_nodes = &self.decorated.tree.children(declarer)[..self.decorated.tree.children(declarer).len() - 1];
                let bound_nodes = bound_nodes.to_vec();
                let mut bounds = Vec::with_capacity(dims as usize);
                for b in &bound_nodes {
                    bounds.push(self.evaluate_bound(*b, table, frame)?);
                }
                let count: usize = bounds.iter().map(|(l, u)| (u - l + 1).max(0) as usize).product();
                let mut elements = Vec::with_capacity(count);
                for _ in 0..count {
                    elements.push(stowed::zero_value(&self.decorated.modes, &mut self.heap, elem, span).map_err(Signal::Error)?);
                }
                let handle = self.heap.alloc(HeapObject::Row(RowObject { mode, bounds, elements }), span).map_err(Signal::Error)?;
                Ok(Value::Row(handle))
            }
            _ => stowed::zero_value(&self.decorated.modes, &mut self.heap, mode, span).map_err(Signal::Error),
        }
    }

    /// Evaluates one `Bound` node to a concrete `(lower, upper)` pair. `lower`
    /// defaults to 1 when omitted; `upper` omitted (a bare `FLEX`-only dimension)
    /// degenerates to an empty range, matching this subset's "no virtual bound
    /// inference at run time" stance (see `DESIGN.md`).
    fn evaluate_bound(&mut self, bound: NodeId, table: TableId, frame: FrameId) -> Result<(i64, i64), Signal> {
        let children = self.decorated.tree.children(bound).to_vec();
        let span = self.decorated.tree.get(bound).span;
        match children.len() {
            2 => {
                let lower = self.execute_unit_coerced(children[0], table, frame)?;
                let upper = self.execute_unit_coerced(children[1], table, frame)?;
                Ok((expect_int(&lower, span)?, expect_int(&upper, span)?))
            }
            1 => {
                let upper = self.execute_unit_coerced(children[0], table, frame)?;
                Ok((1, expect_int(&upper, span)?))
            }
            _ => Ok((1, 0)),
        }
    }

    /// A `HEAP`/`LOC` generator expression (as opposed to the implicit allocation a
    /// `VariableDeclaration` performs): always produces a name denoting fresh
    /// storage. `ROW`/`STRUCT` generators address their own heap object directly;
    /// anything else gets a boxed `Cell` so it has a heap location to be named.
    pub fn execute_generator(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let declarer = self.decorated.tree.children(id)[0];
        let mode = self.decorated.decoration(declarer).mode;
        let span = self.decorated.tree.get(id).span;
        let content = self.execute_allocate(declarer, mode, table, frame, span)?;
        let reference = match &content {
            Value::Row(h) | Value::Struct(h) => Reference::Heap { handle: *h, offset: 0 },
            _ => {
                let handle = self.heap.alloc(HeapObject::Cell(content), span).map_err(Signal::Error)?;
                Reference::Heap { handle, offset: 0 }
            }
        };
        Ok(Value::Ref(reference))
    }

    // --- references --------------------------------------------------------------

    pub fn read_ref(&self, reference: Reference, span: Span) -> Result<Value, Signal> {
        let value = match reference {
            Reference::Nil => return Err(Signal::Error(RuntimeError::NilAccess { span })),
            Reference::Frame { frame, table, offset } => self.frames.slot(frame, table, offset).clone(),
            Reference::Heap { handle, .. } => match self.heap.get(handle) {
                HeapObject::Cell(v) => v.clone(),
                HeapObject::Row(_) => Value::Row(handle),
                HeapObject::Struct { .. } => Value::Struct(handle),
            },
            Reference::Element { handle, index } => match self.heap.get(handle) {
                HeapObject::Row(row) => row.elements[index].clone(),
                _ => unreachable!("Reference::Element must address a RowObject"),
            },
            Reference::Field { handle, index } => match self.heap.get(handle) {
                HeapObject::Struct { fields, .. } => fields[index].clone(),
                _ => unreachable!("Reference::Field must address a struct HeapObject"),
            },
        };
        self.check_not_empty(value, span)
    }

    /// §4.3 "EMPTY-VALUE": a name's cell holding [`Value::Empty`] means it was never
    /// assigned. The check lives here, at the one place every name read funnels
    /// through, rather than scattered across every consumer of a dereferenced value.
    fn check_not_empty(&self, value: Value, span: Span) -> Result<Value, Signal> {
        match value {
            Value::Empty(mode) => Err(Signal::Error(RuntimeError::EmptyValue { mode: Some(self.decorated.modes.name(mode)), span })),
            other => Ok(other),
        }
    }

    pub fn write_ref(&mut self, reference: Reference, value: Value, span: Span) -> Result<(), Signal> {
        match reference {
            Reference::Nil => Err(Signal::Error(RuntimeError::NilAccess { span })),
            Reference::Frame { frame, table, offset } => {
                self.check_scope(table, &value, span)?;
                self.assign_in_place(self.frames.slot(frame, table, offset).clone(), &value, span)?;
                *self.frames.slot_mut(frame, table, offset) = value;
                Ok(())
            }
            Reference::Heap { handle, .. } => {
                match self.heap.get(handle) {
                    HeapObject::Row(_) | HeapObject::Struct { .. } => {
                        self.overwrite_stowed(handle, &value, span)?;
                    }
                    HeapObject::Cell(_) => {
                        *self.heap.get_mut(handle) = HeapObject::Cell(value);
                    }
                }
                Ok(())
            }
            Reference::Element { handle, index } => {
                let old = match self.heap.get(handle) {
                    HeapObject::Row(row) => row.elements[index].clone(),
                    _ => unreachable!("Reference::Element must address a RowObject"),
                };
                self.assign_in_place(old, &value, span)?;
                match self.heap.get_mut(handle) {
                    HeapObject::Row(row) => row.elements[index] = value,
                    _ => unreachable!("Reference::Element must address a RowObject"),
                }
                Ok(())
            }
            Reference::Field { handle, index } => {
                let old = match self.heap.get(handle) {
                    HeapObject::Struct { fields, .. } => fields[index].clone(),
                    _ => unreachable!("Reference::Field must address a struct HeapObject"),
                };
                self.assign_in_place(old, &value, span)?;
                match self.heap.get_mut(handle) {
                    HeapObject::Struct { fields, .. } => fields[index] = value,
                    _ => unreachable!("Reference::Field must address a struct HeapObject"),
                }
                Ok(())
            }
        }
    }

    /// Scope check (§4.4, §8 property 1): a `Value::Ref` stored into a frame slot must
    /// not outlive the range that produced it. `target_table`'s lexical level stands in
    /// for the target's scope; a stored `Reference::Frame` whose own table is *deeper*
    /// than that is a name from a shorter-lived range escaping into a longer-lived one.
    fn check_scope(&self, target_table: TableId, value: &Value, span: Span) -> Result<(), Signal> {
        if let Value::Ref(Reference::Frame { table: source_table, .. }) = value {
            let target_level = self.decorated.tables.table(target_table).level;
            let source_level = self.decorated.tables.table(*source_table).level;
            if source_level > target_level {
                return Err(Signal::Error(RuntimeError::ScopeViolation { span }));
            }
        }
        Ok(())
    }

    /// Name-identity preserving assignment (§4.4): if the target already holds a
    /// stowed value, overwrite the existing heap object's contents in place instead
    /// of relocating the handle, so other names sharing that handle observe the new
    /// contents rather than going stale.
    fn assign_in_place(&mut self, old: Value, new: &Value, span: Span) -> Result<(), Signal> {
        match (old, new) {
            (Value::Row(h), Value::Row(_)) | (Value::Struct(h), Value::Struct(_)) => self.overwrite_stowed(h, new, span),
            _ => Ok(()),
        }
    }

    fn overwrite_stowed(&mut self, target: Handle, new: &Value, span: Span) -> Result<(), Signal> {
        match new {
            Value::Row(src) => {
                let source = match self.heap.get(*src) {
                    HeapObject::Row(r) => r.clone(),
                    _ => unreachable!("Value::Row must point at a RowObject"),
                };
                let target_row = match self.heap.get(target) {
                    HeapObject::Row(r) => r.clone(),
                    _ => unreachable!("overwrite_stowed target handle must point at a RowObject"),
                };
                // §4.4 "Assign to a name of STOWED mode": a non-flex (and non-STRING)
                // target's element block is overwritten in place only when its shape
                // already matches the source's; a FLEX target may instead be resized.
                if !self.decorated.modes.get(target_row.mode).is_flex() && target_row.bounds != source.bounds {
                    return Err(Signal::Error(RuntimeError::DifferentBounds { span }));
                }
                let copied = stowed::deep_copy(&self.decorated.modes, &mut self.heap, new, span).map_err(Signal::Error)?;
                if let Value::Row(fresh) = copied {
                    let fresh_row = match self.heap.get(fresh) {
                        HeapObject::Row(r) => r.clone(),
                        _ => unreachable!(),
                    };
                    *self.heap.get_mut(target) = HeapObject::Row(RowObject { mode: source.mode, ..fresh_row });
                }
                Ok(())
            }
            Value::Struct(src) => {
                let copied = stowed::deep_copy(&self.decorated.modes, &mut self.heap, new, span).map_err(Signal::Error)?;
                if let Value::Struct(fresh) = copied {
                    let (mode, fields) = match self.heap.get(fresh) {
                        HeapObject::Struct { mode, fields } => (*mode, fields.clone()),
                        _ => unreachable!(),
                    };
                    *self.heap.get_mut(target) = HeapObject::Struct { mode, fields };
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // --- coercion ------------------------------------------------------------

    /// Applies a unit's recorded [`Coercion`] to its raw evaluated value.
    pub fn apply_coercion(&mut self, value: Value, coercion: Coercion, span: Span) -> Result<Value, Signal> {
        match coercion {
            Coercion::None => Ok(value),
            Coercion::Deref => self.dereference(value, span),
            Coercion::Widen(to) => Ok(self.widen_value(value, to)),
            Coercion::DerefWiden(to) => {
                let deref = self.dereference(value, span)?;
                Ok(self.widen_value(deref, to))
            }
        }
    }

    pub(crate) fn dereference(&self, value: Value, span: Span) -> Result<Value, Signal> {
        match value {
            Value::Ref(r) => self.read_ref(r, span),
            other => Ok(other),
        }
    }

    /// Widens a scalar to `to`'s numeric kind/length. Anything not numeric passes
    /// through unchanged (string/bits widenings are handled directly where they
    /// arise, e.g. standard-environ argument binding, rather than through this path).
    #[must_use]
    pub fn widen_value(&self, value: Value, to: ModeId) -> Value {
        let Mode::Numeric(kind, longs) = self.decorated.modes.get(to) else {
            return value;
        };
        let as_real = match &value {
            Value::Int(n) => *n as f64,
            Value::LongInt(n) => *n as f64,
            Value::Real(n) | Value::LongReal(n) => *n,
            _ => return value,
        };
        match (kind, longs) {
            (NumKind::Real, 0) => Value::Real(as_real),
            (NumKind::Real, 1) => Value::LongReal(as_real),
            (NumKind::Real, _) => Value::LongLongReal { mantissa: (as_real * 1e18) as i128, scale: 18 },
            (NumKind::Int, 1) => Value::LongInt(as_real as i128),
            (NumKind::Int, _) => Value::LongLongInt { mantissa: as_real as i128, scale: 0 },
            (NumKind::Int, 0) => value,
        }
    }

    /// Coerces an evaluated call argument to its declared parameter mode (§4.5
    /// "Procedure call"). `a68-modes`'s `elaborate_call` never records a coercion for
    /// call arguments the way it does for other unit positions, so this is done here
    /// from the two static modes directly instead of from a recorded `Coercion`.
    pub fn coerce_value_to(&mut self, value: Value, from: ModeId, to: ModeId, span: Span) -> Result<Value, Signal> {
        if from == to {
            return Ok(value);
        }
        if let Mode::Ref(inner) = self.decorated.modes.get(from).clone() {
            if inner == to {
                return self.dereference(value, span);
            }
            if self.decorated.modes.widens_to(inner, to) {
                let deref = self.dereference(value, span)?;
                return Ok(self.widen_value(deref, to));
            }
        }
        if self.decorated.modes.widens_to(from, to) {
            return Ok(self.widen_value(value, to));
        }
        Ok(value)
    }
}

pub fn expect_int(value: &Value, span: Span) -> Result<i64, Signal> {
    value
        .as_int()
        .ok_or(Signal::Error(RuntimeError::ConversionError { detail: "expected an INT value".into(), span }))
}
