// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! The tree-walking executor (C5/C6/C8/C9/C10): one `execute_*` method per
//! [`a68_syntax::attribute::Attribute`] `elaborate_*` counterpart in
//! `a68_modes::decorate`. Every method reads the node's own [`Decoration`] (mode,
//! table, tag, coercion) rather than re-deriving it, trusting elaboration to have
//! already settled every choice the reference front end settles statically.

use std::io::{Read, Write};

use a68_core::Span;
use a68_modes::mode::{Mode, ModeId};
use a68_modes::symtab::{ResolvedTag, TagKind};
use a68_modes::TableId;
use a68_syntax::attribute::Attribute;
use a68_syntax::node::{Literal, NodeId};

use crate::engine::{expect_int, Engine, Signal};
use crate::error::RuntimeError;
use crate::format::{self, FormatItem};
use crate::frame::FrameId;
use crate::heap::{Handle, HeapObject, RowObject};
use crate::propagator::IdentifierSlot;
use crate::stowed;
use crate::value::{ProcValue, Reference, Value};

impl Engine {
    // --- dispatch ----------------------------------------------------------

    pub fn execute_unit(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let span = self.decorated.tree.get(id).span;
        self.tick(span)?;
        match self.decorated.tree.get(id).attribute {
            Attribute::Denoter => self.execute_denoter(id, span),
            Attribute::Identifier => self.execute_identifier(id, frame),
            Attribute::Nihil => Ok(Value::Ref(Reference::Nil)),
            Attribute::Skip => Ok(Value::Void),
            Attribute::FormatText => Ok(Value::Format(id)),
            Attribute::Generator => self.execute_generator(id, table, frame),
            Attribute::Declarer => Ok(Value::Void),
            Attribute::Cast => self.execute_cast(id, table, frame),
            Attribute::Assignation => self.execute_assignation(id, table, frame),
            Attribute::Formula => self.execute_formula(id, table, frame),
            Attribute::MonadicFormula => self.execute_monadic(id, table, frame),
            Attribute::Call => self.execute_call(id, table, frame),
            Attribute::Slice => self.execute_slice(id, table, frame),
            Attribute::Selection => self.execute_selection(id, table, frame),
            Attribute::Jump => self.execute_jump(id, table),
            Attribute::ClosedClause => self.execute_closed_clause(id, table, frame),
            Attribute::CollateralClause => self.execute_collateral(id, table, frame),
            Attribute::ConditionalClause => self.execute_conditional(id, table, frame),
            Attribute::IntegerCaseClause => self.execute_integer_case(id, table, frame),
            Attribute::UnitedCaseClause => self.execute_united_case(id, table, frame),
            Attribute::LoopClause => self.execute_loop(id, table, frame),
            Attribute::ParallelClause => {
                let inner = self.decorated.tree.children(id)[0];
                self.execute_unit_coerced(inner, table, frame)
            }
            Attribute::SerialClause => self.execute_nested_serial(id, frame, span),
            Attribute::LabeledUnit => self.execute_statement(id, table, frame),
            Attribute::RoutineText => self.execute_routine_text(id, frame),
            Attribute::Assertion => self.execute_assertion(id, table, frame, span),
            _ => Ok(Value::Void),
        }
    }

    /// `execute_unit` plus the coercion `a68-modes` recorded for this node.
    pub fn execute_unit_coerced(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let span = self.decorated.tree.get(id).span;
        let coercion = self.decorated.decoration(id).coercion;
        let value = self.execute_unit(id, table, frame)?;
        self.apply_coercion(value, coercion, span)
    }

    /// One child of a `SerialClause`/`DeclarationList`: a declaration, a labeled
    /// unit, or a bare unit falling through to [`Engine::execute_unit_coerced`].
    fn execute_statement(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        match self.decorated.tree.get(id).attribute {
            Attribute::ModeDeclaration => Ok(Value::Void),
            Attribute::DeclarationList => {
                let mut last = Value::Void;
                for child in self.decorated.tree.children(id).to_vec() {
                    last = self.execute_statement(child, table, frame)?;
                }
                Ok(last)
            }
            Attribute::IdentityDeclaration => self.execute_identity_declaration(id, table, frame),
            Attribute::VariableDeclaration => self.execute_variable_declaration(id, table, frame),
            Attribute::OperatorDeclaration | Attribute::BriefOperatorDeclaration => {
                self.execute_operator_declaration(id, table, frame)
            }
            Attribute::PriorityDeclaration => Ok(Value::Void),
            Attribute::LabeledUnit => {
                let inner = self.decorated.tree.children(id)[0];
                self.execute_unit_coerced(inner, table, frame)
            }
            _ => self.execute_unit_coerced(id, table, frame),
        }
    }

    /// Runs every statement of a `SerialClause` already bound to `table`/`frame`,
    /// catching a [`Signal::Jump`] aimed at a label this same range declares and
    /// resuming from it; anything aimed further out keeps propagating.
    fn execute_serial(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(id).to_vec();
        let mut index = 0usize;
        let mut result = Value::Void;
        while index < children.len() {
            let child = children[index];
            match self.execute_statement(child, table, frame) {
                Ok(value) => result = value,
                Err(Signal::Jump { label, table: target_table }) if target_table == table => {
                    let found = children.iter().position(|c| {
                        self.decorated.tree.get(*c).attribute == Attribute::LabeledUnit
                            && self.decorated.tree.get(*c).text.as_deref() == Some(label.as_str())
                    });
                    match found {
                        Some(at) => {
                            index = at;
                            continue;
                        }
                        None => return Err(Signal::Jump { label, table: target_table }),
                    }
                }
                Err(other) => return Err(other),
            }
            index += 1;
        }
        Ok(result)
    }

    /// A `SerialClause` met as a unit rather than as the program body or a
    /// declaration list: pushes the table `a68-modes` already fixed for it
    /// (`decorate.rs::elaborate_nested_serial`) with `parent_frame` as static link.
    fn execute_nested_serial(&mut self, id: NodeId, parent_frame: FrameId, span: Span) -> Result<Value, Signal> {
        let new_table = self.decorated.decoration(id).table;
        let new_frame = self.push_frame_for(new_table, parent_frame, span)?;
        let result = self.execute_serial(id, new_table, new_frame);
        self.frames.release(new_frame);
        result
    }

    fn push_frame_for(&mut self, table: TableId, parent: FrameId, span: Span) -> Result<FrameId, Signal> {
        let size = self.decorated.tables.table(table).ap_increment;
        self.frames.push(table, Some(parent), size, span).map_err(Signal::Error)
    }

    fn execute_jump(&self, id: NodeId, table: TableId) -> Result<Value, Signal> {
        let name = self.decorated.tree.get(id).text.clone().unwrap_or_default();
        let target_table = self.decorated.decoration(id).tag.as_ref().map(|r| r.table).unwrap_or(table);
        Err(Signal::Jump { label: name, table: target_table })
    }

    /// `( serial-clause )`: its own declarative scope, one fresh frame per entry,
    /// same as any other nested serial clause.
    fn execute_closed_clause(&mut self, id: NodeId, _table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let serial = self.decorated.tree.children(id)[0];
        self.execute_nested_serial(serial, frame, self.decorated.tree.get(id).span)
    }

    /// `ASSERT unit`: raises `AssertionFailed` when the operand is `FALSE` and
    /// assertion checking hasn't been disabled (`--noassertions`).
    fn execute_assertion(&mut self, id: NodeId, table: TableId, frame: FrameId, span: Span) -> Result<Value, Signal> {
        let inner = self.decorated.tree.children(id)[0];
        let value = self.execute_unit_coerced(inner, table, frame)?;
        if !self.limits.assertions {
            return Ok(Value::Void);
        }
        match value {
            Value::Bool(true) => Ok(Value::Void),
            _ => Err(Signal::Error(RuntimeError::AssertionFailed { span })),
        }
    }

    // --- primaries -----------------------------------------------------------

    fn execute_denoter(&mut self, id: NodeId, span: Span) -> Result<Value, Signal> {
        let literal = self.decorated.tree.get(id).literal.clone();
        match literal {
            Some(Literal::Int(n)) => Ok(Value::Int(n)),
            Some(Literal::Real(n)) => Ok(Value::Real(n)),
            Some(Literal::Bool(b)) => Ok(Value::Bool(b)),
            Some(Literal::Char(c)) => Ok(Value::Char(c)),
            Some(Literal::Str(s)) => self.alloc_string_cached(id, &s, span),
            None => Ok(Value::Void),
        }
    }

    /// A string denoter's heap copy never changes across executions of the same node
    /// (§4.6 "constant caching"), so the first execution allocates it and pins it with
    /// `Heap::protect`; every later execution of that node hands back the same handle
    /// instead of allocating a fresh `Row`.
    fn alloc_string_cached(&mut self, id: NodeId, text: &str, span: Span) -> Result<Value, Signal> {
        if let Some(handle) = self.propagator.cached_denoter(id) {
            return Ok(Value::Row(handle));
        }
        let value = self.alloc_string(text, span)?;
        let Value::Row(handle) = value else { unreachable!("alloc_string always returns Value::Row") };
        self.propagator.cache_denoter(id, handle);
        self.heap.protect(handle);
        Ok(value)
    }

    fn alloc_string(&mut self, text: &str, span: Span) -> Result<Value, Signal> {
        let mode = self.decorated.modes.intern(Mode::String);
        let elements: Vec<Value> = text.chars().map(Value::Char).collect();
        let upper = elements.len() as i64;
        let handle = self
            .heap
            .alloc(HeapObject::Row(RowObject { mode, bounds: vec![(1, upper)], elements }), span)
            .map_err(Signal::Error)?;
        Ok(Value::Row(handle))
    }

    /// An `Identifier` unit: a name (§2.1.3.2). A slot `variable_slots` marks holds
    /// its raw content directly (a `VariableDeclaration`'s implicit address), so
    /// reading it synthesizes the `Reference::Frame` on the fly instead of cloning
    /// the slot; any other identifier's slot already holds the `Value` the tag's
    /// mode describes (an `IdentityDeclaration`-bound `REF` holds a `Value::Ref`).
    fn execute_identifier(&mut self, id: NodeId, frame: FrameId) -> Result<Value, Signal> {
        let decorated = &self.decorated;
        let slot = self.propagator.slot_or_insert(id, || {
            let tag = decorated.decoration(id).tag.clone();
            match tag {
                None => IdentifierSlot::Void,
                Some(resolved) if resolved.tag.kind == TagKind::Operator => IdentifierSlot::Operator,
                Some(resolved) => IdentifierSlot::Variable(resolved.table, resolved.tag.offset),
            }
        });
        match slot {
            IdentifierSlot::Void => Ok(Value::Void),
            IdentifierSlot::Operator => {
                let resolved = self.decorated.decoration(id).tag.clone().expect("cached as an operator tag");
                self.operator_value(id, resolved, frame)
            }
            IdentifierSlot::Variable(table, offset) => {
                let target_frame = self.frames.find_frame(frame, table);
                if self.variable_slots.contains(&(table, offset)) {
                    return Ok(Value::Ref(Reference::Frame { frame: target_frame, table, offset }));
                }
                Ok(self.frames.slot(target_frame, table, offset).clone())
            }
        }
    }

    /// An operator referenced where a `PROC` value is expected (its call-site
    /// primary position, §4.7): looks the declaration up the same way
    /// [`Engine::resolve_operator`] does and wraps it as an ordinary `Value::Proc`.
    fn operator_value(&mut self, id: NodeId, resolved: ResolvedTag, _frame: FrameId) -> Result<Value, Signal> {
        let name = self.decorated.tree.get(id).text.clone().unwrap_or_default();
        let span = self.decorated.tree.get(id).span;
        let (decl_id, closure_frame) = *self.operators.get(&(resolved.table, name)).ok_or_else(|| {
            Signal::Error(RuntimeError::ConversionError { detail: "operator has no definition in scope".into(), span })
        })?;
        let proc_table = self.proc_table_of(decl_id);
        // The returned PROC value may outlive this call; its closure frame needs to
        // stay addressable for as long as the value itself does.
        self.frames.retain(closure_frame);
        Ok(Value::Proc(ProcValue { node: decl_id, table: proc_table, frame: closure_frame }))
    }

    fn proc_table_of(&self, proc_node: NodeId) -> TableId {
        let pack = self.decorated.tree.children(proc_node)[0];
        self.decorated.decoration(pack).table
    }

    /// A `PROC (...) mode: body` routine text value: closes over the frame in
    /// scope when the text is evaluated, per its static link.
    fn execute_routine_text(&mut self, id: NodeId, frame: FrameId) -> Result<Value, Signal> {
        let proc_table = self.proc_table_of(id);
        // Same reasoning as `operator_value`: the closure this text denotes may be
        // called long after `frame` would otherwise have been released.
        self.frames.retain(frame);
        Ok(Value::Proc(ProcValue { node: id, table: proc_table, frame }))
    }

    fn execute_cast(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(id).to_vec();
        if children.len() < 2 {
            return Ok(Value::Void);
        }
        let mut result = Value::Void;
        for arg in self.decorated.tree.children(children[1]).to_vec() {
            result = self.execute_unit_coerced(arg, table, frame)?;
        }
        Ok(result)
    }

    fn execute_assignation(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(id).to_vec();
        let (lhs, rhs) = (children[0], children[1]);
        let span = self.decorated.tree.get(id).span;
        let target = self.execute_unit(lhs, table, frame)?;
        let Value::Ref(reference) = target else {
            return Err(Signal::Error(RuntimeError::ConversionError { detail: "assignment target is not a name".into(), span }));
        };
        let value = self.execute_unit_coerced(rhs, table, frame)?;
        let value = stowed::deep_copy(&self.decorated.modes, &mut self.heap, &value, span).map_err(Signal::Error)?;
        self.write_ref(reference, value, span)?;
        Ok(Value::Ref(reference))
    }

    // --- slices / selections: "a slice/selection of a name is itself a name" -----

    fn execute_slice(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(id).to_vec();
        let (base, index) = (children[0], children[1]);
        let span = self.decorated.tree.get(id).span;
        let base_mode = self.decorated.mode_of(base);
        let is_ref = matches!(self.decorated.modes.get(base_mode), Mode::Ref(_));
        let base_value = self.execute_unit(base, table, frame)?;
        let row_value = if is_ref { self.dereference(base_value, span)? } else { base_value };
        let handle = match row_value {
            Value::Row(h) => h,
            _ => return Err(Signal::Error(RuntimeError::ConversionError { detail: "slice base is not a row".into(), span })),
        };
        let idx = expect_int(&self.execute_unit_coerced(index, table, frame)?, span)?;
        let (lower, upper) = match self.heap.get(handle) {
            HeapObject::Row(row) => row.bounds.first().copied().unwrap_or((1, 0)),
            _ => unreachable!("slice base must address a RowObject"),
        };
        if idx < lower || idx > upper {
            return Err(Signal::Error(RuntimeError::IndexOutOfBounds { index: idx, lower, upper, span }));
        }
        let flat = (idx - lower) as usize;
        if is_ref {
            Ok(Value::Ref(Reference::Element { handle, index: flat }))
        } else {
            match self.heap.get(handle) {
                HeapObject::Row(row) => Ok(row.elements[flat].clone()),
                _ => unreachable!("slice base must address a RowObject"),
            }
        }
    }

    fn execute_selection(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let field = self.decorated.tree.get(id).text.clone().unwrap_or_default();
        let base = self.decorated.tree.children(id)[0];
        let span = self.decorated.tree.get(id).span;
        let base_mode = self.decorated.mode_of(base);
        let is_ref = matches!(self.decorated.modes.get(base_mode), Mode::Ref(_));
        let base_value = self.execute_unit(base, table, frame)?;
        let struct_value = if is_ref { self.dereference(base_value, span)? } else { base_value };
        let handle = match struct_value {
            Value::Struct(h) => h,
            _ => return Err(Signal::Error(RuntimeError::ConversionError { detail: "selection base is not a struct".into(), span })),
        };
        // The field's declared-order position drives the runtime layout, not
        // `ModeTable::struct_fields`'s cumulative cell offsets (see DESIGN.md).
        let struct_mode = match self.heap.get(handle) {
            HeapObject::Struct { mode, .. } => *mode,
            _ => unreachable!("selection base must address a struct HeapObject"),
        };
        let fields = self.decorated.modes.struct_fields(struct_mode);
        let Some(position) = fields.iter().position(|(name, ..)| name == &field) else {
            return Err(Signal::Error(RuntimeError::ConversionError { detail: format!("no component called {field}"), span }));
        };
        if is_ref {
            Ok(Value::Ref(Reference::Field { handle, index: position }))
        } else {
            match self.heap.get(handle) {
                HeapObject::Struct { fields, .. } => Ok(fields[position].clone()),
                _ => unreachable!("selection base must address a struct HeapObject"),
            }
        }
    }

    // --- collateral ------------------------------------------------------------

    fn execute_collateral(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let items = self.decorated.tree.children(id).to_vec();
        let span = self.decorated.tree.get(id).span;
        if items.is_empty() {
            return Ok(Value::Void);
        }
        let mode = self.decorated.mode_of(id);
        let mut elements = Vec::with_capacity(items.len());
        self.up_garbage_sema();
        for item in &items {
            match self.execute_statement(*item, table, frame) {
                Ok(v) => elements.push(v),
                Err(e) => {
                    self.down_garbage_sema();
                    return Err(e);
                }
            }
        }
        self.down_garbage_sema();
        let upper = elements.len() as i64;
        let handle = self
            .heap
            .alloc(HeapObject::Row(RowObject { mode, bounds: vec![(1, upper)], elements }), span)
            .map_err(Signal::Error)?;
        Ok(Value::Row(handle))
    }

    // --- conditional / case clauses ---------------------------------------------

    fn execute_conditional(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let parts = self.decorated.tree.children(id).to_vec();
        let mut taken = None;
        let mut result = Value::Void;
        for part in parts {
            match self.decorated.tree.get(part).attribute {
                Attribute::EnquiryClause => {
                    let inner = self.decorated.tree.children(part)[0];
                    let cond = self.execute_unit_coerced(inner, table, frame)?;
                    taken = Some(cond.truthy());
                }
                Attribute::ThenPart if taken == Some(true) => {
                    let inner = self.decorated.tree.children(part)[0];
                    result = self.execute_unit_coerced(inner, table, frame)?;
                }
                Attribute::ElsePart if taken == Some(false) => {
                    let inner = self.decorated.tree.children(part)[0];
                    result = self.execute_unit_coerced(inner, table, frame)?;
                }
                _ => {}
            }
        }
        Ok(result)
    }

    fn execute_integer_case(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let parts = self.decorated.tree.children(id).to_vec();
        let span = self.decorated.tree.get(id).span;
        let mut index = None;
        for part in &parts {
            if self.decorated.tree.get(*part).attribute == Attribute::EnquiryClause {
                let inner = self.decorated.tree.children(*part)[0];
                let value = self.execute_unit_coerced(inner, table, frame)?;
                index = Some(expect_int(&value, span)?);
            }
        }
        let Some(index) = index else { return Ok(Value::Void) };

        let mut ordinal = 0i64;
        for part in &parts {
            if self.decorated.tree.get(*part).attribute == Attribute::InPart {
                for alt in self.decorated.tree.children(*part).to_vec() {
                    ordinal += 1;
                    if ordinal == index {
                        return self.execute_statement(alt, table, frame);
                    }
                }
            }
        }
        for part in &parts {
            match self.decorated.tree.get(*part).attribute {
                Attribute::OutPart | Attribute::OusePart => {
                    let inner = self.decorated.tree.children(*part)[0];
                    return self.execute_unit_coerced(inner, table, frame);
                }
                _ => {}
            }
        }
        Ok(Value::Void)
    }

    fn execute_united_case(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(id).to_vec();
        let span = self.decorated.tree.get(id).span;
        let enquiry_part = children[0];
        let enquiry_unit = self.decorated.tree.children(enquiry_part)[0];
        let raw = self.execute_unit_coerced(enquiry_unit, table, frame)?;
        let unwrapped = match raw {
            Value::Ref(r) => self.read_ref(r, span)?,
            other => other,
        };
        let Value::Union(active_mode, payload) = unwrapped else {
            return Err(Signal::Error(RuntimeError::UnionTagMismatch { expected: "UNION".into(), span }));
        };

        let spec_list = children[1];
        for spec in self.decorated.tree.children(spec_list).to_vec() {
            let spec_children = self.decorated.tree.children(spec).to_vec();
            let declarer = spec_children[0];
            let decl_mode = self.decorated.decoration(declarer).mode;
            if decl_mode != active_mode && !self.decorated.modes.widens_to(active_mode, decl_mode) {
                continue;
            }
            let spec_table = self.decorated.decoration(spec).table;
            let spec_frame = self.push_frame_for(spec_table, frame, span)?;
            if spec_children.len() == 3 {
                let ident = spec_children[1];
                let name = self.decorated.tree.get(ident).text.clone().unwrap_or_default();
                let resolved = self
                    .decorated
                    .tables
                    .resolve(spec_table, TagKind::Identifier, &name)
                    .expect("specified unit identifier must have registered its own tag");
                *self.frames.slot_mut(spec_frame, resolved.table, resolved.tag.offset) = *payload;
            }
            let body = *spec_children.last().unwrap();
            let result = self.execute_unit_coerced(body, spec_table, spec_frame);
            self.frames.release(spec_frame);
            return result;
        }

        for part in &children[2..] {
            if self.decorated.tree.get(*part).attribute == Attribute::OutPart {
                let inner = self.decorated.tree.children(*part)[0];
                return self.execute_unit_coerced(inner, table, frame);
            }
        }
        Ok(Value::Void)
    }

    // --- loop --------------------------------------------------------------

    /// `FOR i FROM a BY b TO c WHILE cond DO body OD` (§4.6, §8 property 7): every
    /// part is optional except `DoPart`. The `FOR` identifier's slot lives in the
    /// fixed table `decorate.rs::elaborate_loop` pushed for the whole loop, written
    /// afresh each iteration rather than redeclared.
    fn execute_loop(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let parts = self.decorated.tree.children(id).to_vec();
        let span = self.decorated.tree.get(id).span;

        let mut for_ident = None;
        let mut from_node = None;
        let mut by_node = None;
        let mut to_node = None;
        let mut while_node = None;
        let mut do_node = None;
        for part in &parts {
            match self.decorated.tree.get(*part).attribute {
                Attribute::ForPart => for_ident = Some(self.decorated.tree.children(*part)[0]),
                Attribute::FromPart => from_node = Some(self.decorated.tree.children(*part)[0]),
                Attribute::ByPart => by_node = Some(self.decorated.tree.children(*part)[0]),
                Attribute::ToPart => to_node = Some(self.decorated.tree.children(*part)[0]),
                Attribute::WhilePart => while_node = Some(self.decorated.tree.children(*part)[0]),
                Attribute::DoPart => do_node = Some(self.decorated.tree.children(*part)[0]),
                _ => {}
            }
        }

        let (loop_table, loop_frame) = match for_ident {
            Some(ident) => {
                let loop_table = self.decorated.decoration(ident).table;
                let loop_frame = self.push_frame_for(loop_table, frame, span)?;
                (loop_table, loop_frame)
            }
            None => (table, frame),
        };

        let result = self.run_loop(loop_table, loop_frame, for_ident, from_node, by_node, to_node, while_node, do_node, table, frame, span);

        // The whole-loop frame is only ours to release when `FOR` actually pushed
        // one; otherwise `loop_frame` is the caller's own frame.
        if for_ident.is_some() {
            self.frames.release(loop_frame);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run_loop(
        &mut self,
        loop_table: TableId,
        loop_frame: FrameId,
        for_ident: Option<NodeId>,
        from_node: Option<NodeId>,
        by_node: Option<NodeId>,
        to_node: Option<NodeId>,
        while_node: Option<NodeId>,
        do_node: Option<NodeId>,
        table: TableId,
        frame: FrameId,
        span: Span,
    ) -> Result<Value, Signal> {
        let from = match from_node {
            Some(n) => expect_int(&self.execute_unit_coerced(n, table, frame)?, span)?,
            None => 1,
        };
        let by = match by_node {
            Some(n) => expect_int(&self.execute_unit_coerced(n, table, frame)?, span)?,
            None => 1,
        };
        let to = match to_node {
            Some(n) => Some(expect_int(&self.execute_unit_coerced(n, table, frame)?, span)?),
            None => None,
        };

        let for_slot = match for_ident {
            Some(ident) => {
                let name = self.decorated.tree.get(ident).text.clone().unwrap_or_default();
                Some(
                    self.decorated
                        .tables
                        .resolve(loop_table, TagKind::Identifier, &name)
                        .expect("FOR identifier must have registered its own tag"),
                )
            }
            None => None,
        };

        let mut current = from;
        let mut result = Value::Void;
        loop {
            if let Some(upper_bound) = to {
                if by == 0 || by.signum() * (upper_bound - current) < 0 {
                    break;
                }
            }
            if let Some(resolved) = &for_slot {
                *self.frames.slot_mut(loop_frame, resolved.table, resolved.tag.offset) = Value::Int(current);
            }
            if let Some(wn) = while_node {
                let cond = self.execute_unit_coerced(wn, loop_table, loop_frame)?;
                if !cond.truthy() {
                    break;
                }
            }
            if let Some(dn) = do_node {
                result = self.execute_unit_coerced(dn, loop_table, loop_frame)?;
            }
            current += by;
        }
        Ok(result)
    }

    // --- calls, operators ----------------------------------------------------

    fn execute_call(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(id).to_vec();
        let (primary, args_node) = (children[0], children[1]);
        let span = self.decorated.tree.get(id).span;
        let arg_nodes = self.decorated.tree.children(args_node).to_vec();

        if self.decorated.tree.get(primary).attribute == Attribute::Identifier && self.decorated.decoration(primary).tag.is_none() {
            let name = self.decorated.tree.get(primary).text.clone().unwrap_or_default();
            if a68_modes::decorate::is_standenv(&name) {
                return self.execute_standenv_call(&name, &arg_nodes, table, frame, span);
            }
        }

        let callee = self.execute_unit(primary, table, frame)?;
        let callee = self.dereference(callee, span)?;
        let Value::Proc(proc_value) = callee else {
            return Err(Signal::Error(RuntimeError::ConversionError { detail: "call target is not a PROC value".into(), span }));
        };
        let proc_mode = self.deref_mode(self.decorated.mode_of(primary));
        let param_modes = match self.decorated.modes.get(proc_mode) {
            Mode::Proc { params, .. } => params.clone(),
            _ => Vec::new(),
        };
        let mut args = Vec::with_capacity(arg_nodes.len());
        self.up_garbage_sema();
        for (i, arg) in arg_nodes.iter().enumerate() {
            let raw = match self.execute_unit_coerced(*arg, table, frame) {
                Ok(v) => v,
                Err(e) => {
                    self.down_garbage_sema();
                    return Err(e);
                }
            };
            let arg_mode = self.decorated.mode_of(*arg);
            let coerced = match param_modes.get(i) {
                Some(to) => match self.coerce_value_to(raw, arg_mode, *to, span) {
                    Ok(v) => v,
                    Err(e) => {
                        self.down_garbage_sema();
                        return Err(e);
                    }
                },
                None => raw,
            };
            args.push(coerced);
        }
        self.down_garbage_sema();
        self.invoke_routine(proc_value.node, proc_value.frame, &args, span)
    }

    fn deref_mode(&self, mode: ModeId) -> ModeId {
        match self.decorated.modes.get(mode) {
            Mode::Ref(inner) => *inner,
            _ => mode,
        }
    }

    /// Looks `name` up the same lexical chain `elaborate_identifier` walked for an
    /// operator tag, then finds the closure the matching `OperatorDeclaration`
    /// recorded when it executed. `None` means no user `OP` shadows `name` here;
    /// the caller falls back to the built-in dyadic/monadic table.
    fn resolve_operator(&self, lookup_table: TableId, name: &str) -> Option<(NodeId, FrameId)> {
        let resolved = self.decorated.tables.resolve(lookup_table, TagKind::Operator, name)?;
        self.operators.get(&(resolved.table, name.to_string())).copied()
    }

    /// Shared call mechanics for both a `PROC` value invocation and a user
    /// operator application: push a frame for the routine/operator's own
    /// parameter table, bind each formal in declared order, and run its body.
    fn invoke_routine(&mut self, proc_node: NodeId, closure_frame: FrameId, args: &[Value], span: Span) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(proc_node).to_vec();
        let pack = children[0];
        let body = children[2];
        let proc_table = self.decorated.decoration(pack).table;
        let call_frame = self.push_frame_for(proc_table, closure_frame, span)?;
        let params = self.decorated.tree.children(pack).to_vec();
        for (p, arg) in params.iter().zip(args) {
            let pchildren = self.decorated.tree.children(*p).to_vec();
            if pchildren.len() == 2 {
                let pname = self.decorated.tree.get(pchildren[1]).text.clone().unwrap_or_default();
                let resolved = self
                    .decorated
                    .tables
                    .resolve(proc_table, TagKind::Identifier, &pname)
                    .expect("routine parameter must have registered its own tag");
                *self.frames.slot_mut(call_frame, resolved.table, resolved.tag.offset) = arg.clone();
            }
        }
        let result = self.execute_unit_coerced(body, proc_table, call_frame);
        self.frames.release(call_frame);
        result
    }

    // --- formulas --------------------------------------------------------------

    fn execute_formula(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let children = self.decorated.tree.children(id).to_vec();
        let (lhs, rhs) = (children[0], children[1]);
        let op = self.decorated.tree.get(id).text.clone().unwrap_or_default();
        let span = self.decorated.tree.get(id).span;
        self.up_garbage_sema();
        let lv = match self.execute_unit_coerced(lhs, table, frame) {
            Ok(v) => v,
            Err(e) => {
                self.down_garbage_sema();
                return Err(e);
            }
        };
        let rv = match self.execute_unit_coerced(rhs, table, frame) {
            Ok(v) => v,
            Err(e) => {
                self.down_garbage_sema();
                return Err(e);
            }
        };
        self.down_garbage_sema();
        if let Some((decl_id, closure_frame)) = self.resolve_operator(table, &op) {
            return self.invoke_routine(decl_id, closure_frame, &[lv, rv], span);
        }
        self.builtin_dyadic(&op, lv, rv, span)
    }

    fn builtin_dyadic(&self, op: &str, lv: Value, rv: Value, span: Span) -> Result<Value, Signal> {
        match op {
            "=" | "/=" | "<" | "<=" | ">" | ">=" => self.compare(op, &lv, &rv, span),
            "OR" => Ok(Value::Bool(lv.truthy() || rv.truthy())),
            "AND" => Ok(Value::Bool(lv.truthy() && rv.truthy())),
            "MOD" => {
                let (a, b) = (expect_int(&lv, span)?, expect_int(&rv, span)?);
                if b == 0 {
                    return Err(Signal::Error(RuntimeError::DivisionByZero { span }));
                }
                Ok(Value::Int(a.rem_euclid(b)))
            }
            "OVER" => {
                let (a, b) = (expect_int(&lv, span)?, expect_int(&rv, span)?);
                if b == 0 {
                    return Err(Signal::Error(RuntimeError::DivisionByZero { span }));
                }
                Ok(Value::Int(a.div_euclid(b)))
            }
            _ => self.arithmetic(op, &lv, &rv, span),
        }
    }

    fn compare(&self, op: &str, lv: &Value, rv: &Value, span: Span) -> Result<Value, Signal> {
        let ordering = if let (Some(a), Some(b)) = (numeric_f64(lv), numeric_f64(rv)) {
            a.partial_cmp(&b)
        } else if let (Value::Char(a), Value::Char(b)) = (lv, rv) {
            a.partial_cmp(b)
        } else if let (Value::Bool(a), Value::Bool(b)) = (lv, rv) {
            a.partial_cmp(b)
        } else {
            None
        };
        let Some(ordering) = ordering else {
            return Err(Signal::Error(RuntimeError::ConversionError {
                detail: format!("cannot compare {} and {}", lv.type_name(), rv.type_name()),
                span,
            }));
        };
        use std::cmp::Ordering::{Equal, Greater, Less};
        let result = match op {
            "=" => ordering == Equal,
            "/=" => ordering != Equal,
            "<" => ordering == Less,
            "<=" => ordering != Greater,
            ">" => ordering == Greater,
            ">=" => ordering != Less,
            _ => unreachable!("compare only dispatches on the six relational operators"),
        };
        Ok(Value::Bool(result))
    }

    fn arithmetic(&self, op: &str, lv: &Value, rv: &Value, span: Span) -> Result<Value, Signal> {
        let (Some(a), Some(b)) = (numeric_f64(lv), numeric_f64(rv)) else {
            return Err(Signal::Error(RuntimeError::ConversionError {
                detail: format!("arithmetic on non-numeric {} and {}", lv.type_name(), rv.type_name()),
                span,
            }));
        };
        let is_int_kind = matches!(lv, Value::Int(_) | Value::LongInt(_) | Value::LongLongInt { .. });
        let result = match op {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            "/" => {
                if b == 0.0 {
                    return Err(Signal::Error(RuntimeError::DivisionByZero { span }));
                }
                a / b
            }
            "%" => {
                if b == 0.0 {
                    return Err(Signal::Error(RuntimeError::DivisionByZero { span }));
                }
                (a / b).trunc()
            }
            "**" | "UP" | "^" => a.powf(b),
            other => return Err(Signal::Error(RuntimeError::ConversionError { detail: format!("unknown operator {other}"), span })),
        };
        let result = if is_int_kind { result.trunc() } else { result };
        Ok(rewrap_numeric(lv, rv, result))
    }

    fn execute_monadic(&mut self, id: NodeId, table: TableId, frame: FrameId) -> Result<Value, Signal> {
        let operand = self.decorated.tree.children(id)[0];
        let op = self.decorated.tree.get(id).text.clone().unwrap_or_default();
        let span = self.decorated.tree.get(id).span;
        let value = self.execute_unit_coerced(operand, table, frame)?;
        if let Some((decl_id, closure_frame)) = self.resolve_operator(table, &op) {
            return self.invoke_routine(decl_id, closure_frame, &[value], span);
        }
        self.builtin_monadic(&op, value, span)
    }

    fn builtin_monadic(&self, op: &str, value: Value, span: Span) -> Result<Value, Signal> {
        match op {
            "NOT" => Ok(Value::Bool(!value.truthy())),
            "ODD" => Ok(Value::Bool(expect_int(&value, span)? % 2 != 0)),
            "ABS" => {
                let n = numeric_f64(&value)
                    .ok_or_else(|| Signal::Error(RuntimeError::ConversionError { detail: "ABS expects a numeric value".into(), span }))?;
                Ok(rewrap_numeric(&value, &value, n.abs()))
            }
            "-" => {
                let n = numeric_f64(&value).ok_or_else(|| {
                    Signal::Error(RuntimeError::ConversionError { detail: "monadic - expects a numeric value".into(), span })
                })?;
                Ok(rewrap_numeric(&value, &value, -n))
            }
            _ => Ok(value),
        }
    }

    // --- standard environ (§4.8-§4.10) ------------------------------------------

    /// `print`/`write`/`printf` take a single argument: a parenthesized list of
    /// transput items (`print((a, b))`, the Revised Report's `REF [] SIMPLOUT`
    /// convention). A `CollateralClause` node is that list; anything else is a
    /// lone item standing in for a one-element list.
    fn transput_items(&self, node: NodeId) -> Vec<NodeId> {
        if self.decorated.tree.get(node).attribute == Attribute::CollateralClause {
            self.decorated.tree.children(node).to_vec()
        } else {
            vec![node]
        }
    }

    fn execute_standenv_call(
        &mut self,
        name: &str,
        arg_nodes: &[NodeId],
        table: TableId,
        frame: FrameId,
        span: Span,
    ) -> Result<Value, Signal> {
        match name {
            "print" => {
                for arg in arg_nodes {
                    self.write_standenv_arg(*arg, table, frame, span)?;
                }
                self.emit_newline(span)?;
                Ok(Value::Void)
            }
            "write" => {
                for arg in arg_nodes {
                    self.write_standenv_arg(*arg, table, frame, span)?;
                }
                Ok(Value::Void)
            }
            "println" => {
                for arg in arg_nodes {
                    self.write_standenv_arg(*arg, table, frame, span)?;
                }
                self.emit_newline(span)?;
                Ok(Value::Void)
            }
            "printf" | "writef" => self.execute_printf(arg_nodes, table, frame, span),
            "read" | "readf" => self.execute_read(name, arg_nodes, table, frame, span),
            "whole" => self.call_whole(arg_nodes, table, frame, span),
            "fixed" => self.call_fixed(arg_nodes, table, frame, span),
            "float" => self.call_float(arg_nodes, table, frame, span),
            "new line" | "newline" | "nl" => {
                self.emit_newline(span)?;
                Ok(Value::Void)
            }
            _ => Ok(Value::Void),
        }
    }

    fn write_standenv_arg(&mut self, node: NodeId, table: TableId, frame: FrameId, span: Span) -> Result<(), Signal> {
        for item in self.transput_items(node) {
            let value = self.execute_statement(item, table, frame)?;
            self.write_transput_item(&value, span)?;
        }
        Ok(())
    }

    fn write_transput_item(&mut self, value: &Value, span: Span) -> Result<(), Signal> {
        let text = self.stringify(value, span)?;
        self.stdout
            .write_all(text.as_bytes())
            .map_err(|e| Signal::Error(RuntimeError::IoError { detail: e.to_string(), span }))
    }

    fn emit_newline(&mut self, span: Span) -> Result<(), Signal> {
        self.stdout
            .write_all(b"\n")
            .map_err(|e| Signal::Error(RuntimeError::IoError { detail: e.to_string(), span }))
    }

    /// Unformatted stringification (§4.8 "Transput", §8 S1/S4): widths come from
    /// `a68-core::numeric`'s default field widths, matching the reference runtime's
    /// `print`/`write` convention of always padding to a fixed column width rather
    /// than emitting the shortest decimal representation.
    fn stringify(&mut self, value: &Value, span: Span) -> Result<String, Signal> {
        match value {
            Value::Void => Ok(String::new()),
            Value::Empty(mode) => Err(Signal::Error(RuntimeError::EmptyValue { mode: Some(self.decorated.modes.name(*mode)), span })),
            Value::Int(n) => Ok(format::whole(*n, a68_core::numeric::INT_WIDTH as i64)),
            Value::LongInt(n) => {
                let width = a68_core::numeric::scaled_width(a68_core::numeric::INT_WIDTH, 1) as i64;
                Ok(format::whole(i64::try_from(*n).unwrap_or(i64::MAX), width))
            }
            Value::LongLongInt { mantissa, scale } => {
                let approx = (*mantissa as f64) * 10f64.powi(*scale);
                let width = a68_core::numeric::scaled_width(a68_core::numeric::INT_WIDTH, 2) as i64;
                Ok(format::whole(approx as i64, width))
            }
            Value::Real(n) => Ok(format::fixed(*n, a68_core::numeric::REAL_WIDTH as i64, a68_core::numeric::REAL_DIGITS as i64)),
            Value::LongReal(n) => {
                let width = a68_core::numeric::scaled_width(a68_core::numeric::REAL_WIDTH, 1) as i64;
                Ok(format::fixed(*n, width, a68_core::numeric::REAL_DIGITS as i64))
            }
            Value::LongLongReal { mantissa, scale } => {
                let approx = (*mantissa as f64) * 10f64.powi(*scale);
                let width = a68_core::numeric::scaled_width(a68_core::numeric::REAL_WIDTH, 2) as i64;
                Ok(format::fixed(approx, width, a68_core::numeric::REAL_DIGITS as i64))
            }
            Value::Bool(b) => Ok(if *b { "T".to_string() } else { "F".to_string() }),
            Value::Char(c) => Ok(c.to_string()),
            Value::Bits(b) => Ok(format::whole(*b as i64, a68_core::numeric::INT_WIDTH as i64)),
            Value::Ref(r) => {
                let inner = self.read_ref(*r, span)?;
                self.stringify(&inner, span)
            }
            Value::Row(h) => self.stringify_row(*h, span),
            Value::Struct(h) => {
                let fields = match self.heap.get(*h) {
                    HeapObject::Struct { fields, .. } => fields.clone(),
                    _ => unreachable!("Value::Struct must point at a struct HeapObject"),
                };
                let mut out = String::new();
                for f in &fields {
                    out.push_str(&self.stringify(&f.clone(), span)?);
                }
                Ok(out)
            }
            Value::Union(_, inner) => {
                let inner = (**inner).clone();
                self.stringify(&inner, span)
            }
            Value::Proc(_) | Value::Format(_) => Ok(String::new()),
        }
    }

    /// A `[] CHAR`/`STRING` row prints as plain text; any other row prints each
    /// element's own stringification concatenated, with no separator.
    fn stringify_row(&mut self, handle: Handle, span: Span) -> Result<String, Signal> {
        let (mode, elements) = match self.heap.get(handle) {
            HeapObject::Row(row) => (row.mode, row.elements.clone()),
            _ => unreachable!("stringify_row must address a RowObject"),
        };
        let is_char_row = match self.decorated.modes.get(mode) {
            Mode::String => true,
            Mode::Row { elem, .. } => matches!(self.decorated.modes.get(*elem), Mode::Char),
            _ => false,
        };
        if is_char_row {
            let mut s = String::with_capacity(elements.len());
            for e in &elements {
                if let Value::Char(c) = e {
                    s.push(*c);
                }
            }
            return Ok(s);
        }
        let mut out = String::new();
        for e in &elements {
            out.push_str(&self.stringify(&e.clone(), span)?);
        }
        Ok(out)
    }

    /// `printf`/`writef`'s first transput item is a `FORMAT`; the rest are the
    /// values its picture consumes in order (§4.10 "Formatted transput").
    fn execute_printf(&mut self, arg_nodes: &[NodeId], table: TableId, frame: FrameId, span: Span) -> Result<Value, Signal> {
        let Some(first) = arg_nodes.first() else { return Ok(Value::Void) };
        let items = self.transput_items(*first);
        if items.is_empty() {
            return Ok(Value::Void);
        }
        let format_value = self.execute_statement(items[0], table, frame)?;
        let format_value = self.dereference(format_value, span)?;
        let Value::Format(format_node) = format_value else {
            return Err(Signal::Error(RuntimeError::ConversionError { detail: "printf's first item must be a FORMAT".into(), span }));
        };
        let picture_text = self.decorated.tree.get(format_node).text.clone().unwrap_or_default();
        let picture = format::parse_format(&picture_text).map_err(Signal::Error)?;

        let mut values = Vec::with_capacity(items.len().saturating_sub(1));
        self.up_garbage_sema();
        for item in &items[1..] {
            match self.execute_statement(*item, table, frame) {
                Ok(v) => values.push(v),
                Err(e) => {
                    self.down_garbage_sema();
                    return Err(e);
                }
            }
        }
        self.down_garbage_sema();
        let mut value_iter = values.into_iter();
        for piece in &picture {
            match piece {
                FormatItem::Literal(text) => {
                    self.stdout
                        .write_all(text.as_bytes())
                        .map_err(|e| Signal::Error(RuntimeError::IoError { detail: e.to_string(), span }))?;
                }
                FormatItem::Pattern(pattern) => {
                    let Some(value) = value_iter.next() else {
                        return Err(Signal::Error(RuntimeError::FormatError { detail: "not enough values for format".into(), span }));
                    };
                    let value = self.dereference(value, span)?;
                    let numeric = numeric_f64(&value).ok_or_else(|| {
                        Signal::Error(RuntimeError::ConversionError { detail: "format pattern expects a numeric value".into(), span })
                    })?;
                    let text = format::apply_pattern(pattern, numeric);
                    self.stdout
                        .write_all(text.as_bytes())
                        .map_err(|e| Signal::Error(RuntimeError::IoError { detail: e.to_string(), span }))?;
                }
            }
        }
        Ok(Value::Void)
    }

    /// Reads whitespace-delimited tokens from `stdin` into each target name in
    /// turn. `readf`'s leading `FORMAT` item is consumed and otherwise ignored:
    /// this subset doesn't drive field widths from the picture on input, only on
    /// output (see `DESIGN.md`).
    fn execute_read(&mut self, name: &str, arg_nodes: &[NodeId], table: TableId, frame: FrameId, span: Span) -> Result<Value, Signal> {
        let Some(first) = arg_nodes.first() else { return Ok(Value::Void) };
        let items = self.transput_items(*first);
        let mut iter = items.into_iter();
        if name == "readf" {
            if let Some(format_item) = iter.next() {
                let _ = self.execute_statement(format_item, table, frame)?;
            }
        }
        for item in iter {
            let target = self.execute_unit(item, table, frame)?;
            let Value::Ref(r) = target else {
                return Err(Signal::Error(RuntimeError::ConversionError { detail: "read target must be a name".into(), span }));
            };
            self.read_into(r, span)?;
        }
        Ok(Value::Void)
    }

    fn read_byte(&mut self, span: Span) -> Result<Option<u8>, Signal> {
        let mut buf = [0u8; 1];
        match self.stdin.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) => Err(Signal::Error(RuntimeError::IoError { detail: e.to_string(), span })),
        }
    }

    fn read_token(&mut self, span: Span) -> Result<Option<String>, Signal> {
        let mut token = String::new();
        loop {
            match self.read_byte(span)? {
                None => break,
                Some(b) if (b as char).is_whitespace() => {
                    if !token.is_empty() {
                        break;
                    }
                }
                Some(b) => token.push(b as char),
            }
        }
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(token))
        }
    }

    /// Parses one token into the same `Value` variant the target name already
    /// holds, so `read` doesn't need the target's static mode threaded through.
    fn read_into(&mut self, reference: Reference, span: Span) -> Result<(), Signal> {
        let old = self.read_ref(reference, span)?;
        let Some(token) = self.read_token(span)? else {
            return Err(Signal::Error(RuntimeError::IoError { detail: "end of input".into(), span }));
        };
        if matches!(old, Value::Row(_)) {
            let value = self.alloc_string(&token, span)?;
            return self.write_ref(reference, value, span);
        }
        let parse_err = |e: std::num::ParseIntError| Signal::Error(RuntimeError::ConversionError { detail: e.to_string(), span });
        let parse_float_err = |e: std::num::ParseFloatError| Signal::Error(RuntimeError::ConversionError { detail: e.to_string(), span });
        let parsed = match old {
            Value::Int(_) => Value::Int(token.parse::<i64>().map_err(parse_err)?),
            Value::LongInt(_) => Value::LongInt(token.parse::<i128>().map_err(|e| {
                Signal::Error(RuntimeError::ConversionError { detail: e.to_string(), span })
            })?),
            Value::Real(_) => Value::Real(token.parse::<f64>().map_err(parse_float_err)?),
            Value::LongReal(_) => Value::LongReal(token.parse::<f64>().map_err(parse_float_err)?),
            Value::Bool(_) => Value::Bool(matches!(token.as_str(), "T" | "t" | "true" | "TRUE")),
            Value::Char(_) => Value::Char(token.chars().next().unwrap_or(' ')),
            Value::Bits(_) => Value::Bits(token.parse::<u64>().map_err(parse_err)?),
            other => other,
        };
        self.write_ref(reference, parsed, span)
    }

    fn call_whole(&mut self, arg_nodes: &[NodeId], table: TableId, frame: FrameId, span: Span) -> Result<Value, Signal> {
        let value = self.execute_unit_coerced(arg_nodes[0], table, frame)?;
        let n = expect_int(&value, span)?;
        let width = if arg_nodes.len() > 1 {
            expect_int(&self.execute_unit_coerced(arg_nodes[1], table, frame)?, span)?
        } else {
            0
        };
        self.alloc_string(&format::whole(n, width), span)
    }

    fn call_fixed(&mut self, arg_nodes: &[NodeId], table: TableId, frame: FrameId, span: Span) -> Result<Value, Signal> {
        let value = self.execute_unit_coerced(arg_nodes[0], table, frame)?;
        let x = numeric_f64(&value)
            .ok_or_else(|| Signal::Error(RuntimeError::ConversionError { detail: "fixed expects a numeric value".into(), span }))?;
        let width = expect_int(&self.execute_unit_coerced(arg_nodes[1], table, frame)?, span)?;
        let places = expect_int(&self.execute_unit_coerced(arg_nodes[2], table, frame)?, span)?;
        self.alloc_string(&format::fixed(x, width, places), span)
    }

    fn call_float(&mut self, arg_nodes: &[NodeId], table: TableId, frame: FrameId, span: Span) -> Result<Value, Signal> {
        let value = self.execute_unit_coerced(arg_nodes[0], table, frame)?;
        let x = numeric_f64(&value)
            .ok_or_else(|| Signal::Error(RuntimeError::ConversionError { detail: "float expects a numeric value".into(), span }))?;
        let width = expect_int(&self.execute_unit_coerced(arg_nodes[1], table, frame)?, span)?;
        let mantissa_digits = expect_int(&self.execute_unit_coerced(arg_nodes[2], table, frame)?, span)?;
        let exp_digits = expect_int(&self.execute_unit_coerced(arg_nodes[3], table, frame)?, span)?;
        self.alloc_string(&format::float(x, width, mantissa_digits, exp_digits), span)
    }
}

fn numeric_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::LongInt(n) => Some(*n as f64),
        Value::LongLongInt { mantissa, scale } => Some((*mantissa as f64) * 10f64.powi(*scale)),
        Value::Real(n) | Value::LongReal(n) => Some(*n),
        Value::LongLongReal { mantissa, scale } => Some((*mantissa as f64) * 10f64.powi(*scale)),
        _ => None,
    }
}

/// Rewraps a computed `f64` in whichever operand's `Value` variant is the
/// "widest" of the two, matching the widening `dyadic_result_mode` already
/// recorded as a coercion on both operands before this ever runs.
fn rewrap_numeric(lv: &Value, rv: &Value, result: f64) -> Value {
    match (lv, rv) {
        (Value::LongLongInt { .. }, _) | (_, Value::LongLongInt { .. }) => Value::LongLongInt { mantissa: result as i128, scale: 0 },
        (Value::LongLongReal { .. }, _) | (_, Value::LongLongReal { .. }) => {
            Value::LongLongReal { mantissa: (result * 1e18) as i128, scale: 18 }
        }
        (Value::LongInt(_), _) | (_, Value::LongInt(_)) => Value::LongInt(result as i128),
        (Value::LongReal(_), _) | (_, Value::LongReal(_)) => Value::LongReal(result),
        (Value::Real(_), _) | (_, Value::Real(_)) => Value::Real(result),
        _ => Value::Int(result as i64),
    }
}
