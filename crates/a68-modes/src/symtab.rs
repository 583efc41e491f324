// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Nested symbol tables, one per range (§3.4).
//!
//! A table is created for every node that opens a frame at run time: the program, a
//! routine text body, a loop body (when it has a `FOR` identifier), and any serial
//! clause that carries its own declarations or labels. Tables form a chain via
//! `parent`; tag lookup walks the chain outward, which is exactly the static-link
//! chain the frame/scope engine (C5) follows at run time.

use std::collections::HashMap;

use a68_core::Span;

use crate::mode::ModeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TableId(u32);

impl TableId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Identifier,
    Operator,
    Indicant,
    Priority,
    Label,
    Anonymous,
}

/// Scope qualifier for a variable's generator, `LOC` (frame-local) or `HEAP`
/// (GC-managed). Identifiers, operators and labels don't carry a generator and use
/// `Loc` as a harmless default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorScope {
    Loc,
    Heap,
}

#[derive(Debug, Clone)]
pub struct Tag {
    pub name: String,
    pub kind: TagKind,
    pub mode: ModeId,
    pub table: TableId,
    /// Offset in cells within the frame this tag's table opens. Stable once assigned.
    pub offset: usize,
    pub scope: GeneratorScope,
    pub defined_at: Span,
    /// `true` once at least one read of this tag has been observed during
    /// elaboration, used only for the "unused tag" warning class (§7).
    pub used: bool,
}

/// One range's worth of declared names, keyed by (kind, spelling) since an operator
/// and an identifier may share a spelling, and by priority level for `PRIO`.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<TableId>,
    /// Lexical level: 0 for the program table, +1 per nested range. Matches the
    /// "lexical level" field the decorated-tree contract requires per node (§6).
    pub level: u32,
    tags: HashMap<(TagKind, String), Tag>,
    /// Sum of slot sizes of every tag declared directly in this table — the frame's
    /// `ap_increment` (§4.1).
    pub ap_increment: usize,
    /// `true` if this table's range ever declares a label, i.e. it needs a stored
    /// jump continuation slot in its frame header (§4.5).
    pub has_labels: bool,
}

impl Scope {
    fn declare(&mut self, kind: TagKind, name: String, mode: ModeId, table: TableId, span: Span, size: usize) -> Result<(), String> {
        if self.tags.contains_key(&(kind, name.clone())) {
            return Err(name);
        }
        let offset = self.ap_increment;
        self.ap_increment += size;
        self.tags.insert(
            (kind, name.clone()),
            Tag {
                name,
                kind,
                mode,
                table,
                offset,
                scope: GeneratorScope::Loc,
                defined_at: span,
                used: false,
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn lookup_local(&self, kind: TagKind, name: &str) -> Option<&Tag> {
        self.tags.get(&(kind, name.to_string()))
    }

    fn lookup_local_mut(&mut self, kind: TagKind, name: &str) -> Option<&mut Tag> {
        self.tags.get_mut(&(kind, name.to_string()))
    }
}

/// The chain of [`Scope`]s built while elaborating one program.
#[derive(Debug, Clone, Default)]
pub struct SymbolTables {
    tables: Vec<Scope>,
}

/// A tag together with the table it resolved in, returned by [`SymbolTables::resolve`]
/// so callers can compute a static-link distance (`level` difference) to it.
#[derive(Debug, Clone)]
pub struct ResolvedTag {
    pub tag: Tag,
    pub table: TableId,
}

impl SymbolTables {
    #[must_use]
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    pub fn push_table(&mut self, parent: Option<TableId>) -> TableId {
        let level = parent.map_or(0, |p| self.tables[p.index()].level + 1);
        let id = TableId(u32::try_from(self.tables.len()).expect("symbol table overflow"));
        self.tables.push(Scope {
            parent,
            level,
            ..Scope::default()
        });
        id
    }

    #[must_use]
    pub fn table(&self, id: TableId) -> &Scope {
        &self.tables[id.index()]
    }

    pub fn table_mut(&mut self, id: TableId) -> &mut Scope {
        &mut self.tables[id.index()]
    }

    /// Declares `name` of `kind`/`mode` in `table`, returning `Err` with the
    /// already-declared spelling on a duplicate (§7 "multiple declaration").
    pub fn declare(
        &mut self,
        table: TableId,
        kind: TagKind,
        name: String,
        mode: ModeId,
        span: Span,
        size: usize,
    ) -> Result<(), String> {
        self.tables[table.index()].declare(kind, name, mode, table, span, size)
    }

    pub fn set_generator_scope(&mut self, table: TableId, kind: TagKind, name: &str, scope: GeneratorScope) {
        if let Some(tag) = self.tables[table.index()].lookup_local_mut(kind, name) {
            tag.scope = scope;
        }
    }

    pub fn mark_used(&mut self, table: TableId, kind: TagKind, name: &str) {
        if let Some(tag) = self.tables[table.index()].lookup_local_mut(kind, name) {
            tag.used = true;
        }
    }

    pub fn mark_has_labels(&mut self, table: TableId) {
        self.tables[table.index()].has_labels = true;
    }

    /// Resolves `name` of `kind` starting at `from`, walking `parent` links outward.
    #[must_use]
    pub fn resolve(&self, from: TableId, kind: TagKind, name: &str) -> Option<ResolvedTag> {
        let mut cur = Some(from);
        while let Some(id) = cur {
            let scope = &self.tables[id.index()];
            if let Some(tag) = scope.lookup_local(kind, name) {
                return Some(ResolvedTag { tag: tag.clone(), table: id });
            }
            cur = scope.parent;
        }
        None
    }

    /// All tags ever declared, for the "unused tag" warning pass.
    pub fn all_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tables.iter().flat_map(|s| s.tags.values())
    }
}
