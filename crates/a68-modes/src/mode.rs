// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Mode table: an interning arena of resolved modes plus the size/coercion facts the
//! genie needs about each one.
//!
//! Every mode that appears anywhere in a program — whether spelled out by a declarer,
//! synthesized for a row/struct/union, or produced by widening — gets exactly one
//! [`ModeId`] here, so mode equality is `ModeId` equality after interning.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(u32);

impl ModeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Numeric mode flavour, shared by `INT` and `REAL` so `LONG`/`SHORT` scaling is
/// uniform. `longs` follows the Revised Report convention: 0 for the plain mode, 1 for
/// one `LONG`, 2 for `LONG LONG`, -1 for `SHORT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumKind {
    Int,
    Real,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    Void,
    Numeric(NumKind, i8),
    Bool,
    Char,
    Bits,
    String,
    Format,
    Ref(ModeId),
    /// A row of `dims` dimensions over `elem`. `flex` rows may be resized by
    /// deep-copying assignment (§4.4).
    Row { elem: ModeId, dims: u8, flex: bool },
    Struct(Vec<(String, ModeId)>),
    Union(Vec<ModeId>),
    Proc { params: Vec<ModeId>, result: ModeId },
    File,
}

impl Mode {
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Mode::Numeric(..))
    }

    #[must_use]
    pub fn is_row(&self) -> bool {
        matches!(self, Mode::Row { .. } | Mode::String)
    }

    #[must_use]
    pub fn is_stowed(&self) -> bool {
        matches!(self, Mode::Row { .. } | Mode::Struct(_) | Mode::Union(_) | Mode::String)
    }

    #[must_use]
    pub fn is_flex(&self) -> bool {
        matches!(self, Mode::Row { flex: true, .. } | Mode::String)
    }
}

/// Interns [`Mode`]s by structural equality and answers size/naming questions about
/// them. Sizes are counted in "cells" (one genie value slot each), not bytes — see
/// `DESIGN.md` for why this workspace trades the reference runtime's byte-accurate
/// frame layout for a safe, Vec-indexed slot layout.
#[derive(Debug, Clone, Default)]
pub struct ModeTable {
    modes: Vec<Mode>,
}

impl ModeTable {
    #[must_use]
    pub fn new() -> Self {
        Self { modes: Vec::new() }
    }

    pub fn intern(&mut self, mode: Mode) -> ModeId {
        if let Some(pos) = self.modes.iter().position(|m| m == &mode) {
            return ModeId(u32::try_from(pos).expect("mode table overflow"));
        }
        let id = ModeId(u32::try_from(self.modes.len()).expect("mode table overflow"));
        self.modes.push(mode);
        id
    }

    #[must_use]
    pub fn get(&self, id: ModeId) -> &Mode {
        &self.modes[id.index()]
    }

    /// Number of `Value` slots a cell of this mode occupies in a frame or struct pack.
    /// Scalars and references are one slot; a `STRUCT` is the sum of its fields; `ROW`
    /// and `UNION` are one slot each because their payload (descriptor / tag+payload)
    /// lives behind an owned heap allocation or an inline tagged enum variant.
    #[must_use]
    pub fn size_of(&self, id: ModeId) -> usize {
        match self.get(id) {
            Mode::Struct(fields) => fields.iter().map(|(_, m)| self.size_of(*m)).sum::<usize>().max(1),
            _ => 1,
        }
    }

    /// Field name/mode/offset of a `STRUCT`, in declared order. Offsets are in cells,
    /// matching [`ModeTable::size_of`].
    #[must_use]
    pub fn struct_fields(&self, id: ModeId) -> Vec<(String, ModeId, usize)> {
        let Mode::Struct(fields) = self.get(id) else {
            return Vec::new();
        };
        let mut offset = 0;
        let mut out = Vec::with_capacity(fields.len());
        for (name, mode) in fields {
            out.push((name.clone(), *mode, offset));
            offset += self.size_of(*mode);
        }
        out
    }

    /// Whether `from` widens to `to` by a single widening step (§4.3): `INT -> REAL`,
    /// `REAL -> LONG REAL`-style precision widening, or the reflexive identity step.
    #[must_use]
    pub fn widens_to(&self, from: ModeId, to: ModeId) -> bool {
        if from == to {
            return true;
        }
        match (self.get(from), self.get(to)) {
            (Mode::Numeric(NumKind::Int, a), Mode::Numeric(NumKind::Real, b)) => a == b,
            (Mode::Numeric(k, a), Mode::Numeric(k2, b)) if k == k2 => b > a,
            (Mode::Bits, Mode::Row { elem, dims: 1, .. }) => matches!(self.get(*elem), Mode::Bool),
            (Mode::String, Mode::Row { elem, dims: 1, .. }) => matches!(self.get(*elem), Mode::Char),
            _ => false,
        }
    }

    /// `true` if `id` is (recursively) a `UNION` variant that `member` firmly belongs
    /// to — a pragmatic subset of the Revised Report firmness relation covering direct
    /// membership and widening into a member, which is all `UNITED CASE` needs.
    #[must_use]
    pub fn union_accepts(&self, union: ModeId, member: ModeId) -> bool {
        match self.get(union) {
            Mode::Union(variants) => variants.iter().any(|v| *v == member || self.widens_to(member, *v)),
            _ => false,
        }
    }

    #[must_use]
    pub fn name(&self, id: ModeId) -> String {
        self.name_of(self.get(id))
    }

    fn name_of(&self, mode: &Mode) -> String {
        match mode {
            Mode::Void => "VOID".to_string(),
            Mode::Numeric(kind, longs) => {
                let base = match kind {
                    NumKind::Int => "INT",
                    NumKind::Real => "REAL",
                };
                match longs.cmp(&0) {
                    std::cmp::Ordering::Equal => base.to_string(),
                    std::cmp::Ordering::Greater => format!("{} {base}", "LONG ".repeat(*longs as usize).trim_end()),
                    std::cmp::Ordering::Less => format!("{} {base}", "SHORT ".repeat((-longs) as usize).trim_end()),
                }
            }
            Mode::Bool => "BOOL".to_string(),
            Mode::Char => "CHAR".to_string(),
            Mode::Bits => "BITS".to_string(),
            Mode::String => "STRING".to_string(),
            Mode::Format => "FORMAT".to_string(),
            Mode::File => "FILE".to_string(),
            Mode::Ref(inner) => format!("REF {}", self.name(*inner)),
            Mode::Row { elem, dims, flex } => {
                let bounds = vec!["*"; *dims as usize].join(", ");
                if *flex {
                    format!("FLEX [{bounds}] {}", self.name(*elem))
                } else {
                    format!("[{bounds}] {}", self.name(*elem))
                }
            }
            Mode::Struct(fields) => {
                let parts: Vec<String> = fields.iter().map(|(n, m)| format!("{} {n}", self.name(*m))).collect();
                format!("STRUCT ({})", parts.join(", "))
            }
            Mode::Union(variants) => {
                let parts: Vec<String> = variants.iter().map(|m| self.name(*m)).collect();
                format!("UNION ({})", parts.join(", "))
            }
            Mode::Proc { params, result } => {
                let parts: Vec<String> = params.iter().map(|m| self.name(*m)).collect();
                format!("PROC ({}) {}", parts.join(", "), self.name(*result))
            }
        }
    }
}

impl fmt::Display for ModeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mode) in self.modes.iter().enumerate() {
            writeln!(f, "{i}: {}", self.name_of(mode))?;
        }
        Ok(())
    }
}
