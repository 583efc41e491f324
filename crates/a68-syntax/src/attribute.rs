// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! The tree attribute vocabulary nodes are tagged with.
//!
//! Matches the non-exhaustive vocabulary enumerated for the decorated-tree contract, plus
//! a handful of structural helpers (`Program`, `Declarer`, `BoundsList`, ...) the parser
//! needs to hold parts of a clause together before `a68-modes` decorates them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Program,
    Unit,
    Tertiary,
    Secondary,
    Primary,
    Assignation,
    IdentityRelation,
    AndFunction,
    OrFunction,
    RoutineText,
    Skip,
    Jump,
    Assertion,
    Call,
    Slice,
    Selection,
    Cast,
    FormatText,
    Denoter,
    Identifier,
    Nihil,
    Generator,
    Formula,
    MonadicFormula,
    SerialClause,
    EnquiryClause,
    CollateralClause,
    ConditionalClause,
    IntegerCaseClause,
    UnitedCaseClause,
    LoopClause,
    ClosedClause,
    ParallelClause,
    CodeClause,
    IdentityDeclaration,
    VariableDeclaration,
    ProcedureDeclaration,
    ProcedureVariableDeclaration,
    OperatorDeclaration,
    BriefOperatorDeclaration,
    PriorityDeclaration,
    ModeDeclaration,
    DeclarationList,
    LabeledUnit,
    SpecifiedUnit,

    /// Type declarator (`INT`, `REF REAL`, `[1:3] INT`, `PROC (INT) REAL`, ...).
    Declarer,
    /// One bound of a row declarator or generator, `lower : upper` (upper may be absent
    /// for a `FLEX`-only bound, and `lower` may be absent meaning `1`).
    Bound,
    /// A formal-parameter pack of a `PROC` declarer or routine text.
    ParameterPack,
    /// One formal parameter: a declarer plus the bound identifier.
    Parameter,
    /// Actual-argument list of a `CALL`.
    ArgumentList,

    // Structural "part" wrappers for multi-part clauses. Each wraps exactly the unit(s)
    // or sub-clause that part holds; genie/modes locate a clause's parts by scanning
    // children for the matching tag rather than relying on a fixed position, since many
    // parts are optional.
    ThenPart,
    ElsePart,
    InPart,
    OutPart,
    OusePart,
    ForPart,
    FromPart,
    ByPart,
    ToPart,
    WhilePart,
    DoPart,
    /// List of `SpecifiedUnit`s in a `UnitedCaseClause`.
    SpecifierList,
}
