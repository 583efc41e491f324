// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

use super::*;
use crate::attribute::Attribute as A;
use a68_core::SourceId;

fn parse(text: &str) -> Tree {
    Parser::parse_program(text, SourceId::new(0)).unwrap_or_else(|e| panic!("{e}"))
}

fn root_serial(tree: &Tree) -> &Node {
    let program = tree.get(tree.root);
    assert_eq!(program.attribute, A::Program);
    tree.get(program.children[0])
}

#[test]
fn empty_program_parses_to_empty_serial_clause() {
    let tree = parse("");
    let serial = root_serial(&tree);
    assert_eq!(serial.attribute, A::SerialClause);
    assert!(serial.children.is_empty());
}

#[test]
fn identity_declaration_and_assignment() {
    let tree = parse("INT i := 0; i := i + 1");
    let serial = root_serial(&tree);
    assert_eq!(serial.children.len(), 2);

    let decl = tree.get(serial.children[0]);
    assert_eq!(decl.attribute, A::VariableDeclaration);
    let declarer = tree.get(decl.children[0]);
    assert_eq!(declarer.text.as_deref(), Some("INT"));
    let ident = tree.get(decl.children[1]);
    assert_eq!(ident.text.as_deref(), Some("i"));

    let assign = tree.get(serial.children[1]);
    assert_eq!(assign.attribute, A::Assignation);
    let rhs = tree.get(assign.children[1]);
    assert_eq!(rhs.attribute, A::Formula);
    assert_eq!(rhs.text.as_deref(), Some("+"));
}

#[test]
fn row_declaration_and_slice() {
    let tree = parse("[1:3] INT a := (7, 8, 9); a[2]");
    let serial = root_serial(&tree);
    let decl = tree.get(serial.children[0]);
    let declarer = tree.get(decl.children[0]);
    assert_eq!(declarer.text.as_deref(), Some("ROW"));
    let bound = tree.get(declarer.children[0]);
    assert_eq!(bound.attribute, A::Bound);
    assert_eq!(bound.children.len(), 2);

    let rhs = tree.get(decl.children[2]);
    assert_eq!(rhs.attribute, A::CollateralClause);
    assert_eq!(rhs.children.len(), 3);

    let slice = tree.get(serial.children[1]);
    assert_eq!(slice.attribute, A::Slice);
}

#[test]
fn conditional_clause_with_elif_and_else() {
    let tree = parse("IF a THEN 1 ELIF b THEN 2 ELSE 3 FI");
    let serial = root_serial(&tree);
    let outer = tree.get(serial.children[0]);
    assert_eq!(outer.attribute, A::ConditionalClause);
    assert_eq!(outer.children.len(), 3);
    let else_part = tree.get(outer.children[2]);
    assert_eq!(else_part.attribute, A::ElsePart);
    let nested = tree.get(else_part.children[0]);
    assert_eq!(nested.attribute, A::ConditionalClause);
    assert_eq!(nested.children.len(), 3);
}

#[test]
fn integer_case_clause() {
    let tree = parse("CASE k IN 1, 2, 3 OUT 4 ESAC");
    let serial = root_serial(&tree);
    let case = tree.get(serial.children[0]);
    assert_eq!(case.attribute, A::IntegerCaseClause);
    let in_part = tree.get(case.children[1]);
    assert_eq!(in_part.attribute, A::InPart);
    assert_eq!(in_part.children.len(), 3);
    let out_part = tree.get(case.children[2]);
    assert_eq!(out_part.attribute, A::OutPart);
}

#[test]
fn loop_clause_with_for_from_to() {
    let tree = parse("FOR i FROM 1 TO 10 DO SKIP OD");
    let serial = root_serial(&tree);
    let loop_clause = tree.get(serial.children[0]);
    assert_eq!(loop_clause.attribute, A::LoopClause);
    let tags: Vec<A> = loop_clause.children.iter().map(|id| tree.get(*id).attribute).collect();
    assert_eq!(tags, vec![A::ForPart, A::FromPart, A::ToPart, A::DoPart]);
}

#[test]
fn goto_jump_to_label() {
    let tree = parse("GOTO done; done: SKIP");
    let serial = root_serial(&tree);
    let jump = tree.get(serial.children[0]);
    assert_eq!(jump.attribute, A::Jump);
    assert_eq!(jump.text.as_deref(), Some("done"));
    let labeled = tree.get(serial.children[1]);
    assert_eq!(labeled.attribute, A::LabeledUnit);
    assert_eq!(labeled.text.as_deref(), Some("done"));
}

#[test]
fn operator_and_priority_declarations() {
    let tree = parse("PRIO MAX = 7; OP MAX = (INT a, INT b) INT: IF a > b THEN a ELSE b FI; 1 MAX 2");
    let serial = root_serial(&tree);
    assert_eq!(serial.children.len(), 3);
    let prio = tree.get(serial.children[0]);
    assert_eq!(prio.attribute, A::PriorityDeclaration);
    assert_eq!(prio.text.as_deref(), Some("MAX"));

    let op_decl = tree.get(serial.children[1]);
    assert_eq!(op_decl.attribute, A::OperatorDeclaration);
    assert_eq!(op_decl.text.as_deref(), Some("MAX"));

    let formula = tree.get(serial.children[2]);
    assert_eq!(formula.attribute, A::Formula);
    assert_eq!(formula.text.as_deref(), Some("MAX"));
}

#[test]
fn call_with_double_paren_collateral_argument() {
    let tree = parse("printf((f, 1.23))");
    let serial = root_serial(&tree);
    let call = tree.get(serial.children[0]);
    assert_eq!(call.attribute, A::Call);
    let args = tree.get(call.children[1]);
    assert_eq!(args.attribute, A::ArgumentList);
    assert_eq!(args.children.len(), 1);
    let arg = tree.get(args.children[0]);
    assert_eq!(arg.attribute, A::CollateralClause);
    assert_eq!(arg.children.len(), 2);
}

#[test]
fn call_with_plain_multi_argument_list() {
    let tree = parse("max(3, 4)");
    let serial = root_serial(&tree);
    let call = tree.get(serial.children[0]);
    let args = tree.get(call.children[1]);
    assert_eq!(args.children.len(), 2);
}

#[test]
fn format_text_captures_raw_picture_source() {
    let tree = parse("FORMAT f = $3d.2d$; f");
    let serial = root_serial(&tree);
    let decl = tree.get(serial.children[0]);
    assert_eq!(decl.attribute, A::IdentityDeclaration);
    let fmt = tree.get(decl.children[2]);
    assert_eq!(fmt.attribute, A::FormatText);
    assert_eq!(fmt.text.as_deref(), Some("3d.2d"));
}

#[test]
fn struct_declarer_with_fields() {
    let tree = parse("STRUCT (INT re, INT im) z");
    let serial = root_serial(&tree);
    let decl = tree.get(serial.children[0]);
    assert_eq!(decl.attribute, A::VariableDeclaration);
    let declarer = tree.get(decl.children[0]);
    assert_eq!(declarer.attribute, A::Declarer);
    assert_eq!(declarer.text.as_deref(), Some("STRUCT"));
    assert_eq!(declarer.children.len(), 4);
}

#[test]
fn selection_parses_of_keyword() {
    let tree = parse("z OF re");
    let serial = root_serial(&tree);
    let selection = tree.get(serial.children[0]);
    assert_eq!(selection.attribute, A::Selection);
    assert_eq!(selection.text.as_deref(), Some("re"));
}

#[test]
fn unexpected_token_reports_span() {
    let err = Parser::parse_program(")", SourceId::new(0)).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}
