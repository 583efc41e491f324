// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Recursive-descent parser for the Algol 68 Revised Report subset this crate supports.
//!
//! # Tree shape conventions
//!
//! Multi-part clauses (`IF`/`THEN`/`ELIF`/`ELSE`/`FI`, loops, case clauses) wrap each
//! optional part in a dedicated tagged node (`ThenPart`, `ForPart`, `WhilePart`, ...)
//! rather than relying on a fixed child position, since most parts are optional and a
//! position-based scheme would make `a68-modes`/`a68-genie` fragile to grammar tweaks.
//! `a68-modes` and `a68-genie` locate a clause's parts by scanning children for the
//! matching [`Attribute`].
//!
//! A parenthesized group `( ... )` is ambiguous between a closed clause (`;`-separated,
//! like `BEGIN ... END`) and a collateral clause (`,`-separated, a row/struct/argument
//! display) until its separator is seen; [`Parser::parse_paren_group`] disambiguates on
//! the first separator encountered, matching the Revised Report's own EBNF ambiguity
//! between the two productions.

use std::collections::HashMap;
use std::fmt;

use a68_core::{SourceId, Span};

use crate::attribute::Attribute;
use crate::lexer::{LexError, Lexer};
use crate::node::{Literal, Node, NodeId, Tree, TreeBuilder};
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Lex(LexError),
    UnexpectedToken { span: Span, found: String, expected: String },
    UnexpectedEof { span: Span, expected: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{e}"),
            ParseError::UnexpectedToken { found, expected, .. } => {
                write!(f, "expected {expected}, found {found}")
            }
            ParseError::UnexpectedEof { expected, .. } => {
                write!(f, "expected {expected}, found end of file")
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex(e) => e.span(),
            ParseError::UnexpectedToken { span, .. } | ParseError::UnexpectedEof { span, .. } => *span,
        }
    }
}

/// Dyadic operator priorities built into the parser (Revised Report table 9.4a,
/// abridged to the subset this crate evaluates). `PRIO` declarations extend this table
/// for the remainder of the source text being parsed.
fn builtin_priority(op: &str) -> Option<u8> {
    match op {
        "OR" => Some(1),
        "AND" => Some(2),
        "=" | "/=" | "<" | "<=" | ">" | ">=" => Some(3),
        "+" | "-" => Some(4),
        "*" | "/" | "MOD" | "OVER" => Some(5),
        _ => None,
    }
}

const MONADIC_OPS: &[&str] = &["+", "-", "NOT", "ABS", "ODD"];

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source_text: &'a str,
    priorities: HashMap<String, u8>,
    builder: TreeBuilder,
}

impl<'a> Parser<'a> {
    /// Tokenizes and parses `text` into a complete [`Tree`] rooted at a `Program` node.
    pub fn parse_program(text: &'a str, source: SourceId) -> Result<Tree, ParseError> {
        let tokens = Lexer::tokenize(text, source).map_err(ParseError::Lex)?;
        let mut parser = Self {
            tokens,
            pos: 0,
            source_text: text,
            priorities: HashMap::new(),
            builder: TreeBuilder::new(),
        };
        let serial = parser.parse_serial_clause_until(&[])?;
        let eof_span = parser.current().span;
        let program = parser.push(Node::new(Attribute::Program, eof_span), &[serial]);
        parser.expect_kind(&TokenKind::Eof, "end of file")?;
        Ok(parser.builder.finish(program))
    }

    // --- token stream helpers -------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_bold(&self, word: &str) -> bool {
        matches!(&self.current().kind, TokenKind::BoldWord(w) if w == word)
    }

    fn at_bold_any(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.at_bold(w))
    }

    fn at_operator(&self, op: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Operator(o) if o == op)
    }

    fn expect_bold(&mut self, word: &str) -> Result<Token, ParseError> {
        if self.at_bold(word) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(format!("'{word}'")))
        }
    }

    fn expect_operator(&mut self, op: &str) -> Result<Token, ParseError> {
        if self.at_operator(op) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(format!("'{op}'")))
        }
    }

    fn expect_kind(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if &self.current().kind == kind {
            Ok(self.bump())
        } else {
            Err(self.unexpected(expected.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, Span), ParseError> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let tok = self.bump();
                Ok((name, tok.span))
            }
            _ => Err(self.unexpected("an identifier".to_string())),
        }
    }

    fn unexpected(&self, expected: String) -> ParseError {
        let tok = self.current();
        if tok.kind == TokenKind::Eof {
            ParseError::UnexpectedEof { span: tok.span, expected }
        } else {
            ParseError::UnexpectedToken {
                span: tok.span,
                found: tok.kind.to_string(),
                expected,
            }
        }
    }

    // --- tree building helpers -------------------------------------------------

    fn push(&mut self, mut node: Node, children: &[NodeId]) -> NodeId {
        node.children = children.to_vec();
        self.builder.push(node)
    }

    fn push_text(&mut self, attribute: Attribute, span: Span, text: String, children: &[NodeId]) -> NodeId {
        let mut node = Node::new(attribute, span);
        node.text = Some(text);
        node.children = children.to_vec();
        self.builder.push(node)
    }

    fn wrap_part(&mut self, attribute: Attribute, span: Span, child: NodeId) -> NodeId {
        self.push(Node::new(attribute, span), &[child])
    }

    fn span_of(&self, id: NodeId) -> Span {
        self.builder_node(id).span
    }

    fn builder_node(&self, id: NodeId) -> &Node {
        self.builder.get(id)
    }

    // --- declarations ------------------------------------------------------

    fn at_declaration_start(&self) -> bool {
        if self.at_bold_any(&[
            "MODE", "OP", "PRIO", "INT", "REAL", "BOOL", "CHAR", "STRING", "VOID", "FORMAT",
            "BITS", "REF", "FLEX", "STRUCT", "UNION", "PROC", "LONG", "SHORT",
        ]) {
            return true;
        }
        matches!(self.current().kind, TokenKind::LBracket)
    }

    fn parse_statement(&mut self) -> Result<NodeId, ParseError> {
        if self.at_declaration_start() {
            self.parse_declaration()
        } else {
            self.parse_labeled_unit()
        }
    }

    fn parse_declaration(&mut self) -> Result<NodeId, ParseError> {
        if self.at_bold("MODE") {
            return self.parse_mode_declaration();
        }
        if self.at_bold("OP") {
            return self.parse_operator_declaration();
        }
        if self.at_bold("PRIO") {
            return self.parse_priority_declaration();
        }
        if self.at_bold("PROC") {
            return self.parse_proc_identity_declaration();
        }
        let declarer = self.parse_declarer()?;
        let first = self.parse_one_declarand(declarer)?;
        let mut decls = vec![first];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.bump();
            decls.push(self.parse_one_declarand(declarer)?);
        }
        if decls.len() == 1 {
            Ok(decls[0])
        } else {
            let span = self.span_of(decls[0]).merge(self.span_of(*decls.last().unwrap()));
            Ok(self.push(Node::new(Attribute::DeclarationList, span), &decls))
        }
    }

    fn parse_one_declarand(&mut self, declarer: NodeId) -> Result<NodeId, ParseError> {
        let start = self.current().span;
        let (name, name_span) = self.expect_identifier()?;
        let ident = self.push_text(Attribute::Identifier, name_span, name, &[]);
        if self.at_operator("=") {
            self.bump();
            let rhs = self.parse_unit()?;
            let span = start.merge(self.span_of(rhs));
            Ok(self.push(Node::new(Attribute::IdentityDeclaration, span), &[declarer, ident, rhs]))
        } else if self.at_operator(":=") {
            self.bump();
            let rhs = self.parse_unit()?;
            let span = start.merge(self.span_of(rhs));
            Ok(self.push(Node::new(Attribute::VariableDeclaration, span), &[declarer, ident, rhs]))
        } else {
            let span = start.merge(name_span);
            Ok(self.push(Node::new(Attribute::VariableDeclaration, span), &[declarer, ident]))
        }
    }

    fn parse_mode_declaration(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect_bold("MODE")?.span;
        let (name, _) = self.expect_identifier()?;
        self.expect_operator("=")?;
        let declarer = self.parse_declarer()?;
        let span = start.merge(self.span_of(declarer));
        Ok(self.push_text(Attribute::ModeDeclaration, span, name, &[declarer]))
    }

    fn parse_operator_declaration(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect_bold("OP")?.span;
        let op_text = self.expect_operator_symbol()?;
        self.expect_operator("=")?;
        let (params, ret) = self.parse_proc_header()?;
        self.expect_kind(&TokenKind::Colon, "':'")?;
        let body = self.parse_unit()?;
        let span = start.merge(self.span_of(body));
        Ok(self.push_text(Attribute::OperatorDeclaration, span, op_text, &[params, ret, body]))
    }

    fn parse_priority_declaration(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect_bold("PRIO")?.span;
        let op_text = self.expect_operator_symbol()?;
        self.expect_operator("=")?;
        let (level, level_span) = match &self.current().kind {
            TokenKind::IntDenoter(n) => (*n, self.current().span),
            _ => return Err(self.unexpected("a priority level".to_string())),
        };
        self.bump();
        self.priorities.insert(op_text.clone(), level.clamp(1, 9) as u8);
        let span = start.merge(level_span);
        let mut node = Node::new(Attribute::PriorityDeclaration, span);
        node.text = Some(op_text);
        node.literal = Some(Literal::Int(level));
        Ok(self.builder.push(node))
    }

    fn expect_operator_symbol(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Operator(op) => {
                let op = op.clone();
                self.bump();
                Ok(op)
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.unexpected("an operator symbol".to_string())),
        }
    }

    fn parse_proc_identity_declaration(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect_bold("PROC")?.span;
        let (name, name_span) = self.expect_identifier()?;
        self.expect_operator("=")?;
        let (params, ret) = self.parse_proc_header()?;
        self.expect_kind(&TokenKind::Colon, "':'")?;
        let body = self.parse_unit()?;
        let span = start.merge(self.span_of(body));
        let declarer = self.push_text(Attribute::Declarer, name_span, "PROC".to_string(), &[params, ret]);
        let routine = self.push(Node::new(Attribute::RoutineText, span), &[params, ret, body]);
        let ident = self.push_text(Attribute::Identifier, name_span, name, &[]);
        Ok(self.push(Node::new(Attribute::IdentityDeclaration, span), &[declarer, ident, routine]))
    }

    /// Parses `( declarer ident?, ... ) return-declarer`, shared between `PROC` value
    /// declarers and the `PROC name = (...) mode : body` identity shortcut.
    fn parse_proc_header(&mut self) -> Result<(NodeId, NodeId), ParseError> {
        let open = self.expect_kind(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !matches!(self.current().kind, TokenKind::RParen) {
            loop {
                let declarer = self.parse_declarer()?;
                let param = if let TokenKind::Identifier(name) = &self.current().kind {
                    let name = name.clone();
                    let tok = self.bump();
                    let ident = self.push_text(Attribute::Identifier, tok.span, name, &[]);
                    let span = self.span_of(declarer).merge(tok.span);
                    self.push(Node::new(Attribute::Parameter, span), &[declarer, ident])
                } else {
                    let span = self.span_of(declarer);
                    self.push(Node::new(Attribute::Parameter, span), &[declarer])
                };
                params.push(param);
                if matches!(self.current().kind, TokenKind::Comma) {
                    self.bump();
                    continue;
                }
                break;
            }
        }
        let close = self.expect_kind(&TokenKind::RParen, "')'")?;
        let pack_span = open.span.merge(close.span);
        let pack = self.push(Node::new(Attribute::ParameterPack, pack_span), &params);
        let ret = self.parse_declarer()?;
        Ok((pack, ret))
    }

    fn parse_declarer(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current().span;
        if self.at_bold_any(&["LONG", "SHORT"]) {
            let mut prefix = String::new();
            while self.at_bold_any(&["LONG", "SHORT"]) {
                if let TokenKind::BoldWord(w) = &self.current().kind {
                    if !prefix.is_empty() {
                        prefix.push(' ');
                    }
                    prefix.push_str(w);
                }
                self.bump();
            }
            let inner = self.parse_declarer()?;
            let inner_text = self.builder_node(inner).text.clone().unwrap_or_default();
            let span = start.merge(self.span_of(inner));
            return Ok(self.push_text(Attribute::Declarer, span, format!("{prefix} {inner_text}"), &[]));
        }
        if self.at_bold("REF") {
            self.bump();
            let inner = self.parse_declarer()?;
            let span = start.merge(self.span_of(inner));
            return Ok(self.push_text(Attribute::Declarer, span, "REF".to_string(), &[inner]));
        }
        if self.at_bold("FLEX") {
            self.bump();
            return self.parse_row_declarer(start, true);
        }
        if matches!(self.current().kind, TokenKind::LBracket) {
            return self.parse_row_declarer(start, false);
        }
        if self.at_bold("STRUCT") {
            self.bump();
            self.expect_kind(&TokenKind::LParen, "'('")?;
            let mut fields = Vec::new();
            loop {
                let declarer = self.parse_declarer()?;
                let (name, name_span) = self.expect_identifier()?;
                let ident = self.push_text(Attribute::Identifier, name_span, name, &[]);
                fields.push(declarer);
                fields.push(ident);
                if matches!(self.current().kind, TokenKind::Comma) {
                    self.bump();
                    continue;
                }
                break;
            }
            let close = self.expect_kind(&TokenKind::RParen, "')'")?;
            let span = start.merge(close.span);
            return Ok(self.push_text(Attribute::Declarer, span, "STRUCT".to_string(), &fields));
        }
        if self.at_bold("UNION") {
            self.bump();
            self.expect_kind(&TokenKind::LParen, "'('")?;
            let mut variants = Vec::new();
            loop {
                variants.push(self.parse_declarer()?);
                if matches!(self.current().kind, TokenKind::Comma) {
                    self.bump();
                    continue;
                }
                break;
            }
            let close = self.expect_kind(&TokenKind::RParen, "')'")?;
            let span = start.merge(close.span);
            return Ok(self.push_text(Attribute::Declarer, span, "UNION".to_string(), &variants));
        }
        if self.at_bold("PROC") {
            self.bump();
            if matches!(self.current().kind, TokenKind::LParen) {
                let (params, ret) = self.parse_proc_header()?;
                let span = start.merge(self.span_of(ret));
                return Ok(self.push_text(Attribute::Declarer, span, "PROC".to_string(), &[params, ret]));
            }
            let ret = self.parse_declarer()?;
            let span = start.merge(self.span_of(ret));
            let empty_pack = self.push(Node::new(Attribute::ParameterPack, start), &[]);
            return Ok(self.push_text(Attribute::Declarer, span, "PROC".to_string(), &[empty_pack, ret]));
        }
        if let TokenKind::BoldWord(word) = &self.current().kind {
            if matches!(word.as_str(), "INT" | "REAL" | "BOOL" | "CHAR" | "STRING" | "VOID" | "FORMAT" | "BITS") {
                let word = word.clone();
                let tok = self.bump();
                return Ok(self.push_text(Attribute::Declarer, tok.span, word, &[]));
            }
        }
        if let TokenKind::Identifier(name) = &self.current().kind {
            let name = name.clone();
            let tok = self.bump();
            return Ok(self.push_text(Attribute::Declarer, tok.span, name, &[]));
        }
        Err(self.unexpected("a mode declarer".to_string()))
    }

    fn parse_row_declarer(&mut self, start: Span, flex: bool) -> Result<NodeId, ParseError> {
        self.expect_kind(&TokenKind::LBracket, "'['")?;
        let mut bounds = Vec::new();
        loop {
            bounds.push(self.parse_bound()?);
            if matches!(self.current().kind, TokenKind::Comma) {
                self.bump();
                continue;
            }
            break;
        }
        self.expect_kind(&TokenKind::RBracket, "']'")?;
        let elem = self.parse_declarer()?;
        let mut children = bounds;
        children.push(elem);
        let span = start.merge(self.span_of(elem));
        let tag = if flex { "FLEXROW" } else { "ROW" };
        Ok(self.push_text(Attribute::Declarer, span, tag.to_string(), &children))
    }

    fn parse_bound(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current().span;
        // A bound is `lower : upper`, `: upper` (lower defaults to 1), or bare
        // `upper`/absent (a `FLEX`-only dimension with bound fixed at run time).
        if matches!(self.current().kind, TokenKind::Colon) {
            self.bump();
            let upper = self.parse_formula(0)?;
            let span = start.merge(self.span_of(upper));
            return Ok(self.push(Node::new(Attribute::Bound, span), &[upper]));
        }
        let first = self.parse_formula(0)?;
        if matches!(self.current().kind, TokenKind::Colon) {
            self.bump();
            let upper = self.parse_formula(0)?;
            let span = start.merge(self.span_of(upper));
            return Ok(self.push(Node::new(Attribute::Bound, span), &[first, upper]));
        }
        let span = self.span_of(first);
        Ok(self.push(Node::new(Attribute::Bound, span), &[first]))
    }

    // --- clauses -------------------------------------------------------------

    fn parse_serial_clause_until(&mut self, stop_words: &[&str]) -> Result<NodeId, ParseError> {
        let start = self.current().span;
        let mut children = Vec::new();
        loop {
            if self.at_bold_any(stop_words) || matches!(self.current().kind, TokenKind::Eof) {
                break;
            }
            children.push(self.parse_statement()?);
            if matches!(self.current().kind, TokenKind::Semicolon) {
                self.bump();
                continue;
            }
            break;
        }
        let span = children.last().map_or(start, |last| start.merge(self.span_of(*last)));
        Ok(self.push(Node::new(Attribute::SerialClause, span), &children))
    }

    fn parse_labeled_unit(&mut self) -> Result<NodeId, ParseError> {
        if let TokenKind::Identifier(name) = &self.current().kind {
            if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::Colon) {
                let name = name.clone();
                let start = self.bump().span;
                self.bump(); // colon
                let inner = self.parse_unit()?;
                let span = start.merge(self.span_of(inner));
                return Ok(self.push_text(Attribute::LabeledUnit, span, name, &[inner]));
            }
        }
        self.parse_unit()
    }

    fn parse_unit(&mut self) -> Result<NodeId, ParseError> {
        self.parse_assignation()
    }

    fn parse_assignation(&mut self) -> Result<NodeId, ParseError> {
        let lhs = self.parse_formula(0)?;
        if self.at_operator(":=") {
            self.bump();
            let rhs = self.parse_assignation()?;
            let span = self.span_of(lhs).merge(self.span_of(rhs));
            return Ok(self.push(Node::new(Attribute::Assignation, span), &[lhs, rhs]));
        }
        Ok(lhs)
    }

    /// Recognises the current token as a dyadic operator, if it is one.
    ///
    /// Symbolic operators (`+`, `*=`, ...) are always operators. A plain identifier is
    /// only an operator once a `PRIO` declaration has named it as one: Algol 68 lets a
    /// word-shaped operator (`OP MAX = ...`) be used in formula position, but that is
    /// inherently contextual rather than lexical, so the parser tracks declared
    /// priorities itself instead of pushing this back onto the lexer.
    fn current_priority(&self) -> Option<(String, u8)> {
        match &self.current().kind {
            TokenKind::Operator(op) if op != ":=" => builtin_priority(op)
                .or_else(|| self.priorities.get(op).copied())
                .map(|p| (op.clone(), p)),
            TokenKind::Identifier(name) => self.priorities.get(name).copied().map(|p| (name.clone(), p)),
            _ => None,
        }
    }

    fn parse_formula(&mut self, min_prec: u8) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_monadic()?;
        while let Some((op, prec)) = self.current_priority() {
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.parse_formula(prec + 1)?;
            let span = self.span_of(lhs).merge(self.span_of(rhs));
            lhs = self.push_text(Attribute::Formula, span, op, &[lhs, rhs]);
        }
        Ok(lhs)
    }

    fn parse_monadic(&mut self) -> Result<NodeId, ParseError> {
        if let TokenKind::Operator(op) = &self.current().kind {
            if MONADIC_OPS.contains(&op.as_str()) {
                let op = op.clone();
                let start = self.bump().span;
                let operand = self.parse_monadic()?;
                let span = start.merge(self.span_of(operand));
                return Ok(self.push_text(Attribute::MonadicFormula, span, op, &[operand]));
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<NodeId, ParseError> {
        let mut base = self.parse_primary()?;
        loop {
            match &self.current().kind {
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_unit()?;
                    let close = self.expect_kind(&TokenKind::RBracket, "']'")?;
                    let span = self.span_of(base).merge(close.span);
                    base = self.push(Node::new(Attribute::Slice, span), &[base, index]);
                }
                TokenKind::LParen => {
                    let args = self.parse_argument_list()?;
                    let span = self.span_of(base).merge(self.span_of(args));
                    base = self.push(Node::new(Attribute::Call, span), &[base, args]);
                }
                TokenKind::BoldWord(w) if w == "OF" => {
                    self.bump();
                    let (name, name_span) = self.expect_identifier()?;
                    let span = self.span_of(base).merge(name_span);
                    base = self.push_text(Attribute::Selection, span, name, &[base]);
                }
                _ => break,
            }
        }
        Ok(base)
    }

    fn parse_argument_list(&mut self) -> Result<NodeId, ParseError> {
        let open = self.expect_kind(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !matches!(self.current().kind, TokenKind::RParen) {
            loop {
                args.push(self.parse_unit()?);
                if matches!(self.current().kind, TokenKind::Comma) {
                    self.bump();
                    continue;
                }
                break;
            }
        }
        let close = self.expect_kind(&TokenKind::RParen, "')'")?;
        let span = open.span.merge(close.span);
        Ok(self.push(Node::new(Attribute::ArgumentList, span), &args))
    }

    fn parse_paren_group(&mut self) -> Result<NodeId, ParseError> {
        let open = self.expect_kind(&TokenKind::LParen, "'('")?;
        if matches!(self.current().kind, TokenKind::RParen) {
            let close = self.bump();
            let span = open.span.merge(close.span);
            return Ok(self.push(Node::new(Attribute::CollateralClause, span), &[]));
        }
        let first = self.parse_statement()?;
        if matches!(self.current().kind, TokenKind::Comma) {
            let mut items = vec![first];
            while matches!(self.current().kind, TokenKind::Comma) {
                self.bump();
                items.push(self.parse_unit()?);
            }
            let close = self.expect_kind(&TokenKind::RParen, "')'")?;
            let span = open.span.merge(close.span);
            return Ok(self.push(Node::new(Attribute::CollateralClause, span), &items));
        }
        if matches!(self.current().kind, TokenKind::Semicolon) {
            let mut items = vec![first];
            while matches!(self.current().kind, TokenKind::Semicolon) {
                self.bump();
                if self.at_bold("FI") || matches!(self.current().kind, TokenKind::RParen) {
                    break;
                }
                items.push(self.parse_statement()?);
            }
            let close = self.expect_kind(&TokenKind::RParen, "')'")?;
            let serial_span = self.span_of(items[0]).merge(self.span_of(*items.last().unwrap()));
            let serial = self.push(Node::new(Attribute::SerialClause, serial_span), &items);
            let span = open.span.merge(close.span);
            return Ok(self.push(Node::new(Attribute::ClosedClause, span), &[serial]));
        }
        let close = self.expect_kind(&TokenKind::RParen, "')'")?;
        let _ = open.span.merge(close.span);
        Ok(first)
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let tok = self.current().clone();
        match &tok.kind {
            TokenKind::IntDenoter(n) => {
                self.bump();
                let mut node = Node::new(Attribute::Denoter, tok.span);
                node.literal = Some(Literal::Int(*n));
                Ok(self.builder.push(node))
            }
            TokenKind::RealDenoter(n) => {
                self.bump();
                let mut node = Node::new(Attribute::Denoter, tok.span);
                node.literal = Some(Literal::Real(*n));
                Ok(self.builder.push(node))
            }
            TokenKind::BoolDenoter(b) => {
                self.bump();
                let mut node = Node::new(Attribute::Denoter, tok.span);
                node.literal = Some(Literal::Bool(*b));
                Ok(self.builder.push(node))
            }
            TokenKind::CharDenoter(c) => {
                self.bump();
                let mut node = Node::new(Attribute::Denoter, tok.span);
                node.literal = Some(Literal::Char(*c));
                Ok(self.builder.push(node))
            }
            TokenKind::StringDenoter(s) => {
                self.bump();
                let mut node = Node::new(Attribute::Denoter, tok.span);
                node.literal = Some(Literal::Str(s.clone()));
                Ok(self.builder.push(node))
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.bump();
                Ok(self.push_text(Attribute::Identifier, tok.span, name, &[]))
            }
            TokenKind::LParen => self.parse_paren_group(),
            TokenKind::Dollar => self.parse_format_text(),
            TokenKind::BoldWord(word) => match word.as_str() {
                "NIL" => {
                    self.bump();
                    Ok(self.builder.push(Node::new(Attribute::Nihil, tok.span)))
                }
                "SKIP" | "EMPTY" => {
                    self.bump();
                    Ok(self.builder.push(Node::new(Attribute::Skip, tok.span)))
                }
                "BEGIN" => {
                    self.bump();
                    let serial = self.parse_serial_clause_until(&["END"])?;
                    let close = self.expect_bold("END")?;
                    let span = tok.span.merge(close.span);
                    Ok(self.push(Node::new(Attribute::ClosedClause, span), &[serial]))
                }
                "IF" => self.parse_conditional(),
                "CASE" => self.parse_case(),
                "FOR" | "FROM" | "BY" | "TO" | "WHILE" | "DO" => self.parse_loop(),
                "GOTO" => {
                    self.bump();
                    let (name, name_span) = self.expect_identifier()?;
                    let span = tok.span.merge(name_span);
                    Ok(self.push_text(Attribute::Jump, span, name, &[]))
                }
                "GO" => {
                    self.bump();
                    self.expect_bold("TO")?;
                    let (name, name_span) = self.expect_identifier()?;
                    let span = tok.span.merge(name_span);
                    Ok(self.push_text(Attribute::Jump, span, name, &[]))
                }
                "PAR" => {
                    self.bump();
                    let inner = self.parse_primary()?;
                    let span = tok.span.merge(self.span_of(inner));
                    Ok(self.push(Node::new(Attribute::ParallelClause, span), &[inner]))
                }
                "ASSERT" => {
                    self.bump();
                    let inner = self.parse_primary()?;
                    let span = tok.span.merge(self.span_of(inner));
                    Ok(self.push(Node::new(Attribute::Assertion, span), &[inner]))
                }
                "HEAP" | "LOC" => {
                    let scope = word.clone();
                    self.bump();
                    let declarer = self.parse_declarer()?;
                    let span = tok.span.merge(self.span_of(declarer));
                    Ok(self.push_text(Attribute::Generator, span, scope, &[declarer]))
                }
                "LONG" | "SHORT" | "INT" | "REAL" | "BOOL" | "CHAR" | "STRING" | "VOID"
                | "FORMAT" | "BITS" | "REF" | "FLEX" | "STRUCT" | "UNION" | "PROC" => {
                    let declarer = self.parse_declarer()?;
                    let args = if matches!(self.current().kind, TokenKind::LParen) {
                        Some(self.parse_argument_list()?)
                    } else {
                        None
                    };
                    let span = self.span_of(declarer);
                    Ok(match args {
                        Some(args) => {
                            let span = span.merge(self.span_of(args));
                            self.push(Node::new(Attribute::Cast, span), &[declarer, args])
                        }
                        None => declarer,
                    })
                }
                other => Err(self.unexpected(format!("a unit (unexpected keyword '{other}')"))),
            },
            TokenKind::Eof => Err(self.unexpected("a unit".to_string())),
            other => Err(self.unexpected(format!("a unit (unexpected token {other})"))),
        }
    }

    fn parse_format_text(&mut self) -> Result<NodeId, ParseError> {
        let open = self.expect_kind(&TokenKind::Dollar, "'$'")?;
        let content_start = open.span.end;
        loop {
            match &self.current().kind {
                TokenKind::Dollar => break,
                TokenKind::Eof => return Err(self.unexpected("closing '$'".to_string())),
                _ => {
                    self.bump();
                }
            }
        }
        let close = self.bump();
        let content_end = close.span.start;
        let raw = &self.source_text[content_start as usize..content_end as usize];
        let span = open.span.merge(close.span);
        Ok(self.push_text(Attribute::FormatText, span, raw.to_string(), &[]))
    }

    fn parse_conditional(&mut self) -> Result<NodeId, ParseError> {
        self.expect_bold("IF")?;
        self.parse_conditional_tail()
    }

    fn parse_conditional_tail(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current().span;
        let enquiry_unit = self.parse_unit()?;
        let enquiry = self.wrap_part(Attribute::EnquiryClause, self.span_of(enquiry_unit), enquiry_unit);
        self.expect_bold("THEN")?;
        let then_serial = self.parse_serial_clause_until(&["ELSE", "ELIF", "FI"])?;
        let then_part = self.wrap_part(Attribute::ThenPart, self.span_of(then_serial), then_serial);
        let mut children = vec![enquiry, then_part];
        let end_span;
        if self.at_bold("ELIF") {
            self.bump();
            let nested = self.parse_conditional_tail()?;
            end_span = self.span_of(nested);
            children.push(self.wrap_part(Attribute::ElsePart, end_span, nested));
        } else if self.at_bold("ELSE") {
            self.bump();
            let else_serial = self.parse_serial_clause_until(&["FI"])?;
            let else_part = self.wrap_part(Attribute::ElsePart, self.span_of(else_serial), else_serial);
            children.push(else_part);
            end_span = self.expect_bold("FI")?.span;
        } else {
            end_span = self.expect_bold("FI")?.span;
        }
        let span = start.merge(end_span);
        Ok(self.push(Node::new(Attribute::ConditionalClause, span), &children))
    }

    fn parse_case(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect_bold("CASE")?.span;
        let enquiry_unit = self.parse_unit()?;
        self.expect_bold("IN")?;
        if matches!(self.current().kind, TokenKind::LParen) {
            self.parse_united_case_tail(start, enquiry_unit)
        } else {
            self.parse_integer_case_tail(start, enquiry_unit)
        }
    }

    fn parse_integer_case_tail(&mut self, start: Span, enquiry_unit: NodeId) -> Result<NodeId, ParseError> {
        let enquiry = self.wrap_part(Attribute::EnquiryClause, self.span_of(enquiry_unit), enquiry_unit);
        let mut alts = vec![self.parse_unit()?];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.bump();
            alts.push(self.parse_unit()?);
        }
        let in_span = self.span_of(alts[0]).merge(self.span_of(*alts.last().unwrap()));
        let in_part = self.push(Node::new(Attribute::InPart, in_span), &alts);
        let mut children = vec![enquiry, in_part];
        let end_span;
        if self.at_bold("OUSE") {
            self.bump();
            let nested_enquiry = self.parse_unit()?;
            self.expect_bold("IN")?;
            let nested = self.parse_integer_case_tail(start, nested_enquiry)?;
            end_span = self.span_of(nested);
            children.push(self.wrap_part(Attribute::OusePart, end_span, nested));
        } else if self.at_bold("OUT") {
            self.bump();
            let out_serial = self.parse_serial_clause_until(&["ESAC"])?;
            children.push(self.wrap_part(Attribute::OutPart, self.span_of(out_serial), out_serial));
            end_span = self.expect_bold("ESAC")?.span;
        } else {
            end_span = self.expect_bold("ESAC")?.span;
        }
        let span = start.merge(end_span);
        Ok(self.push(Node::new(Attribute::IntegerCaseClause, span), &children))
    }

    fn parse_united_case_tail(&mut self, start: Span, enquiry_unit: NodeId) -> Result<NodeId, ParseError> {
        let enquiry = self.wrap_part(Attribute::EnquiryClause, self.span_of(enquiry_unit), enquiry_unit);
        let mut specs = vec![self.parse_specified_unit()?];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.bump();
            specs.push(self.parse_specified_unit()?);
        }
        let spec_span = self.span_of(specs[0]).merge(self.span_of(*specs.last().unwrap()));
        let spec_list = self.push(Node::new(Attribute::SpecifierList, spec_span), &specs);
        let mut children = vec![enquiry, spec_list];
        let end_span;
        if self.at_bold("OUT") {
            self.bump();
            let out_serial = self.parse_serial_clause_until(&["ESAC"])?;
            children.push(self.wrap_part(Attribute::OutPart, self.span_of(out_serial), out_serial));
            end_span = self.expect_bold("ESAC")?.span;
        } else {
            end_span = self.expect_bold("ESAC")?.span;
        }
        let span = start.merge(end_span);
        Ok(self.push(Node::new(Attribute::UnitedCaseClause, span), &children))
    }

    fn parse_specified_unit(&mut self) -> Result<NodeId, ParseError> {
        let open = self.expect_kind(&TokenKind::LParen, "'('")?;
        let declarer = self.parse_declarer()?;
        let ident = if let TokenKind::Identifier(name) = &self.current().kind {
            let name = name.clone();
            let tok = self.bump();
            Some(self.push_text(Attribute::Identifier, tok.span, name, &[]))
        } else {
            None
        };
        self.expect_kind(&TokenKind::RParen, "')'")?;
        self.expect_kind(&TokenKind::Colon, "':'")?;
        let body = self.parse_unit()?;
        let span = open.span.merge(self.span_of(body));
        let mut children = vec![declarer];
        if let Some(ident) = ident {
            children.push(ident);
        }
        children.push(body);
        Ok(self.push(Node::new(Attribute::SpecifiedUnit, span), &children))
    }

    fn parse_loop(&mut self) -> Result<NodeId, ParseError> {
        let start = self.current().span;
        let mut children = Vec::new();
        if self.at_bold("FOR") {
            self.bump();
            let (name, name_span) = self.expect_identifier()?;
            let ident = self.push_text(Attribute::Identifier, name_span, name, &[]);
            children.push(self.wrap_part(Attribute::ForPart, name_span, ident));
        }
        if self.at_bold("FROM") {
            self.bump();
            let unit = self.parse_unit()?;
            children.push(self.wrap_part(Attribute::FromPart, self.span_of(unit), unit));
        }
        if self.at_bold("BY") {
            self.bump();
            let unit = self.parse_unit()?;
            children.push(self.wrap_part(Attribute::ByPart, self.span_of(unit), unit));
        }
        if self.at_bold("TO") {
            self.bump();
            let unit = self.parse_unit()?;
            children.push(self.wrap_part(Attribute::ToPart, self.span_of(unit), unit));
        }
        if self.at_bold("WHILE") {
            self.bump();
            let unit = self.parse_unit()?;
            children.push(self.wrap_part(Attribute::WhilePart, self.span_of(unit), unit));
        }
        self.expect_bold("DO")?;
        let body = self.parse_serial_clause_until(&["OD"])?;
        children.push(self.wrap_part(Attribute::DoPart, self.span_of(body), body));
        let end = self.expect_bold("OD")?;
        let span = start.merge(end.span);
        Ok(self.push(Node::new(Attribute::LoopClause, span), &children))
    }
}

#[cfg(test)]
mod parser_test;
