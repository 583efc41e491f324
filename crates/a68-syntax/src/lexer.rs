// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Lexer for the Algol 68 Revised Report subset.
//!
//! Recognises bold (reserved) words written in upper case, identifiers, the four
//! primitive denoter shapes, operator symbols, and the punctuation the parser needs.
//! Comments (`CO ... CO`, `# ... #`) and whitespace are skipped between tokens.

use crate::token::{Token, TokenKind};
use a68_core::{SourceId, Span};
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

pub const KEYWORDS: &[&str] = &[
    "BEGIN", "END", "INT", "REAL", "BOOL", "CHAR", "STRING", "VOID", "REF", "FLEX", "LOC", "HEAP",
    "STRUCT", "UNION", "MODE", "OP", "PRIO", "PROC", "IF", "THEN", "ELIF", "ELSE", "FI", "CASE",
    "IN", "OUSE", "OUT", "ESAC", "FOR", "FROM", "BY", "TO", "WHILE", "DO", "OD", "GOTO", "GO",
    "SKIP", "NIL", "OF", "PAR", "FORMAT", "BITS", "LONG", "SHORT", "EMPTY", "ASSERT",
];

/// Bold words that lex directly as operator tokens rather than `BoldWord`s, so the
/// parser's single priority-climbing formula grammar handles them uniformly with the
/// symbolic operators.
pub const OPERATOR_WORDS: &[&str] = &["OR", "AND", "NOT", "MOD", "OVER", "ABS", "ODD"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnterminatedString(Span),
    UnterminatedChar(Span),
    UnterminatedComment(Span),
    InvalidNumber(Span, String),
    UnexpectedChar(Span, char),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnterminatedString(_) => write!(f, "unterminated string denoter"),
            LexError::UnterminatedChar(_) => write!(f, "unterminated character denoter"),
            LexError::UnterminatedComment(_) => write!(f, "unterminated comment"),
            LexError::InvalidNumber(_, text) => write!(f, "invalid number denoter '{text}'"),
            LexError::UnexpectedChar(_, c) => write!(f, "unexpected character '{c}'"),
        }
    }
}

impl std::error::Error for LexError {}

impl LexError {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            LexError::UnterminatedString(s)
            | LexError::UnterminatedChar(s)
            | LexError::UnterminatedComment(s)
            | LexError::InvalidNumber(s, _)
            | LexError::UnexpectedChar(s, _) => *s,
        }
    }
}

pub struct Lexer<'a> {
    source: SourceId,
    chars: Peekable<Chars<'a>>,
    pos: u32,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(text: &'a str, source: SourceId) -> Self {
        Self {
            source,
            chars: text.chars().peekable(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    #[must_use]
    pub fn tokenize(text: &'a str, source: SourceId) -> Result<Vec<Token>, LexError> {
        let mut lexer = Self::new(text, source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += u32::try_from(c.len_utf8()).unwrap_or(1);
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn here(&self) -> (u32, u32, u32) {
        (self.pos, self.line, self.column)
    }

    fn span_from(&self, start: (u32, u32, u32)) -> Span {
        Span::new(self.source, start.0, self.pos, start.1, start.2)
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    let start = self.here();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('#') => break,
                            Some(_) => {}
                            None => return Err(LexError::UnterminatedComment(self.span_from(start))),
                        }
                    }
                }
                Some('C') => {
                    if self.starts_with_word("CO") {
                        let start = self.here();
                        self.bump();
                        self.bump();
                        loop {
                            if self.starts_with_word("CO") {
                                self.bump();
                                self.bump();
                                break;
                            }
                            if self.bump().is_none() {
                                return Err(LexError::UnterminatedComment(self.span_from(start)));
                            }
                        }
                    } else {
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn starts_with_word(&self, word: &str) -> bool {
        let mut iter = self.chars.clone();
        for expected in word.chars() {
            match iter.next() {
                Some(c) if c == expected => {}
                _ => return false,
            }
        }
        !matches!(iter.next(), Some(c) if c.is_alphanumeric())
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let start = self.here();
        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, self.span_from(start)));
        };

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }
        if c.is_alphabetic() || c == '_' {
            return self.lex_word(start);
        }
        match c {
            '"' => self.lex_string(start),
            '\'' => self.lex_char(start),
            '(' => {
                self.bump();
                Ok(Token::new(TokenKind::LParen, self.span_from(start)))
            }
            ')' => {
                self.bump();
                Ok(Token::new(TokenKind::RParen, self.span_from(start)))
            }
            '[' => {
                self.bump();
                Ok(Token::new(TokenKind::LBracket, self.span_from(start)))
            }
            ']' => {
                self.bump();
                Ok(Token::new(TokenKind::RBracket, self.span_from(start)))
            }
            ',' => {
                self.bump();
                Ok(Token::new(TokenKind::Comma, self.span_from(start)))
            }
            ';' => {
                self.bump();
                Ok(Token::new(TokenKind::Semicolon, self.span_from(start)))
            }
            '@' => {
                self.bump();
                Ok(Token::new(TokenKind::At, self.span_from(start)))
            }
            '$' => {
                self.bump();
                Ok(Token::new(TokenKind::Dollar, self.span_from(start)))
            }
            '.' => {
                self.bump();
                Ok(Token::new(TokenKind::Dot, self.span_from(start)))
            }
            ':' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Ok(Token::new(
                        TokenKind::Operator(":=".to_string()),
                        self.span_from(start),
                    ))
                } else {
                    Ok(Token::new(TokenKind::Colon, self.span_from(start)))
                }
            }
            '+' | '-' | '*' | '/' | '=' | '<' | '>' | '~' | '%' | '&' => {
                self.lex_operator(start)
            }
            other => {
                self.bump();
                Err(LexError::UnexpectedChar(self.span_from(start), other))
            }
        }
    }

    fn lex_operator(&mut self, start: (u32, u32, u32)) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if "+-*/=<>~%&".contains(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(Token::new(TokenKind::Operator(text), self.span_from(start)))
    }

    fn lex_number(&mut self, start: (u32, u32, u32)) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let mut is_real = false;
        if self.peek() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.next().is_some_and(|c| c.is_ascii_digit()) {
                is_real = true;
                text.push('.');
                self.bump();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let next_is_sign_digit = match lookahead.next() {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => lookahead.next().is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if next_is_sign_digit {
                is_real = true;
                text.push('e');
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    text.push(self.peek().unwrap());
                    self.bump();
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        let span = self.span_from(start);
        if is_real {
            let value: f64 = text
                .parse()
                .map_err(|_| LexError::InvalidNumber(span, text.clone()))?;
            Ok(Token::new(TokenKind::RealDenoter(value), span))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| LexError::InvalidNumber(span, text.clone()))?;
            Ok(Token::new(TokenKind::IntDenoter(value), span))
        }
    }

    fn lex_word(&mut self, start: (u32, u32, u32)) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let span = self.span_from(start);
        let upper = text.to_ascii_uppercase();
        if upper == "TRUE" {
            return Ok(Token::new(TokenKind::BoolDenoter(true), span));
        }
        if upper == "FALSE" {
            return Ok(Token::new(TokenKind::BoolDenoter(false), span));
        }
        if OPERATOR_WORDS.contains(&upper.as_str()) && text == upper {
            return Ok(Token::new(TokenKind::Operator(upper), span));
        }
        if KEYWORDS.contains(&upper.as_str()) && text == upper {
            return Ok(Token::new(TokenKind::BoldWord(upper), span));
        }
        Ok(Token::new(TokenKind::Identifier(text), span))
    }

    fn lex_string(&mut self, start: (u32, u32, u32)) -> Result<Token, LexError> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => {
                    if self.peek() == Some('"') {
                        text.push('"');
                        self.bump();
                    } else {
                        break;
                    }
                }
                Some(c) => text.push(c),
                None => return Err(LexError::UnterminatedString(self.span_from(start))),
            }
        }
        Ok(Token::new(TokenKind::StringDenoter(text), self.span_from(start)))
    }

    fn lex_char(&mut self, start: (u32, u32, u32)) -> Result<Token, LexError> {
        self.bump();
        let Some(c) = self.bump() else {
            return Err(LexError::UnterminatedChar(self.span_from(start)));
        };
        match self.bump() {
            Some('\'') => Ok(Token::new(TokenKind::CharDenoter(c), self.span_from(start))),
            _ => Err(LexError::UnterminatedChar(self.span_from(start))),
        }
    }
}

#[cfg(test)]
mod lexer_test;
