//! Parser implementation for building the Abstract Syntax Tree.
//!
//! This module contains the main Parser struct and the `parse` entry point.
//! The parser pulls tokens from the lexer one at a time and never looks
//! further ahead than the current token. Expressions are parsed by
//! precedence climbing over the binding powers registered in `lookups`;
//! declarations and statements by recursive descent.

use std::{collections::HashMap, mem, rc::Rc};

use crate::{
    ast::ast::ProgramAST,
    errors::errors::{Error, ErrorImpl},
    lexer::{
        lexer::Lexer,
        tokens::{Token, TokenKind},
    },
    Position,
};

use super::{
    lookups::{create_token_lookups, BPLookup, BindingPower},
    stmt::{parse_extern_decl, parse_fn_decl},
};

/// The main parser structure that maintains parsing state.
///
/// Holds the lexer, the single current token and the operator precedence
/// table. Nothing else survives between calls.
pub struct Parser {
    /// Source of tokens, consumed on demand
    lexer: Lexer,
    /// The token under the cursor
    current: Token,
    /// Lookup table for binary operator precedence
    binding_power_lookup: BPLookup,
}

impl Parser {
    /// Creates a parser positioned on the first token of `source`.
    pub fn new(source: String, file: Rc<String>) -> Self {
        let mut lexer = Lexer::new(source, Some(file.to_string()));
        let current = lexer.next_token();

        Parser {
            lexer,
            current,
            binding_power_lookup: HashMap::new(),
        }
    }

    /// Returns the current token without advancing.
    pub fn current_token(&self) -> &Token {
        &self.current
    }

    /// Returns the kind of the current token.
    pub fn current_token_kind(&self) -> TokenKind {
        self.current.kind
    }

    /// Advances to the next token and returns the previous token.
    pub fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        mem::replace(&mut self.current, next)
    }

    /// Expects a token of the specified kind, failing with `message`.
    ///
    /// # Returns
    ///
    /// Returns Ok(Token) if the current token matches, otherwise a SyntaxError.
    pub fn expect_error(&mut self, expected_kind: TokenKind, message: &str) -> Result<Token, Error> {
        if self.current_token_kind() != expected_kind {
            return Err(self.syntax_error(message));
        }

        Ok(self.advance())
    }

    /// Expects a token of the specified kind with a generic message.
    pub fn expect(&mut self, expected_kind: TokenKind) -> Result<Token, Error> {
        let message = format!("Expected {}", expected_kind);
        self.expect_error(expected_kind, &message)
    }

    /// Builds a SyntaxError pointing at the current token.
    pub fn syntax_error(&self, message: &str) -> Error {
        Error::new(
            ErrorImpl::SyntaxError {
                message: message.to_string(),
                token: self.current.value.clone(),
            },
            self.current.span.start.clone(),
        )
    }

    /// Checks if there are more tokens to parse.
    pub fn has_tokens(&self) -> bool {
        self.current_token_kind() != TokenKind::EOF
    }

    /// Precedence of the current token, or -1 when it is not a binary operator.
    pub fn get_precedence(&self) -> i32 {
        self.binding_power_lookup
            .get(&self.current_token_kind())
            .map(|bp| bp.precedence())
            .unwrap_or(-1)
    }

    /// Registers a binary operator token.
    pub fn binary(&mut self, kind: TokenKind, binding_power: BindingPower) {
        self.binding_power_lookup.insert(kind, binding_power);
    }

    /// Returns the current position in the source file.
    pub fn get_position(&self) -> Position {
        self.current.span.start.clone()
    }
}

/// Parses a whole translation unit.
///
/// Top-level declarations alternate freely: `extrn` starts an extern, anything
/// else a function definition. The first syntax error aborts the parse and no
/// partial program is returned.
pub fn parse(source: String, file: Rc<String>) -> Result<ProgramAST, Error> {
    let mut parser = Parser::new(source, file);
    create_token_lookups(&mut parser);

    let mut program = ProgramAST::default();

    while parser.has_tokens() {
        if parser.current_token_kind() == TokenKind::Extrn {
            program.externs.push(parse_extern_decl(&mut parser)?);
        } else {
            program.functions.push(parse_fn_decl(&mut parser)?);
        }
    }

    Ok(program)
}
