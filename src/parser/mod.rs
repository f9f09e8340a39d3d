//! Parser module for building an Abstract Syntax Tree (AST).
//!
//! This module contains the parser that transforms the lexer's token stream
//! into a `ProgramAST`. It handles:
//!
//! - Extern and function declarations
//! - Statement parsing (return, variable declarations, blocks, expressions)
//! - Expression parsing by precedence climbing (calls, literals, `%N`)
//! - Type parsing with pointer suffixes
//!
//! Parsing is fail-fast: the first syntax error is returned and no partial
//! tree is produced.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;
pub mod types;
