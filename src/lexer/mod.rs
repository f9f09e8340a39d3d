//! Lexical analysis module for the compiler.
//!
//! This module contains the lexer (tokenizer) that converts source code
//! into tokens for parsing. It handles:
//!
//! - On-demand tokenization driven by a table of anchored regex patterns
//! - Recognition of keywords, identifiers, literals, and operators
//! - Token position tracking for error reporting
//! - Comments and whitespace handling
//! - Escape resolution for string literal bodies

pub mod lexer;
pub mod tokens;
