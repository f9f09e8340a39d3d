//! Abstract Syntax Tree (AST) definitions.
//!
//! This module contains the data structures that represent the parsed
//! program:
//!
//! - Externs, functions and the program root
//! - Expression and statement nodes as closed sum types
//! - The type vocabulary used in signatures and declarations

pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
