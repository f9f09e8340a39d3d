//! Code generation module for the compiler.
//!
//! This module lowers a parsed program into target code. It handles:
//!
//! - The prototype table and forward references
//! - Shared lowering rules for expressions and statements
//! - String literal interning
//! - Two backends behind one `Emitter` contract: LLVM IR and x86-64 assembly

pub mod compiler;
pub mod context;
pub mod emitter;
pub mod expr;
pub mod llvm;
pub mod native;
pub mod prototypes;
pub mod stmt;
pub mod strings;

#[cfg(test)]
mod tests;
