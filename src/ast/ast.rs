use crate::Span;

use super::{statements::BlockStmt, types::Type};

/// `extrn <type> <name>(<types>);`
#[derive(Debug, Clone)]
pub struct ExternAST {
    pub name: String,
    pub return_type: Type,
    /// Real parameter types only; the `...` marker sets `is_variadic` instead.
    pub parameter_types: Vec<Type>,
    pub is_variadic: bool,
    pub span: Span,
}

/// `<type> <name>(<types>) { <statements> }`
#[derive(Debug, Clone)]
pub struct FunctionAST {
    pub name: String,
    pub return_type: Type,
    pub parameter_types: Vec<Type>,
    pub body: BlockStmt,
    pub span: Span,
}

/// Parse root: externs and functions in source order.
#[derive(Debug, Clone, Default)]
pub struct ProgramAST {
    pub externs: Vec<ExternAST>,
    pub functions: Vec<FunctionAST>,
}
