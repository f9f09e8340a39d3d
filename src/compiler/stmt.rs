use crate::{
    ast::{
        expressions::Expr,
        statements::{BlockStmt, Stmt, StmtKind},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    compiler::Compiler,
    context::{FunctionContext, Local},
    emitter::Emitter,
    expr::{coerce, gen_expression, gen_value, type_mismatch},
};

/// Lowers a block.
///
/// Statements following a `return` are unreachable but still checked: they
/// are lowered into a fresh block that no branch targets.
pub fn gen_block<E: Emitter>(
    compiler: &mut Compiler<E>,
    context: &mut FunctionContext<E>,
    block: &BlockStmt,
) -> Result<(), Error> {
    for statement in &block.body {
        if context.terminated {
            compiler.emitter.begin_unreachable()?;
            context.terminated = false;
        }

        gen_statement(compiler, context, statement)?;
    }

    Ok(())
}

pub fn gen_statement<E: Emitter>(
    compiler: &mut Compiler<E>,
    context: &mut FunctionContext<E>,
    statement: &Stmt,
) -> Result<(), Error> {
    match &statement.kind {
        StmtKind::Return(value) => {
            gen_return(compiler, context, value.as_ref(), &statement.span.start)
        }
        StmtKind::VarDecl {
            name,
            var_type,
            initializer,
        } => gen_var_decl(
            compiler,
            context,
            name,
            var_type,
            initializer.as_ref(),
            &statement.span.start,
        ),
        StmtKind::Expression(expression) => {
            gen_expression(compiler, context, expression)?;
            Ok(())
        }
        StmtKind::Block(block) => gen_block(compiler, context, block),
    }
}

fn gen_return<E: Emitter>(
    compiler: &mut Compiler<E>,
    context: &mut FunctionContext<E>,
    value: Option<&Expr>,
    position: &Position,
) -> Result<(), Error> {
    let return_type = context.return_type().clone();

    match value {
        Some(expression) => {
            if return_type.is_void() {
                return Err(Error::new(
                    ErrorImpl::InvalidReturn {
                        function: context.name.clone(),
                    },
                    position.clone(),
                ));
            }

            let value = gen_value(compiler, context, expression)?;
            let value = coerce(compiler, value, &return_type, &expression.span.start)?;
            compiler.emitter.ret(Some(&value))?;
        }
        None => {
            if !return_type.is_void() {
                return Err(Error::new(
                    ErrorImpl::MissingReturn {
                        function: context.name.clone(),
                    },
                    position.clone(),
                ));
            }

            compiler.emitter.ret(None)?;
        }
    }

    context.terminated = true;
    context.returned = true;
    Ok(())
}

fn gen_var_decl<E: Emitter>(
    compiler: &mut Compiler<E>,
    context: &mut FunctionContext<E>,
    name: &str,
    var_type: &Type,
    initializer: Option<&Expr>,
    position: &Position,
) -> Result<(), Error> {
    if context.locals.contains_key(name) {
        return Err(Error::new(
            ErrorImpl::VariableAlreadyDeclared {
                name: name.to_string(),
            },
            position.clone(),
        ));
    }

    if var_type.is_void() {
        return Err(Error::new(
            ErrorImpl::UnsupportedFeature {
                message: format!("variable `{}` of type void", name),
            },
            position.clone(),
        ));
    }

    // The initializer cannot see the variable it initializes.
    let initial = match initializer {
        Some(expression) => {
            let value = gen_value(compiler, context, expression)?;
            if &value.ty != var_type {
                return Err(type_mismatch(var_type, &value.ty, &expression.span.start));
            }
            Some(value)
        }
        None => None,
    };

    let slot = compiler.emitter.alloc_local(name, var_type)?;
    if let Some(value) = &initial {
        compiler.emitter.store(&slot, value)?;
    }

    context.locals.insert(
        name.to_string(),
        Local {
            slot,
            ty: var_type.clone(),
        },
    );

    Ok(())
}
