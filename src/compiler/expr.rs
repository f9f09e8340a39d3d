use crate::{
    ast::{
        expressions::{BinaryOp, Expr, ExprKind},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::lexer::unescape,
    Position,
};

use super::{
    compiler::Compiler,
    context::FunctionContext,
    emitter::{Emitter, Lowered},
};

/// Lowers an expression. A call to a void function produces no value.
pub fn gen_expression<E: Emitter>(
    compiler: &mut Compiler<E>,
    context: &mut FunctionContext<E>,
    expression: &Expr,
) -> Result<Option<Lowered<E::Value>>, Error> {
    let position = &expression.span.start;

    match &expression.kind {
        ExprKind::Number(value) => gen_number(compiler, *value).map(Some),
        ExprKind::Variable(name) => {
            let local = context
                .locals
                .get(name)
                .ok_or_else(|| unknown_identifier(name, position))?;

            let value = compiler.emitter.load(&local.slot, &local.ty, name)?;
            Ok(Some(Lowered::new(value, local.ty.clone())))
        }
        ExprKind::PositionalParam(index) => context
            .param(*index)
            .cloned()
            .map(Some)
            .ok_or_else(|| unknown_identifier(&format!("%{}", index), position)),
        ExprKind::Binary { op, left, right } => {
            gen_binary(compiler, context, *op, left, right).map(Some)
        }
        ExprKind::StringLiteral(raw) => {
            // The label hashes the raw text; the stored bytes are unescaped.
            let label = compiler.strings.intern(raw);
            let value = compiler.emitter.global_string(&label, &unescape(raw))?;

            Ok(Some(Lowered::new(value, Type::Ptr)))
        }
        ExprKind::Call { callee, arguments } => {
            gen_call(compiler, context, callee, arguments, position)
        }
    }
}

/// Lowers an expression that must produce a value.
pub fn gen_value<E: Emitter>(
    compiler: &mut Compiler<E>,
    context: &mut FunctionContext<E>,
    expression: &Expr,
) -> Result<Lowered<E::Value>, Error> {
    gen_expression(compiler, context, expression)?.ok_or_else(|| {
        Error::new(
            ErrorImpl::TypeMismatch {
                expected: String::from("a value"),
                received: Type::Void.to_string(),
            },
            expression.span.start.clone(),
        )
    })
}

/// Integral values become `i32` constants, anything else an `f64` constant.
/// The choice depends on the value, so `2.0` is an integer. Integral values
/// outside the `i32` range wrap.
fn gen_number<E: Emitter>(compiler: &mut Compiler<E>, value: f64) -> Result<Lowered<E::Value>, Error> {
    if value.fract() == 0.0 {
        let constant = compiler.emitter.const_int(value as i64 as i32)?;
        Ok(Lowered::new(constant, Type::I32))
    } else {
        let constant = compiler.emitter.const_float(value)?;
        Ok(Lowered::new(constant, Type::F64))
    }
}

fn gen_binary<E: Emitter>(
    compiler: &mut Compiler<E>,
    context: &mut FunctionContext<E>,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
) -> Result<Lowered<E::Value>, Error> {
    let position = &left.span.start;

    let left = gen_value(compiler, context, left)?;
    let right = gen_value(compiler, context, right)?;

    if left.ty.is_float() || right.ty.is_float() {
        let numeric = |ty: &Type| ty.is_integer() || ty.is_float();
        if let Some(offending) = [&left.ty, &right.ty].into_iter().find(|ty| !numeric(*ty)) {
            return Err(type_mismatch(&Type::F64, offending, position));
        }

        let left = coerce(compiler, left, &Type::F64, position)?;
        let right = coerce(compiler, right, &Type::F64, position)?;
        let value = compiler.emitter.float_binary(op, left.value, right.value)?;

        return Ok(Lowered::new(value, Type::F64));
    }

    if left.ty == Type::I32 && right.ty == Type::I32 {
        let value = compiler.emitter.int_binary(op, left.value, right.value)?;
        return Ok(Lowered::new(value, Type::I32));
    }

    let offending = if left.ty != Type::I32 { &left.ty } else { &right.ty };
    Err(type_mismatch(&Type::I32, offending, position))
}

fn gen_call<E: Emitter>(
    compiler: &mut Compiler<E>,
    context: &mut FunctionContext<E>,
    callee: &str,
    arguments: &[Expr],
    position: &Position,
) -> Result<Option<Lowered<E::Value>>, Error> {
    let prototype = compiler.prototypes.resolve(callee, position)?.clone();

    let expected = prototype.parameter_types.len();
    let arity_matches = if prototype.is_variadic {
        arguments.len() >= expected
    } else {
        arguments.len() == expected
    };

    if !arity_matches {
        return Err(Error::new(
            ErrorImpl::ArgumentCountMismatch {
                function: callee.to_string(),
                expected,
                received: arguments.len(),
            },
            position.clone(),
        ));
    }

    let mut lowered = Vec::with_capacity(arguments.len());
    for (index, argument) in arguments.iter().enumerate() {
        let value = gen_value(compiler, context, argument)?;
        let argument_position = &argument.span.start;

        let value = match prototype.parameter_types.get(index) {
            Some(ty) => coerce(compiler, value, ty, argument_position)?,
            // Variadic tail: f32 is promoted like in C
            None if value.ty == Type::F32 => coerce(compiler, value, &Type::F64, argument_position)?,
            None => value,
        };

        lowered.push(value);
    }

    let result = compiler.emitter.call(callee, &prototype, &lowered)?;

    Ok(match result {
        Some(value) if !prototype.return_type.is_void() => {
            Some(Lowered::new(value, prototype.return_type.clone()))
        }
        _ => None,
    })
}

/// Converts `value` to `target` when the conversion only widens:
/// `i32` to `i64`, any integer to floating, `f32` to `f64`. A pointer also
/// converts to or from the untyped `ptr` and `void*`.
pub fn coerce<E: Emitter>(
    compiler: &mut Compiler<E>,
    value: Lowered<E::Value>,
    target: &Type,
    position: &Position,
) -> Result<Lowered<E::Value>, Error> {
    if &value.ty == target {
        return Ok(value);
    }

    let widening = matches!(
        (&value.ty, target),
        (Type::I32, Type::I64) | (Type::F32, Type::F64)
    ) || (value.ty.is_integer() && target.is_float());

    let untyped_pointer = value.ty.is_pointer()
        && target.is_pointer()
        && (value.ty.is_untyped_pointer() || target.is_untyped_pointer());

    if !widening && !untyped_pointer {
        return Err(type_mismatch(target, &value.ty, position));
    }

    let converted = compiler.emitter.convert(&value, target)?;
    Ok(Lowered::new(converted, target.clone()))
}

pub fn type_mismatch(expected: &Type, received: &Type, position: &Position) -> Error {
    Error::new(
        ErrorImpl::TypeMismatch {
            expected: expected.to_string(),
            received: received.to_string(),
        },
        position.clone(),
    )
}

fn unknown_identifier(name: &str, position: &Position) -> Error {
    Error::new(
        ErrorImpl::UnknownIdentifier {
            name: name.to_string(),
        },
        position.clone(),
    )
}
