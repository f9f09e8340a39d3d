//! Type parsing implementation.
//!
//! A type is a primitive spelling (`i32 i64 f32 f64 void ptr`) followed by
//! any number of `*` pointer suffixes. Extern parameter lists may also end in
//! the `...` variadic marker.

use crate::{
    ast::types::Type,
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::parser::Parser;

pub fn parse_type(parser: &mut Parser) -> Result<Type, Error> {
    let token = parser.expect_error(TokenKind::Identifier, "Expected type")?;

    let mut ty = Type::from_name(&token.value).ok_or_else(|| {
        Error::new(
            ErrorImpl::UnknownType {
                type_: token.value.clone(),
            },
            token.span.start.clone(),
        )
    })?;

    while parser.current_token_kind() == TokenKind::Star {
        parser.advance();
        ty = Type::Pointer(Box::new(ty));
    }

    Ok(ty)
}

/// Parses `( <type>, ... )`, returning the types and whether `...` was seen.
///
/// The variadic marker is only accepted when `allow_variadic` is set and must
/// be the last entry.
pub fn parse_type_list(parser: &mut Parser, allow_variadic: bool) -> Result<(Vec<Type>, bool), Error> {
    parser.expect_error(TokenKind::OpenParen, "Expected '(' before argument list")?;

    let mut types = vec![];
    let mut is_variadic = false;

    if parser.current_token_kind() != TokenKind::CloseParen {
        loop {
            if allow_variadic && parser.current_token_kind() == TokenKind::Ellipsis {
                parser.advance();
                is_variadic = true;
                break;
            }

            types.push(parse_type(parser)?);

            if parser.current_token_kind() == TokenKind::Comma {
                parser.advance();
                continue;
            }
            break;
        }
    }

    let message = if is_variadic {
        "Expected ')' after '...'"
    } else {
        "Expected ')' after argument list"
    };
    parser.expect_error(TokenKind::CloseParen, message)?;

    Ok((types, is_variadic))
}
