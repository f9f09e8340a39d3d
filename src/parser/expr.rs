use crate::{
    ast::expressions::{BinaryOp, Expr, ExprKind},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    Span,
};

use super::parser::Parser;

pub fn parse_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let left = parse_primary_expr(parser)?;
    parse_binary_rhs(parser, 0, left)
}

/// Precedence climbing: absorb operators binding at least `min_precedence`,
/// recursing when the following operator binds tighter than the current one.
pub fn parse_binary_rhs(
    parser: &mut Parser,
    min_precedence: i32,
    mut left: Expr,
) -> Result<Expr, Error> {
    loop {
        let precedence = parser.get_precedence();
        if precedence < 0 || precedence < min_precedence {
            return Ok(left);
        }

        let operator = parser.advance();
        let op = BinaryOp::from_symbol(&operator.value)
            .ok_or_else(|| parser.syntax_error("Expected binary operator"))?;

        let mut right = parse_primary_expr(parser)?;

        if precedence < parser.get_precedence() {
            right = parse_binary_rhs(parser, precedence + 1, right)?;
        }

        left = Expr::binary(op, left, right);
    }
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    match parser.current_token_kind() {
        TokenKind::Percent => parse_positional_param_expr(parser),
        TokenKind::String => {
            let token = parser.advance();
            Ok(Expr::new(ExprKind::StringLiteral(token.value), token.span))
        }
        TokenKind::Identifier => {
            let token = parser.advance();

            if parser.current_token_kind() == TokenKind::OpenParen {
                parse_call_expr(parser, token.value, token.span)
            } else {
                Ok(Expr::new(ExprKind::Variable(token.value), token.span))
            }
        }
        TokenKind::OpenParen => parse_grouping_expr(parser),
        TokenKind::Number => {
            let value = parser
                .current_token()
                .value
                .parse::<f64>()
                .map_err(|_| parser.syntax_error("Invalid number literal"))?;
            let token = parser.advance();

            Ok(Expr::new(ExprKind::Number(value), token.span))
        }
        _ => Err(parser.syntax_error("Unexpected token in primary expression")),
    }
}

/// `%` immediately followed by decimal digits.
pub fn parse_positional_param_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let percent = parser.advance();
    let digits = parser.current_token();

    let adjacent = digits.span.start.0 == percent.span.end.0;
    if digits.kind != TokenKind::Number
        || !adjacent
        || !digits.value.chars().all(|c| c.is_ascii_digit())
    {
        return Err(parser.syntax_error("Expected digit after '%'"));
    }

    // Too many digits for any parameter list
    let index = digits.value.parse::<usize>().map_err(|_| {
        Error::new(
            ErrorImpl::UnknownIdentifier {
                name: format!("%{}", digits.value),
            },
            percent.span.start.clone(),
        )
    })?;
    let digits = parser.advance();

    Ok(Expr::new(
        ExprKind::PositionalParam(index),
        Span {
            start: percent.span.start,
            end: digits.span.end,
        },
    ))
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    parser.advance();
    let expr = parse_expr(parser)?;
    parser.expect_error(TokenKind::CloseParen, "Expected ')' after expression")?;

    Ok(expr)
}

pub fn parse_call_expr(parser: &mut Parser, callee: String, callee_span: Span) -> Result<Expr, Error> {
    parser.advance();

    let mut arguments = vec![];

    if parser.current_token_kind() != TokenKind::CloseParen {
        loop {
            arguments.push(parse_expr(parser)?);

            if parser.current_token_kind() == TokenKind::Comma {
                parser.advance();
                continue;
            }
            break;
        }
    }

    let close = parser.expect_error(TokenKind::CloseParen, "Expected ')' after arguments")?;

    Ok(Expr::new(
        ExprKind::Call { callee, arguments },
        Span {
            start: callee_span.start,
            end: close.span.end,
        },
    ))
}
