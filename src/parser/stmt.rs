use crate::{
    ast::{
        ast::{ExternAST, FunctionAST},
        statements::{BlockStmt, Stmt, StmtKind},
        types::Type,
    },
    errors::errors::Error,
    lexer::tokens::TokenKind,
    parser::expr::parse_expr,
    Span,
};

use super::{
    parser::Parser,
    types::{parse_type, parse_type_list},
};

pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    match parser.current_token_kind() {
        TokenKind::Return => return parse_return_stmt(parser),
        TokenKind::OpenCurly => {
            let start = parser.get_position();
            let block = parse_block(parser)?;
            return Ok(Stmt::new(
                StmtKind::Block(block),
                Span {
                    start,
                    end: parser.get_position(),
                },
            ));
        }
        TokenKind::Identifier if Type::is_primitive_name(&parser.current_token().value) => {
            return parse_var_decl_stmt(parser)
        }
        _ => {}
    }

    let expr = parse_expr(parser)?;

    parser.expect_error(TokenKind::Semicolon, "Expected ';' after expression")?;

    Ok(Stmt::new(StmtKind::Expression(expr.clone()), expr.span))
}

/// `<type> <name> [= <expr>] ;`
pub fn parse_var_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.get_position();
    let var_type = parse_type(parser)?;

    let name = parser
        .expect_error(
            TokenKind::Identifier,
            "Expected identifier during variable declaration",
        )?
        .value;

    let initializer = if parser.current_token_kind() == TokenKind::Assignment {
        parser.advance();
        Some(parse_expr(parser)?)
    } else {
        None
    };

    let end = parser
        .expect_error(TokenKind::Semicolon, "Expected ';' after variable declaration")?
        .span
        .end;

    Ok(Stmt::new(
        StmtKind::VarDecl {
            name,
            var_type,
            initializer,
        },
        Span { start, end },
    ))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let value = if parser.current_token_kind() != TokenKind::Semicolon {
        Some(parse_expr(parser)?)
    } else {
        None
    };

    let end = parser
        .expect_error(TokenKind::Semicolon, "Expected ';' after return statement")?
        .span
        .end;

    Ok(Stmt::new(StmtKind::Return(value), Span { start, end }))
}

pub fn parse_block(parser: &mut Parser) -> Result<BlockStmt, Error> {
    parser.expect_error(TokenKind::OpenCurly, "Expected '{'")?;

    let mut body = Vec::new();
    while parser.current_token_kind() != TokenKind::CloseCurly {
        if !parser.has_tokens() {
            return Err(parser.syntax_error("Expected '}' at end of block"));
        }
        body.push(parse_stmt(parser)?);
    }

    parser.expect(TokenKind::CloseCurly)?;

    Ok(BlockStmt { body })
}

/// `<type> <name>(<types>) { <statements> }`
pub fn parse_fn_decl(parser: &mut Parser) -> Result<FunctionAST, Error> {
    let start = parser.get_position();

    let return_type = parse_type(parser)?;
    let name = parser
        .expect_error(TokenKind::Identifier, "Expected function name")?
        .value;
    let (parameter_types, _) = parse_type_list(parser, false)?;
    let body = parse_block(parser)?;

    Ok(FunctionAST {
        name,
        return_type,
        parameter_types,
        body,
        span: Span {
            start,
            end: parser.get_position(),
        },
    })
}

/// `extrn <type> <name>(<types>[, ...]);`
pub fn parse_extern_decl(parser: &mut Parser) -> Result<ExternAST, Error> {
    let start = parser.advance().span.start;

    let return_type = parse_type(parser)?;
    let name = parser
        .expect_error(TokenKind::Identifier, "Expected extern name")?
        .value;
    let (parameter_types, is_variadic) = parse_type_list(parser, true)?;

    let end = parser
        .expect_error(TokenKind::Semicolon, "Expected ';' after extern declaration")?
        .span
        .end;

    Ok(ExternAST {
        name,
        return_type,
        parameter_types,
        is_variadic,
        span: Span { start, end },
    })
}
