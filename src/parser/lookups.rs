use std::collections::HashMap;

use crate::lexer::tokens::TokenKind;

use super::parser::Parser;

/// Operator precedence. Higher binds tighter.
#[derive(PartialEq, PartialOrd, Clone, Copy, Debug)]
pub enum BindingPower {
    Additive = 30,
    Multiplicative = 40,
}

impl BindingPower {
    pub fn precedence(self) -> i32 {
        self as i32
    }
}

pub fn create_token_lookups(parser: &mut Parser) {
    // Additive and multiplicative
    parser.binary(TokenKind::Plus, BindingPower::Additive);
    parser.binary(TokenKind::Dash, BindingPower::Additive);
    parser.binary(TokenKind::Star, BindingPower::Multiplicative);
    parser.binary(TokenKind::Slash, BindingPower::Multiplicative);
}

pub type BPLookup = HashMap<TokenKind, BindingPower>;
