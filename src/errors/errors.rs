use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Error, Debug, Clone)]
#[error("{internal_error}")]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    /// Errors raised by the external toolchain carry no source position.
    pub fn backend(message: impl Into<String>) -> Self {
        Error::new(
            ErrorImpl::BackendError {
                message: message.into(),
            },
            Position::null(),
        )
    }

    pub fn get_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::SyntaxError { .. } => "SyntaxError",
            ErrorImpl::UnknownIdentifier { .. } => "UnknownIdentifier",
            ErrorImpl::UnknownFunction { .. } => "UnknownFunction",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::TypeMismatch { .. } => "TypeMismatch",
            ErrorImpl::RedefinitionError { .. } => "RedefinitionError",
            ErrorImpl::VariableAlreadyDeclared { .. } => "VariableAlreadyDeclared",
            ErrorImpl::MissingReturn { .. } => "MissingReturn",
            ErrorImpl::InvalidReturn { .. } => "InvalidReturn",
            ErrorImpl::ArgumentCountMismatch { .. } => "ArgumentCountMismatch",
            ErrorImpl::UnsupportedFeature { .. } => "UnsupportedFeature",
            ErrorImpl::BackendError { .. } => "BackendError",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::SyntaxError { message, token } => {
                ErrorTip::Suggestion(format!("{}, found `{}`", message, token))
            }
            ErrorImpl::UnknownIdentifier { name } => {
                ErrorTip::Suggestion(format!("`{}` is not declared in this function", name))
            }
            ErrorImpl::UnknownFunction { function } => ErrorTip::Suggestion(format!(
                "Function `{}` is not declared, implicit declaration not allowed",
                function
            )),
            ErrorImpl::UnknownType { type_ } => {
                ErrorTip::Suggestion(format!("Unknown type `{}` found", type_))
            }
            ErrorImpl::TypeMismatch { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::RedefinitionError { function } => {
                ErrorTip::Suggestion(format!("Function `{}` already has a body", function))
            }
            ErrorImpl::VariableAlreadyDeclared { name } => {
                ErrorTip::Suggestion(format!("Variable `{}` already declared", name))
            }
            ErrorImpl::MissingReturn { function } => ErrorTip::Suggestion(format!(
                "Non-void function `{}` must end with a return statement",
                function
            )),
            ErrorImpl::InvalidReturn { function } => ErrorTip::Suggestion(format!(
                "Void function `{}` cannot return a value",
                function
            )),
            ErrorImpl::ArgumentCountMismatch {
                expected, received, ..
            } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::UnsupportedFeature { .. } => ErrorTip::None,
            ErrorImpl::BackendError { .. } => ErrorTip::None,
        }
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("{message}: {token:?}")]
    SyntaxError { message: String, token: String },
    #[error("unknown identifier {name:?}")]
    UnknownIdentifier { name: String },
    #[error("implicit declaration of function {function:?} not allowed")]
    UnknownFunction { function: String },
    #[error("unknown type {type_} found")]
    UnknownType { type_: String },
    #[error("types do not match: expected {expected}, received {received}")]
    TypeMismatch { expected: String, received: String },
    #[error("function {function:?} redefined")]
    RedefinitionError { function: String },
    #[error("variable {name:?} already declared")]
    VariableAlreadyDeclared { name: String },
    #[error("non-void function {function:?} missing return statement")]
    MissingReturn { function: String },
    #[error("void function {function:?} cannot return a value")]
    InvalidReturn { function: String },
    #[error("call to {function:?}: expected {expected} arguments, received {received}")]
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        received: usize,
    },
    #[error("unsupported: {message}")]
    UnsupportedFeature { message: String },
    #[error("backend error: {message}")]
    BackendError { message: String },
}
