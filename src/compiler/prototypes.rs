//! The prototype table: every callable name and its signature.
//!
//! The table is filled in a registration pass over the whole program before
//! any function body is lowered, so calls may refer to functions defined
//! later in the source. After registration it is only read.

use std::collections::HashMap;

use crate::{
    ast::{
        ast::{ExternAST, FunctionAST, ProgramAST},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    pub return_type: Type,
    pub parameter_types: Vec<Type>,
    pub is_variadic: bool,
    /// Set for functions defined in this program; externs have no body.
    pub has_body: bool,
}

impl Prototype {
    pub fn from_extern(extern_: &ExternAST) -> Self {
        Prototype {
            return_type: extern_.return_type.clone(),
            parameter_types: extern_.parameter_types.clone(),
            is_variadic: extern_.is_variadic,
            has_body: false,
        }
    }

    pub fn from_function(function: &FunctionAST) -> Self {
        Prototype {
            return_type: function.return_type.clone(),
            parameter_types: function.parameter_types.clone(),
            is_variadic: false,
            has_body: true,
        }
    }
}

fn check_parameters(name: &str, parameter_types: &[Type], position: &Position) -> Result<(), Error> {
    if parameter_types.iter().any(Type::is_void) {
        return Err(Error::new(
            ErrorImpl::UnsupportedFeature {
                message: format!("parameter of type void in `{}`", name),
            },
            position.clone(),
        ));
    }

    Ok(())
}

/// Name to signature mapping, iterated in registration order.
#[derive(Debug, Default)]
pub struct PrototypeTable {
    entries: HashMap<String, Prototype>,
    order: Vec<String>,
}

impl PrototypeTable {
    pub fn new() -> Self {
        PrototypeTable::default()
    }

    /// Builds the table for a whole program: externs first, then functions.
    pub fn build(program: &ProgramAST) -> Result<Self, Error> {
        let mut table = PrototypeTable::new();

        for extern_ in &program.externs {
            check_parameters(&extern_.name, &extern_.parameter_types, &extern_.span.start)?;
            table.register_extern(extern_);
        }

        for function in &program.functions {
            check_parameters(&function.name, &function.parameter_types, &function.span.start)?;
            table.register_function(function)?;
        }

        Ok(table)
    }

    /// Re-declaring an extern replaces the previous entry.
    pub fn register_extern(&mut self, extern_: &ExternAST) {
        self.insert(&extern_.name, Prototype::from_extern(extern_));
    }

    pub fn register_function(&mut self, function: &FunctionAST) -> Result<(), Error> {
        if let Some(existing) = self.entries.get(&function.name) {
            if existing.has_body {
                return Err(Error::new(
                    ErrorImpl::RedefinitionError {
                        function: function.name.clone(),
                    },
                    function.span.start.clone(),
                ));
            }
        }

        self.insert(&function.name, Prototype::from_function(function));
        Ok(())
    }

    fn insert(&mut self, name: &str, prototype: Prototype) {
        if self.entries.insert(name.to_string(), prototype).is_none() {
            self.order.push(name.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Prototype> {
        self.entries.get(name)
    }

    /// Looks up a callee, failing with `UnknownFunction` at `position`.
    pub fn resolve(&self, name: &str, position: &Position) -> Result<&Prototype, Error> {
        self.entries.get(name).ok_or_else(|| {
            Error::new(
                ErrorImpl::UnknownFunction {
                    function: name.to_string(),
                },
                position.clone(),
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prototype)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|proto| (name.as_str(), proto)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
