use std::collections::HashMap;

use crate::ast::types::Type;

use super::{
    emitter::{Emitter, Lowered},
    prototypes::Prototype,
};

/// A declared local: its storage and declared type.
pub struct Local<S> {
    pub slot: S,
    pub ty: Type,
}

/// State of the function currently being lowered.
///
/// Created when a function body is opened, passed by reference through every
/// nested lowering call and dropped when the function is closed.
pub struct FunctionContext<E: Emitter> {
    pub name: String,
    pub prototype: Prototype,
    /// Parameter bindings; `%1` is index 0.
    pub params: Vec<Lowered<E::Value>>,
    /// One table for the whole function, nested blocks included.
    pub locals: HashMap<String, Local<E::Slot>>,
    /// The block being filled has been closed by a `return`.
    pub terminated: bool,
    /// A `return` has been lowered; whatever follows is unreachable.
    pub returned: bool,
}

impl<E: Emitter> FunctionContext<E> {
    pub fn new(name: &str, prototype: Prototype, params: Vec<E::Value>) -> Self {
        let params = params
            .into_iter()
            .zip(prototype.parameter_types.iter())
            .map(|(value, ty)| Lowered::new(value, ty.clone()))
            .collect();

        FunctionContext {
            name: name.to_string(),
            prototype,
            params,
            locals: HashMap::new(),
            terminated: false,
            returned: false,
        }
    }

    /// Binding for the 1-based positional parameter `index`.
    pub fn param(&self, index: usize) -> Option<&Lowered<E::Value>> {
        index.checked_sub(1).and_then(|i| self.params.get(i))
    }

    pub fn return_type(&self) -> &Type {
        &self.prototype.return_type
    }
}
