//! The contract between the shared lowering rules and a backend.
//!
//! `expr.rs` and `stmt.rs` decide *what* to emit: number typing, operand
//! promotion, call checking, return rules. An `Emitter` decides *how* a
//! primitive operation is encoded, either as LLVM IR (`llvm.rs`) or as
//! x86-64 assembly text (`native.rs`).
//!
//! Every value handed to an emitter travels with its language-level type
//! (`Lowered`), and the shared layer guarantees the operand types each
//! primitive documents below.

use crate::{
    ast::{expressions::BinaryOp, types::Type},
    errors::errors::Error,
};

use super::prototypes::Prototype;

/// A backend value tagged with its language-level type.
#[derive(Debug, Clone)]
pub struct Lowered<V> {
    pub value: V,
    pub ty: Type,
}

impl<V> Lowered<V> {
    pub fn new(value: V, ty: Type) -> Self {
        Lowered { value, ty }
    }
}

pub trait Emitter {
    /// A lowered value.
    type Value: Clone;
    /// Storage for a local variable.
    type Slot: Clone;
    /// What `finish` hands back.
    type Output;

    /// Declares a callable. Called once per prototype, before any body.
    fn declare_function(&mut self, name: &str, prototype: &Prototype) -> Result<(), Error>;

    /// Opens the body of a declared function and returns its parameter bindings
    /// in declaration order.
    fn begin_function(&mut self, name: &str, prototype: &Prototype) -> Result<Vec<Self::Value>, Error>;

    /// Closes the function opened by `begin_function`. The body is terminated.
    fn end_function(&mut self) -> Result<(), Error>;

    /// A 32-bit signed integer constant.
    fn const_int(&mut self, value: i32) -> Result<Self::Value, Error>;

    /// A double-precision constant.
    fn const_float(&mut self, value: f64) -> Result<Self::Value, Error>;

    /// Converts `value` to `to`. Only the widening conversions are requested:
    /// integer to floating, `i32` to `i64` and `f32` to `f64`, plus pointer to
    /// pointer when one side is `ptr` or `void*`.
    fn convert(&mut self, value: &Lowered<Self::Value>, to: &Type) -> Result<Self::Value, Error>;

    /// Both operands are `i32`.
    fn int_binary(&mut self, op: BinaryOp, left: Self::Value, right: Self::Value) -> Result<Self::Value, Error>;

    /// Both operands are `f64`.
    fn float_binary(&mut self, op: BinaryOp, left: Self::Value, right: Self::Value) -> Result<Self::Value, Error>;

    /// The address of a NUL-terminated constant string stored under `label`.
    /// Repeated requests for the same label reuse the same storage.
    fn global_string(&mut self, label: &str, bytes: &[u8]) -> Result<Self::Value, Error>;

    /// Reserves a local in the current function's entry frame.
    fn alloc_local(&mut self, name: &str, ty: &Type) -> Result<Self::Slot, Error>;

    fn store(&mut self, slot: &Self::Slot, value: &Lowered<Self::Value>) -> Result<(), Error>;

    fn load(&mut self, slot: &Self::Slot, ty: &Type, name: &str) -> Result<Self::Value, Error>;

    /// Calls `name`. Arguments are already checked and coerced. Returns the
    /// result for non-void callees.
    fn call(
        &mut self,
        name: &str,
        prototype: &Prototype,
        arguments: &[Lowered<Self::Value>],
    ) -> Result<Option<Self::Value>, Error>;

    /// Returns from the current function. The value already has the
    /// function's return type.
    fn ret(&mut self, value: Option<&Lowered<Self::Value>>) -> Result<(), Error>;

    /// Opens a block that nothing branches to, after a `return`.
    fn begin_unreachable(&mut self) -> Result<(), Error>;

    /// Closes an unreachable block that did not end in a `return`.
    fn end_unreachable(&mut self) -> Result<(), Error>;

    fn finish(self) -> Result<Self::Output, Error>;
}
