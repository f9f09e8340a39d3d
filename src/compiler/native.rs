//! Native backend: x86-64 assembly in AT&T syntax for the System V ABI.
//!
//! Every lowered value lives in memory (an 8-byte frame slot below `%rbp`, a
//! stack argument above it, or a `.rodata` constant) or is an immediate, so
//! no value is ever held in a register across two operations. Each primitive
//! loads its operands into scratch registers, computes and spills the result
//! into a fresh slot.
//!
//! Integer and pointer parameters take `%rdi`..`%r9`, floating ones
//! `%xmm0`..`%xmm7`; register parameters are spilled at entry. Parameters that
//! overflow their register class are read in place at `16(%rbp)`,
//! `24(%rbp)`, ... in declaration order. Each function has a single exit
//! label; `return` jumps to it.

use std::{
    collections::{HashMap, HashSet},
    fmt::{Display, Write},
};

use crate::{
    ast::{expressions::BinaryOp, types::Type},
    errors::errors::Error,
};

use super::{
    emitter::{Emitter, Lowered},
    prototypes::Prototype,
};

const ARGUMENT_REGISTERS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];
const ARGUMENT_REGISTERS_32: [&str; 6] = ["%edi", "%esi", "%edx", "%ecx", "%r8d", "%r9d"];
const FLOAT_ARGUMENT_REGISTERS: [&str; 8] = [
    "%xmm0", "%xmm1", "%xmm2", "%xmm3", "%xmm4", "%xmm5", "%xmm6", "%xmm7",
];

/// Offset of the first stack-passed argument, past the saved `%rbp` and the
/// return address.
const STACK_ARGUMENT_BASE: i32 = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Immediate(i64),
    /// Memory at `offset(%rbp)`
    Frame(i32),
    /// Memory at a `.rodata` label
    Constant(String),
    /// The address of a `.rodata` label
    Address(String),
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Immediate(value) => write!(f, "${}", value),
            Operand::Frame(offset) => write!(f, "{}(%rbp)", offset),
            Operand::Constant(label) | Operand::Address(label) => write!(f, "{}(%rip)", label),
        }
    }
}

/// Values wider than 32 bits move with `q` instructions.
fn is_quad(ty: &Type) -> bool {
    matches!(ty, Type::I64) || ty.is_pointer()
}

/// Where the System V convention places one argument.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ArgumentClass {
    /// Index into `ARGUMENT_REGISTERS`
    Integer(usize),
    /// Index into `FLOAT_ARGUMENT_REGISTERS`
    Float(usize),
    /// Index among the stack-passed arguments
    Stack(usize),
}

/// Assigns registers in order, each class independently; the rest go on the
/// stack in declaration order.
fn classify<'a>(types: impl Iterator<Item = &'a Type>) -> Vec<ArgumentClass> {
    let (mut integers, mut floats, mut stack) = (0, 0, 0);

    types
        .map(|ty| {
            if ty.is_float() && floats < FLOAT_ARGUMENT_REGISTERS.len() {
                floats += 1;
                ArgumentClass::Float(floats - 1)
            } else if !ty.is_float() && integers < ARGUMENT_REGISTERS.len() {
                integers += 1;
                ArgumentClass::Integer(integers - 1)
            } else {
                stack += 1;
                ArgumentClass::Stack(stack - 1)
            }
        })
        .collect()
}

fn float_move(ty: &Type) -> &'static str {
    if *ty == Type::F32 {
        "movss"
    } else {
        "movsd"
    }
}

#[derive(Default)]
pub struct NativeEmitter {
    /// Finished functions
    text: String,
    /// Body of the open function, wrapped in its prologue once the frame is known
    body: String,
    function: Option<String>,
    frame_size: i32,
    strings: Vec<(String, Vec<u8>)>,
    string_labels: HashSet<String>,
    floats: Vec<(String, f64)>,
    float_labels: HashMap<u64, String>,
    unreachable_blocks: usize,
}

impl NativeEmitter {
    pub fn new() -> Self {
        NativeEmitter::default()
    }

    fn emit(&mut self, instruction: impl AsRef<str>) {
        self.body.push_str("    ");
        self.body.push_str(instruction.as_ref());
        self.body.push('\n');
    }

    fn alloc_slot(&mut self) -> i32 {
        self.frame_size += 8;
        -self.frame_size
    }

    fn exit_label(&self) -> Result<String, Error> {
        self.function
            .as_ref()
            .map(|name| format!(".L.return.{}", name))
            .ok_or_else(|| Error::backend("no function is being lowered"))
    }

    /// Loads an integer or pointer operand into `register` (64-bit name);
    /// 32-bit values go through `register32`.
    fn load_int(&mut self, operand: &Operand, ty: &Type, register: &str, register32: &str) {
        match operand {
            Operand::Address(_) => self.emit(format!("leaq {}, {}", operand, register)),
            _ if is_quad(ty) => self.emit(format!("movq {}, {}", operand, register)),
            _ => self.emit(format!("movl {}, {}", operand, register32)),
        }
    }

    fn load_float(&mut self, operand: &Operand, ty: &Type, register: &str) {
        self.emit(format!("{} {}, {}", float_move(ty), operand, register));
    }

    /// Pushes one stack argument as a full eight-byte word.
    fn push_argument(&mut self, argument: &Lowered<Operand>) {
        match (&argument.value, &argument.ty) {
            (Operand::Address(_), _) => self.emit(format!("leaq {}, %rax", argument.value)),
            (_, Type::F64) => self.emit(format!("movq {}, %rax", argument.value)),
            (_, Type::F32) => self.emit(format!("movl {}, %eax", argument.value)),
            (operand, ty) => self.load_int(operand, ty, "%rax", "%eax"),
        }
        self.emit("pushq %rax");
    }

    /// Spills `%rax`/`%eax` or `%xmm0` into a fresh slot.
    fn spill_result(&mut self, ty: &Type) -> Operand {
        let slot = self.alloc_slot();

        let instruction = match ty {
            Type::F32 => "movss %xmm0",
            Type::F64 => "movsd %xmm0",
            ty if is_quad(ty) => "movq %rax",
            _ => "movl %eax",
        };
        self.emit(format!("{}, {}(%rbp)", instruction, slot));

        Operand::Frame(slot)
    }

    fn write_function(&mut self, name: &str) {
        let frame = (self.frame_size + 15) / 16 * 16;
        let body = std::mem::take(&mut self.body);

        let _ = writeln!(self.text, "    .globl {}", name);
        let _ = writeln!(self.text, "    .type {}, @function", name);
        let _ = writeln!(self.text, "{}:", name);
        let _ = writeln!(self.text, "    pushq %rbp");
        let _ = writeln!(self.text, "    movq %rsp, %rbp");
        if frame > 0 {
            let _ = writeln!(self.text, "    subq ${}, %rsp", frame);
        }
        self.text.push_str(&body);
        let _ = writeln!(self.text, ".L.return.{}:", name);
        let _ = writeln!(self.text, "    movq %rbp, %rsp");
        let _ = writeln!(self.text, "    popq %rbp");
        let _ = writeln!(self.text, "    ret");
        let _ = writeln!(self.text, "    .size {}, .-{}", name, name);
    }
}

impl Emitter for NativeEmitter {
    type Value = Operand;
    /// Frame offset of the local
    type Slot = i32;
    type Output = String;

    fn declare_function(&mut self, _name: &str, _prototype: &Prototype) -> Result<(), Error> {
        Ok(())
    }

    fn begin_function(&mut self, name: &str, prototype: &Prototype) -> Result<Vec<Self::Value>, Error> {
        if let Some(open) = &self.function {
            return Err(Error::backend(format!(
                "function `{}` is still open while opening `{}`",
                open, name
            )));
        }

        self.function = Some(name.to_string());
        self.body.clear();
        self.frame_size = 0;
        self.unreachable_blocks = 0;

        let types = &prototype.parameter_types;
        let mut params = Vec::with_capacity(types.len());

        for (ty, class) in types.iter().zip(classify(types.iter())) {
            let (instruction, register) = match class {
                ArgumentClass::Stack(index) => {
                    params.push(Operand::Frame(STACK_ARGUMENT_BASE + 8 * index as i32));
                    continue;
                }
                ArgumentClass::Float(index) => (float_move(ty), FLOAT_ARGUMENT_REGISTERS[index]),
                ArgumentClass::Integer(index) if is_quad(ty) => ("movq", ARGUMENT_REGISTERS[index]),
                ArgumentClass::Integer(index) => ("movl", ARGUMENT_REGISTERS_32[index]),
            };

            let slot = self.alloc_slot();
            self.emit(format!("{} {}, {}(%rbp)", instruction, register, slot));
            params.push(Operand::Frame(slot));
        }

        Ok(params)
    }

    fn end_function(&mut self) -> Result<(), Error> {
        let name = self
            .function
            .take()
            .ok_or_else(|| Error::backend("no function is being lowered"))?;

        self.write_function(&name);
        Ok(())
    }

    fn const_int(&mut self, value: i32) -> Result<Self::Value, Error> {
        Ok(Operand::Immediate(value as i64))
    }

    fn const_float(&mut self, value: f64) -> Result<Self::Value, Error> {
        let bits = value.to_bits();

        let label = match self.float_labels.get(&bits) {
            Some(label) => label.clone(),
            None => {
                let label = format!(".LF{}", self.floats.len());
                self.floats.push((label.clone(), value));
                self.float_labels.insert(bits, label.clone());
                label
            }
        };

        Ok(Operand::Constant(label))
    }

    fn convert(&mut self, value: &Lowered<Self::Value>, to: &Type) -> Result<Self::Value, Error> {
        match (&value.ty, to) {
            (from, Type::F32 | Type::F64) if from.is_integer() => {
                self.load_int(&value.value, from, "%rax", "%eax");

                let instruction = match (is_quad(from), to) {
                    (true, Type::F32) => "cvtsi2ssq %rax",
                    (true, _) => "cvtsi2sdq %rax",
                    (false, Type::F32) => "cvtsi2ssl %eax",
                    (false, _) => "cvtsi2sdl %eax",
                };
                self.emit(format!("{}, %xmm0", instruction));
            }
            (Type::I32, Type::I64) => {
                self.load_int(&value.value, &Type::I32, "%rax", "%eax");
                self.emit("movslq %eax, %rax");
            }
            (Type::F32, Type::F64) => {
                self.load_float(&value.value, &Type::F32, "%xmm0");
                self.emit("cvtss2sd %xmm0, %xmm0");
            }
            // Pointers share one representation
            (from, to) if from.is_pointer() && to.is_pointer() => return Ok(value.value.clone()),
            (from, to) => {
                return Err(Error::backend(format!("cannot convert {} to {}", from, to)))
            }
        }

        Ok(self.spill_result(to))
    }

    fn int_binary(&mut self, op: BinaryOp, left: Self::Value, right: Self::Value) -> Result<Self::Value, Error> {
        self.emit(format!("movl {}, %eax", left));
        self.emit(format!("movl {}, %ecx", right));

        match op {
            BinaryOp::Add => self.emit("addl %ecx, %eax"),
            BinaryOp::Sub => self.emit("subl %ecx, %eax"),
            BinaryOp::Mul => self.emit("imull %ecx, %eax"),
            BinaryOp::Div => {
                self.emit("cltd");
                self.emit("idivl %ecx");
            }
        }

        Ok(self.spill_result(&Type::I32))
    }

    fn float_binary(&mut self, op: BinaryOp, left: Self::Value, right: Self::Value) -> Result<Self::Value, Error> {
        self.emit(format!("movsd {}, %xmm0", left));
        self.emit(format!("movsd {}, %xmm1", right));

        let instruction = match op {
            BinaryOp::Add => "addsd",
            BinaryOp::Sub => "subsd",
            BinaryOp::Mul => "mulsd",
            BinaryOp::Div => "divsd",
        };
        self.emit(format!("{} %xmm1, %xmm0", instruction));

        Ok(self.spill_result(&Type::F64))
    }

    fn global_string(&mut self, label: &str, bytes: &[u8]) -> Result<Self::Value, Error> {
        if self.string_labels.insert(label.to_string()) {
            self.strings.push((label.to_string(), bytes.to_vec()));
        }

        Ok(Operand::Address(label.to_string()))
    }

    fn alloc_local(&mut self, _name: &str, _ty: &Type) -> Result<Self::Slot, Error> {
        Ok(self.alloc_slot())
    }

    fn store(&mut self, slot: &Self::Slot, value: &Lowered<Self::Value>) -> Result<(), Error> {
        match &value.ty {
            Type::F32 => {
                self.load_float(&value.value, &value.ty, "%xmm0");
                self.emit(format!("movss %xmm0, {}(%rbp)", slot));
            }
            Type::F64 => {
                self.load_float(&value.value, &value.ty, "%xmm0");
                self.emit(format!("movsd %xmm0, {}(%rbp)", slot));
            }
            ty if is_quad(ty) => {
                self.load_int(&value.value, ty, "%rax", "%eax");
                self.emit(format!("movq %rax, {}(%rbp)", slot));
            }
            ty => {
                self.load_int(&value.value, ty, "%rax", "%eax");
                self.emit(format!("movl %eax, {}(%rbp)", slot));
            }
        }

        Ok(())
    }

    /// Locals are never reassigned, so the slot itself is the value.
    fn load(&mut self, slot: &Self::Slot, _ty: &Type, _name: &str) -> Result<Self::Value, Error> {
        Ok(Operand::Frame(*slot))
    }

    fn call(
        &mut self,
        name: &str,
        prototype: &Prototype,
        arguments: &[Lowered<Self::Value>],
    ) -> Result<Option<Self::Value>, Error> {
        let classes = classify(arguments.iter().map(|argument| &argument.ty));

        let stack_arguments: Vec<&Lowered<Operand>> = arguments
            .iter()
            .zip(&classes)
            .filter(|(_, class)| matches!(class, ArgumentClass::Stack(_)))
            .map(|(argument, _)| argument)
            .collect();
        let padding = if stack_arguments.len() % 2 == 1 { 8 } else { 0 };

        if padding > 0 {
            self.emit(format!("subq ${}, %rsp", padding));
        }

        for argument in stack_arguments.iter().rev() {
            self.push_argument(argument);
        }

        let mut vector_registers = 0;
        for (argument, class) in arguments.iter().zip(&classes) {
            match *class {
                ArgumentClass::Integer(index) => self.load_int(
                    &argument.value,
                    &argument.ty,
                    ARGUMENT_REGISTERS[index],
                    ARGUMENT_REGISTERS_32[index],
                ),
                ArgumentClass::Float(index) => {
                    self.load_float(&argument.value, &argument.ty, FLOAT_ARGUMENT_REGISTERS[index]);
                    vector_registers += 1;
                }
                ArgumentClass::Stack(_) => {}
            }
        }

        // %al carries the number of vector registers used
        if prototype.is_variadic {
            if vector_registers == 0 {
                self.emit("xorl %eax, %eax");
            } else {
                self.emit(format!("movl ${}, %eax", vector_registers));
            }
        }

        if prototype.has_body {
            self.emit(format!("call {}", name));
        } else {
            self.emit(format!("call {}@PLT", name));
        }

        let cleanup = stack_arguments.len() * 8 + padding;
        if cleanup > 0 {
            self.emit(format!("addq ${}, %rsp", cleanup));
        }

        if prototype.return_type.is_void() {
            return Ok(None);
        }

        Ok(Some(self.spill_result(&prototype.return_type)))
    }

    fn ret(&mut self, value: Option<&Lowered<Self::Value>>) -> Result<(), Error> {
        let exit = self.exit_label()?;

        if let Some(value) = value {
            if value.ty.is_float() {
                self.load_float(&value.value, &value.ty, "%xmm0");
            } else {
                self.load_int(&value.value, &value.ty, "%rax", "%eax");
            }
        }

        self.emit(format!("jmp {}", exit));
        Ok(())
    }

    fn begin_unreachable(&mut self) -> Result<(), Error> {
        let name = self
            .function
            .clone()
            .ok_or_else(|| Error::backend("no function is being lowered"))?;

        let _ = writeln!(self.body, ".L.unreachable.{}.{}:", name, self.unreachable_blocks);
        self.unreachable_blocks += 1;

        Ok(())
    }

    /// The exit label follows the body, so nothing needs closing.
    fn end_unreachable(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Code first, then the read-only pool of floating constants and strings.
    fn finish(mut self) -> Result<Self::Output, Error> {
        if let Some(open) = &self.function {
            return Err(Error::backend(format!("function `{}` was never closed", open)));
        }

        let mut assembly = String::from("    .text\n");
        assembly.push_str(&self.text);

        if !self.floats.is_empty() || !self.strings.is_empty() {
            assembly.push_str("    .section .rodata\n");
        }

        for (label, value) in self.floats.drain(..) {
            let _ = writeln!(assembly, "    .p2align 3");
            let _ = writeln!(assembly, "{}:", label);
            let _ = writeln!(assembly, "    .quad 0x{:016x}", value.to_bits());
        }

        for (label, mut bytes) in self.strings.drain(..) {
            bytes.push(0);
            let data: Vec<String> = bytes.iter().map(|byte| byte.to_string()).collect();

            let _ = writeln!(assembly, "{}:", label);
            let _ = writeln!(assembly, "    .byte {}", data.join(","));
        }

        assembly.push_str("    .section .note.GNU-stack,\"\",@progbits\n");

        Ok(assembly)
    }
}
