//! Main compiler module.
//!
//! This module contains the Compiler structure driving one compilation from a
//! parsed program to an emitted module, and the `compile` entry points.
//!
//! Lowering happens in two sequential phases:
//! 1. Every extern and function signature is registered in the prototype
//!    table and declared to the backend
//! 2. Function bodies are lowered in source order
//!
//! The first error aborts the compilation and no module is produced.

use std::rc::Rc;

use inkwell::{context::Context, module::Module};

use crate::{
    ast::ast::{FunctionAST, ProgramAST},
    errors::errors::{Error, ErrorImpl},
    parser::parser::parse,
};

use super::{
    context::FunctionContext,
    emitter::Emitter,
    llvm::IrEmitter,
    native::NativeEmitter,
    prototypes::{Prototype, PrototypeTable},
    stmt::gen_block,
    strings::StringPool,
};

/// Selects how the program is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    /// LLVM IR text
    #[default]
    Llvm,
    /// x86-64 assembly text (AT&T syntax, System V)
    Native,
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub backend: Backend,
    /// Names the module and every source position in diagnostics.
    pub module_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            backend: Backend::default(),
            module_name: String::from("main"),
        }
    }
}

/// The textual result of a compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum EmittedModule {
    Ir(String),
    Assembly(String),
}

impl EmittedModule {
    pub fn text(&self) -> &str {
        match self {
            EmittedModule::Ir(text) | EmittedModule::Assembly(text) => text,
        }
    }

    /// File extension for the emitted text.
    pub fn extension(&self) -> &'static str {
        match self {
            EmittedModule::Ir(_) => "ll",
            EmittedModule::Assembly(_) => "s",
        }
    }
}

/// The state of one compilation, generic over the backend.
///
/// # Type Parameters
///
/// * `E` - The backend encoding the lowered program
pub struct Compiler<E: Emitter> {
    /// The backend receiving primitive operations
    pub emitter: E,
    /// Signatures of every callable name, read-only once lowering starts
    pub prototypes: PrototypeTable,
    /// Labels of the string literals seen so far
    pub strings: StringPool,
}

impl<E: Emitter> Compiler<E> {
    pub fn new(emitter: E, prototypes: PrototypeTable) -> Self {
        Compiler {
            emitter,
            prototypes,
            strings: StringPool::new(),
        }
    }

    /// Lowers every function of `program` and finishes the backend.
    pub fn compile(mut self, program: &ProgramAST) -> Result<E::Output, Error> {
        self.declare_prototypes()?;

        for function in &program.functions {
            self.gen_function(function)?;
        }

        self.emitter.finish()
    }

    /// Declares every registered callable, externs included.
    fn declare_prototypes(&mut self) -> Result<(), Error> {
        let prototypes: Vec<(String, Prototype)> = self
            .prototypes
            .iter()
            .map(|(name, prototype)| (name.to_string(), prototype.clone()))
            .collect();

        for (name, prototype) in prototypes {
            self.emitter.declare_function(&name, &prototype)?;
        }

        Ok(())
    }

    /// Lowers one function body inside a fresh generation context.
    ///
    /// A body that falls off its end gets an implicit return when the
    /// function is void and fails with `MissingReturn` otherwise. An
    /// unreachable tail after a `return` is closed without a return.
    fn gen_function(&mut self, function: &FunctionAST) -> Result<(), Error> {
        let prototype = self
            .prototypes
            .resolve(&function.name, &function.span.start)?
            .clone();

        let params = self.emitter.begin_function(&function.name, &prototype)?;
        let mut context = FunctionContext::<E>::new(&function.name, prototype, params);

        gen_block(self, &mut context, &function.body)?;

        if context.terminated {
            return self.emitter.end_function();
        }

        if context.returned {
            self.emitter.end_unreachable()?;
        } else if context.return_type().is_void() {
            self.emitter.ret(None)?;
        } else {
            return Err(Error::new(
                ErrorImpl::MissingReturn {
                    function: function.name.clone(),
                },
                function.span.end.clone(),
            ));
        }

        self.emitter.end_function()
    }
}

/// Lowers `program` into an LLVM module owned by `context`.
///
/// The module has the host triple and data layout set and has passed the
/// verifier.
pub fn compile_to_module<'ctx>(
    program: &ProgramAST,
    context: &'ctx Context,
    module_name: &str,
) -> Result<Module<'ctx>, Error> {
    let prototypes = PrototypeTable::build(program)?;
    let emitter = IrEmitter::new(context, module_name);

    Compiler::new(emitter, prototypes).compile(program)
}

/// Lowers an already-parsed program with the selected backend.
pub fn compile_program(program: &ProgramAST, options: &CompileOptions) -> Result<EmittedModule, Error> {
    match options.backend {
        Backend::Llvm => {
            let context = Context::create();
            let module = compile_to_module(program, &context, &options.module_name)?;

            Ok(EmittedModule::Ir(
                module.print_to_string().to_string_lossy().into_owned(),
            ))
        }
        Backend::Native => {
            let prototypes = PrototypeTable::build(program)?;
            let assembly = Compiler::new(NativeEmitter::new(), prototypes).compile(program)?;

            Ok(EmittedModule::Assembly(assembly))
        }
    }
}

/// The main compile function: source text in, emitted module out.
///
/// # Arguments
///
/// * `source` - The complete translation unit
/// * `options` - Backend selection and module name
///
/// # Returns
///
/// Returns the emitted module, or the first error encountered.
pub fn compile(source: &str, options: &CompileOptions) -> Result<EmittedModule, Error> {
    let program = parse(source.to_string(), Rc::new(options.module_name.clone()))?;

    compile_program(&program, options)
}
