//! LLVM IR backend.
//!
//! Builds an inkwell module. Parameters bind directly to the function's
//! LLVM arguments, locals are allocas in the entry block and string literals
//! are private constant globals named by their pool label.

use inkwell::{
    builder::{Builder, BuilderError},
    context::Context,
    module::{Linkage, Module},
    targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine},
    types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType},
    values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue, PointerValue},
    AddressSpace, OptimizationLevel,
};

use crate::{
    ast::{expressions::BinaryOp, types::Type},
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    emitter::{Emitter, Lowered},
    prototypes::Prototype,
};

/// The IR emitter holding the LLVM state of one compilation.
///
/// # Type Parameters
///
/// * `'ctx` - Lifetime of the LLVM context
pub struct IrEmitter<'ctx> {
    /// Reference to the LLVM context
    context: &'ctx Context,
    /// The LLVM module being built
    module: Module<'ctx>,
    /// The LLVM IR builder, positioned inside the open function
    builder: Builder<'ctx>,
    /// The function whose body is being lowered
    current_function: Option<FunctionValue<'ctx>>,
}

impl<'ctx> IrEmitter<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        IrEmitter {
            context,
            module: context.create_module(module_name),
            builder: context.create_builder(),
            current_function: None,
        }
    }

    /// Converts a language type to an LLVM basic type.
    ///
    /// `ptr` and `void*` are `i8*`. `void` has no basic type.
    pub fn convert_type(&self, ty: &Type) -> Result<BasicTypeEnum<'ctx>, Error> {
        Ok(match ty {
            Type::I32 => self.context.i32_type().into(),
            Type::I64 => self.context.i64_type().into(),
            Type::F32 => self.context.f32_type().into(),
            Type::F64 => self.context.f64_type().into(),
            Type::Ptr => self.byte_pointer_type().into(),
            Type::Pointer(inner) => match inner.as_ref() {
                Type::Void => self.byte_pointer_type().into(),
                inner => self
                    .convert_type(inner)?
                    .ptr_type(AddressSpace::default())
                    .into(),
            },
            Type::Void => {
                return Err(Error::new(
                    ErrorImpl::UnsupportedFeature {
                        message: String::from("void is not a value type"),
                    },
                    Position::null(),
                ))
            }
        })
    }

    fn byte_pointer_type(&self) -> inkwell::types::PointerType<'ctx> {
        self.context.i8_type().ptr_type(AddressSpace::default())
    }

    fn function_type(&self, prototype: &Prototype) -> Result<FunctionType<'ctx>, Error> {
        let params = prototype
            .parameter_types
            .iter()
            .map(|ty| self.convert_type(ty).map(BasicMetadataTypeEnum::from))
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(match &prototype.return_type {
            Type::Void => self.context.void_type().fn_type(&params, prototype.is_variadic),
            ty => self.convert_type(ty)?.fn_type(&params, prototype.is_variadic),
        })
    }

    fn current_function(&self) -> Result<FunctionValue<'ctx>, Error> {
        self.current_function
            .ok_or_else(|| Error::backend("no function is being lowered"))
    }

    fn get_function(&self, name: &str) -> Result<FunctionValue<'ctx>, Error> {
        self.module
            .get_function(name)
            .ok_or_else(|| Error::backend(format!("function `{}` was never declared", name)))
    }

    /// Sets the host triple and data layout on the module.
    fn set_target(&self) -> Result<(), Error> {
        Target::initialize_native(&InitializationConfig::default()).map_err(Error::backend)?;

        let target_triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&target_triple)
            .map_err(|e| Error::backend(e.to_string_lossy().into_owned()))?;
        let target_machine = target
            .create_target_machine(
                &target_triple,
                "generic",
                "",
                OptimizationLevel::Default,
                RelocMode::PIC,
                CodeModel::Default,
            )
            .ok_or_else(|| Error::backend("failed to create a target machine for the host"))?;

        self.module.set_triple(&target_triple);
        self.module
            .set_data_layout(&target_machine.get_target_data().get_data_layout());

        Ok(())
    }
}

fn builder_error(error: BuilderError) -> Error {
    Error::backend(error.to_string())
}

impl<'ctx> Emitter for IrEmitter<'ctx> {
    type Value = BasicValueEnum<'ctx>;
    type Slot = PointerValue<'ctx>;
    type Output = Module<'ctx>;

    fn declare_function(&mut self, name: &str, prototype: &Prototype) -> Result<(), Error> {
        let function_type = self.function_type(prototype)?;
        self.module
            .add_function(name, function_type, Some(Linkage::External));

        Ok(())
    }

    fn begin_function(&mut self, name: &str, _prototype: &Prototype) -> Result<Vec<Self::Value>, Error> {
        let function = self.get_function(name)?;

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);
        self.current_function = Some(function);

        Ok(function.get_params())
    }

    fn end_function(&mut self) -> Result<(), Error> {
        self.current_function()?;
        self.current_function = None;
        Ok(())
    }

    fn const_int(&mut self, value: i32) -> Result<Self::Value, Error> {
        Ok(self.context.i32_type().const_int(value as u64, true).into())
    }

    fn const_float(&mut self, value: f64) -> Result<Self::Value, Error> {
        Ok(self.context.f64_type().const_float(value).into())
    }

    fn convert(&mut self, value: &Lowered<Self::Value>, to: &Type) -> Result<Self::Value, Error> {
        let converted: BasicValueEnum<'ctx> = match (&value.ty, to) {
            (from, Type::F32 | Type::F64) if from.is_integer() => {
                let float_type = self.convert_type(to)?.into_float_type();
                self.builder
                    .build_signed_int_to_float(value.value.into_int_value(), float_type, "sitofp")
                    .map_err(builder_error)?
                    .into()
            }
            (Type::I32, Type::I64) => self
                .builder
                .build_int_s_extend(value.value.into_int_value(), self.context.i64_type(), "sext")
                .map_err(builder_error)?
                .into(),
            (Type::F32, Type::F64) => self
                .builder
                .build_float_ext(value.value.into_float_value(), self.context.f64_type(), "fpext")
                .map_err(builder_error)?
                .into(),
            (from, to) if from.is_pointer() && to.is_pointer() => {
                let target = self.convert_type(to)?.into_pointer_type();
                self.builder
                    .build_pointer_cast(value.value.into_pointer_value(), target, "ptrcast")
                    .map_err(builder_error)?
                    .into()
            }
            (from, to) => {
                return Err(Error::backend(format!("cannot convert {} to {}", from, to)))
            }
        };

        Ok(converted)
    }

    fn int_binary(&mut self, op: BinaryOp, left: Self::Value, right: Self::Value) -> Result<Self::Value, Error> {
        let (left, right) = (left.into_int_value(), right.into_int_value());

        let result = match op {
            BinaryOp::Add => self.builder.build_int_add(left, right, "addtmp"),
            BinaryOp::Sub => self.builder.build_int_sub(left, right, "subtmp"),
            BinaryOp::Mul => self.builder.build_int_mul(left, right, "multmp"),
            BinaryOp::Div => self.builder.build_int_signed_div(left, right, "divtmp"),
        };

        Ok(result.map_err(builder_error)?.into())
    }

    fn float_binary(&mut self, op: BinaryOp, left: Self::Value, right: Self::Value) -> Result<Self::Value, Error> {
        let (left, right) = (left.into_float_value(), right.into_float_value());

        let result = match op {
            BinaryOp::Add => self.builder.build_float_add(left, right, "faddtmp"),
            BinaryOp::Sub => self.builder.build_float_sub(left, right, "fsubtmp"),
            BinaryOp::Mul => self.builder.build_float_mul(left, right, "fmultmp"),
            BinaryOp::Div => self.builder.build_float_div(left, right, "fdivtmp"),
        };

        Ok(result.map_err(builder_error)?.into())
    }

    fn global_string(&mut self, label: &str, bytes: &[u8]) -> Result<Self::Value, Error> {
        let global = match self.module.get_global(label) {
            Some(global) => global,
            None => {
                let value = self.context.const_string(bytes, true);
                let global = self
                    .module
                    .add_global(value.get_type(), Some(AddressSpace::default()), label);
                global.set_initializer(&value);
                global.set_constant(true);
                global.set_linkage(Linkage::Private);
                global.set_unnamed_addr(true);
                global
            }
        };

        let pointer = self
            .builder
            .build_pointer_cast(global.as_pointer_value(), self.byte_pointer_type(), "str")
            .map_err(builder_error)?;

        Ok(pointer.into())
    }

    fn alloc_local(&mut self, name: &str, ty: &Type) -> Result<Self::Slot, Error> {
        let function = self.current_function()?;
        let entry = function
            .get_first_basic_block()
            .ok_or_else(|| Error::backend(format!("function `{}` has no entry block", name)))?;

        // Allocas go to the top of the entry block so they dominate every use
        let builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(instruction) => builder.position_before(&instruction),
            None => builder.position_at_end(entry),
        }

        builder
            .build_alloca(self.convert_type(ty)?, name)
            .map_err(builder_error)
    }

    fn store(&mut self, slot: &Self::Slot, value: &Lowered<Self::Value>) -> Result<(), Error> {
        self.builder
            .build_store(*slot, value.value)
            .map_err(builder_error)?;

        Ok(())
    }

    fn load(&mut self, slot: &Self::Slot, _ty: &Type, name: &str) -> Result<Self::Value, Error> {
        self.builder.build_load(*slot, name).map_err(builder_error)
    }

    fn call(
        &mut self,
        name: &str,
        prototype: &Prototype,
        arguments: &[Lowered<Self::Value>],
    ) -> Result<Option<Self::Value>, Error> {
        let function = self.get_function(name)?;

        let args: Vec<BasicMetadataValueEnum<'ctx>> =
            arguments.iter().map(|arg| arg.value.into()).collect();

        let call_name = if prototype.return_type.is_void() { "" } else { "calltmp" };
        let call = self
            .builder
            .build_call(function, &args, call_name)
            .map_err(builder_error)?;

        Ok(call.try_as_basic_value().left())
    }

    fn ret(&mut self, value: Option<&Lowered<Self::Value>>) -> Result<(), Error> {
        match value {
            Some(value) => self.builder.build_return(Some(&value.value)),
            None => self.builder.build_return(None),
        }
        .map_err(builder_error)?;

        Ok(())
    }

    fn begin_unreachable(&mut self) -> Result<(), Error> {
        let function = self.current_function()?;

        let block = self.context.append_basic_block(function, "unreachable");
        self.builder.position_at_end(block);

        Ok(())
    }

    fn end_unreachable(&mut self) -> Result<(), Error> {
        self.builder.build_unreachable().map_err(builder_error)?;
        Ok(())
    }

    /// Sets the target and runs the module verifier.
    fn finish(self) -> Result<Self::Output, Error> {
        self.set_target()?;

        self.module
            .verify()
            .map_err(|e| Error::backend(e.to_string_lossy().into_owned()))?;

        Ok(self.module)
    }
}
