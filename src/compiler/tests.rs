//! Unit tests for the compiler module.
//!
//! This module contains tests for:
//! - Prototype registration and resolution
//! - FNV-1a hashing and string interning
//! - The shared lowering rules, observed through both backends
//! - Native calling-convention placement

use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::{
    compiler::{compile, Backend, CompileOptions, EmittedModule},
    prototypes::{Prototype, PrototypeTable},
    strings::{fnv1a, StringPool},
};
use crate::{
    ast::types::Type,
    errors::errors::{Error, ErrorImpl},
    parser::parser::parse,
};

fn options(backend: Backend) -> CompileOptions {
    CompileOptions {
        backend,
        module_name: String::from("test.b"),
    }
}

fn ir(source: &str) -> String {
    match compile(source, &options(Backend::Llvm)) {
        Ok(EmittedModule::Ir(text)) => text,
        other => panic!("expected IR, got {:?}", other),
    }
}

fn assembly(source: &str) -> String {
    match compile(source, &options(Backend::Native)) {
        Ok(EmittedModule::Assembly(text)) => text,
        other => panic!("expected assembly, got {:?}", other),
    }
}

/// Compiles with both backends and checks they fail with the same error.
fn compile_error(source: &str) -> Error {
    let llvm = compile(source, &options(Backend::Llvm)).unwrap_err();
    let native = compile(source, &options(Backend::Native)).unwrap_err();

    assert_eq!(llvm.get_error(), native.get_error());
    llvm
}

fn table(source: &str) -> Result<PrototypeTable, Error> {
    let program = parse(source.to_string(), Rc::new(String::from("test.b")))?;
    PrototypeTable::build(&program)
}

#[test]
fn test_prototype_table_forward_reference() {
    let table = table("i32 main() { return helper(); } i32 helper() { return 1; }").unwrap();

    assert_eq!(table.len(), 2);
    assert!(table.get("helper").unwrap().has_body);
}

#[test]
fn test_prototype_table_extern_redeclaration_overwrites() {
    let table = table("extrn i32 f(i32); extrn i64 f(ptr, ...);").unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(
        table.get("f"),
        Some(&Prototype {
            return_type: Type::I64,
            parameter_types: vec![Type::Ptr],
            is_variadic: true,
            has_body: false,
        })
    );
}

#[test]
fn test_prototype_table_definition_after_extern() {
    let table = table("extrn i32 f(i32); i32 f(i32) { return %1; }").unwrap();

    assert!(table.get("f").unwrap().has_body);
}

#[test]
fn test_prototype_table_redefinition() {
    let error = table("i32 f() { return 1; } i32 f() { return 2; }").unwrap_err();

    assert_eq!(
        error.get_error(),
        &ErrorImpl::RedefinitionError {
            function: String::from("f")
        }
    );
}

#[test]
fn test_prototype_table_registration_order() {
    let table = table("i32 b() { return 0; } extrn void a(); i32 c() { return 0; }").unwrap();

    let names: Vec<&str> = table.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_prototype_table_rejects_void_parameter() {
    let error = table("extrn i32 f(void);").unwrap_err();

    assert_eq!(error.get_error_name(), "UnsupportedFeature");
}

#[test]
fn test_fnv1a_known_values() {
    assert_eq!(fnv1a(b""), 2166136261);
    assert_eq!(fnv1a(b"a"), 0xe40c292c);
    assert_eq!(fnv1a(b"foobar"), 0xbf9cf968);
}

#[test]
fn test_string_pool_deduplicates() {
    let mut pool = StringPool::new();

    let first = pool.intern("hello");
    let second = pool.intern("world");
    let again = pool.intern("hello");

    assert_eq!(first, format!("str.{}", fnv1a(b"hello")));
    assert_eq!(first, again);
    assert_ne!(first, second);
    assert_eq!(pool.len(), 2);
}

#[test]
fn test_ir_integer_add() {
    let text = ir("i32 add(i32, i32) { return %1 + %2; }");

    assert!(text.contains("define i32 @add(i32 %0, i32 %1)"), "{}", text);
    assert!(text.contains("add i32 %0, %1"), "{}", text);
}

#[test]
fn test_ir_integer_division_is_signed() {
    let text = ir("i32 f(i32, i32) { return %1 / %2; }");

    assert!(text.contains("sdiv i32 %0, %1"), "{}", text);
}

#[test]
fn test_ir_mixed_operands_promote_to_double() {
    let text = ir("f64 f(i32) { return %1 + 2.5; }");

    assert!(text.contains("sitofp i32 %0 to double"), "{}", text);
    assert!(text.contains("fadd double"), "{}", text);
}

#[test]
fn test_ir_f32_operands_extend_to_double() {
    let text = ir("f64 f(f32, f32) { return %1 * %2; }");

    assert!(text.contains("fpext float %0 to double"), "{}", text);
    assert!(text.contains("fmul double"), "{}", text);
}

#[test]
fn test_ir_number_typing_is_value_based() {
    let text = ir("i32 f() { return 42; } f64 g() { return 2.5; } i32 h() { return 2.0; }");

    assert!(text.contains("ret i32 42"), "{}", text);
    assert!(text.contains("ret double 2.500000e+00"), "{}", text);
    assert!(text.contains("ret i32 2"), "{}", text);
}

#[test]
fn test_ir_return_value_coerced() {
    let text = ir("f64 f() { return 1; } i64 g(i32) { return %1; }");

    assert!(text.contains("ret double 1.000000e+00"), "{}", text);
    assert!(text.contains("sext i32 %0 to i64"), "{}", text);
}

#[test]
fn test_ir_string_literals_share_storage() {
    let source = r#"
        extrn i32 puts(ptr);
        i32 first() { puts("hello"); return 0; }
        i32 second() { puts("hello"); puts("bye"); return 0; }
    "#;
    let text = ir(source);

    let definitions = text.matches("private unnamed_addr constant").count();
    assert_eq!(definitions, 2, "{}", text);
    assert!(text.contains(&format!("@str.{}", fnv1a(b"hello"))), "{}", text);
    assert!(text.contains(&format!("@str.{}", fnv1a(b"bye"))), "{}", text);
}

#[test]
fn test_ir_string_escapes_resolved() {
    let text = ir(r#"extrn i32 puts(ptr); i32 main() { puts("a\tb\n"); return 0; }"#);

    assert!(text.contains(r#"c"a\09b\0A\00""#), "{}", text);
}

#[test]
fn test_ir_variadic_extern() {
    let source = r#"
        extrn i32 printf(ptr, ...);
        i32 main() { printf("%d %f\n", 1, 2.5); return 0; }
    "#;
    let text = ir(source);

    assert!(text.contains("declare i32 @printf(i8*, ...)"), "{}", text);
    assert!(text.contains("i32 1, double 2.500000e+00"), "{}", text);
}

#[test]
fn test_ir_call_arguments_coerced() {
    let text = ir("i64 id(i64) { return %1; } i32 main() { id(7); return 0; }");

    assert!(text.contains("call i64 @id(i64 7)"), "{}", text);
}

#[test]
fn test_ir_void_function_gets_implicit_return() {
    let text = ir("void f() { }");

    assert!(text.contains("ret void"), "{}", text);
}

#[test]
fn test_ir_local_variables_allocated_in_entry() {
    let text = ir("i32 main() { { i32 x = 5; } f64 y = 1.5; return x; }");

    assert!(text.contains("alloca i32"), "{}", text);
    assert!(text.contains("alloca double"), "{}", text);
    assert!(text.contains("store i32 5"), "{}", text);
    assert!(text.contains("load i32, i32* %x"), "{}", text);
}

#[test]
fn test_ir_pointer_types() {
    let text = ir("extrn ptr malloc(i64); extrn void take(i32*, f64**, void*);");

    assert!(text.contains("declare i8* @malloc(i64)"), "{}", text);
    assert!(text.contains("declare void @take(i32*, double**, i8*)"), "{}", text);
}

#[test]
fn test_ir_statements_after_return_are_unreachable() {
    let text = ir("i32 main() { return 0; i32 x = 2; }");

    assert!(text.contains("unreachable:"), "{}", text);
    assert!(text.contains("store i32 2"), "{}", text);
    assert!(text.contains("  unreachable\n"), "{}", text);
}

#[test]
fn test_ir_untyped_pointers_convert() {
    let source = r#"
        extrn ptr malloc(i64);
        extrn void free(void*);
        extrn i32 fill(i32*);
        i32 main() { free(malloc(8)); return fill(malloc(4)); }
    "#;
    let text = ir(source);

    assert!(text.contains("call void @free(i8* %calltmp)"), "{}", text);
    assert!(text.contains("bitcast i8* %calltmp1 to i32*"), "{}", text);
}

#[test]
fn test_native_stack_parameters() {
    let source = "i32 f(i32, i32, i32, i32, i32, i32, i32, i32) { return %7 + %8; }";
    let text = assembly(source);

    assert!(text.contains("movl 16(%rbp), %eax"), "{}", text);
    assert!(text.contains("movl 24(%rbp), %ecx"), "{}", text);
    assert!(text.contains("addl %ecx, %eax"), "{}", text);
}

#[test]
fn test_native_register_parameters_spilled() {
    let text = assembly("i64 f(i32, i64, ptr) { return %2; }");

    assert!(text.contains("movl %edi, -8(%rbp)"), "{}", text);
    assert!(text.contains("movq %rsi, -16(%rbp)"), "{}", text);
    assert!(text.contains("movq %rdx, -24(%rbp)"), "{}", text);
    assert!(text.contains("subq $32, %rsp"), "{}", text);
}

#[test]
fn test_native_empty_frame() {
    let text = assembly("i32 main() { return 0; }");

    assert!(!text.contains("subq"), "{}", text);
    assert!(text.contains("pushq %rbp"), "{}", text);
    assert!(text.contains("movl $0, %eax"), "{}", text);
    assert!(text.contains("jmp .L.return.main"), "{}", text);
    assert!(text.contains(".L.return.main:"), "{}", text);
}

#[test]
fn test_native_single_exit_label() {
    let text = assembly("i32 f(i32) { { return %1; } }");

    assert_eq!(text.matches(".L.return.f:").count(), 1);
    assert_eq!(text.matches("    ret\n").count(), 1);
}

#[test]
fn test_native_stack_arguments_pushed_in_reverse() {
    let source = r#"
        i32 f(i32, i32, i32, i32, i32, i32, i32, i32) { return %8; }
        i32 main() { return f(1, 2, 3, 4, 5, 6, 7, 8); }
    "#;
    let text = assembly(source);

    let push_eight = text.find("movl $8, %eax").unwrap();
    let push_seven = text.find("movl $7, %eax").unwrap();
    assert!(push_eight < push_seven);
    assert!(text.contains("movl $1, %edi"), "{}", text);
    assert!(text.contains("movl $6, %r9d"), "{}", text);
    assert!(text.contains("call f\n"), "{}", text);
    assert!(text.contains("addq $16, %rsp"), "{}", text);
}

#[test]
fn test_native_odd_stack_arguments_padded() {
    let source = r#"
        extrn i32 g(i32, i32, i32, i32, i32, i32, i32);
        i32 main() { return g(1, 2, 3, 4, 5, 6, 7); }
    "#;
    let text = assembly(source);

    assert!(text.contains("subq $8, %rsp"), "{}", text);
    assert!(text.contains("call g@PLT"), "{}", text);
    assert!(text.contains("addq $16, %rsp"), "{}", text);
}

#[test]
fn test_native_division_sign_extends() {
    let text = assembly("i32 f(i32, i32) { return %1 / %2; }");

    let cltd = text.find("cltd").unwrap();
    let idiv = text.find("idivl %ecx").unwrap();
    assert!(cltd < idiv);
}

#[test]
fn test_native_strings_after_code() {
    let source = r#"
        extrn i32 printf(ptr, ...);
        i32 main() { printf("hi"); printf("hi"); return 0; }
    "#;
    let text = assembly(source);
    let label = format!("str.{}", fnv1a(b"hi"));

    assert!(text.contains(&format!("leaq {}(%rip), %rdi", label)), "{}", text);
    assert!(text.contains("xorl %eax, %eax"), "{}", text);
    assert!(text.contains("call printf@PLT"), "{}", text);
    assert_eq!(text.matches(&format!("{}:", label)).count(), 1);
    assert!(text.contains(".byte 104,105,0"), "{}", text);

    let rodata = text.find(".section .rodata").unwrap();
    let ret = text.find("    ret\n").unwrap();
    assert!(ret < rodata);
}

#[test]
fn test_native_float_return() {
    let text = assembly("f64 f() { return 1.5; } f64 g(i32) { return %1 * 2.5; }");

    assert!(text.contains("movsd .LF0(%rip), %xmm0"), "{}", text);
    assert!(text.contains("cvtsi2sdl %eax, %xmm0"), "{}", text);
    assert!(text.contains("mulsd %xmm1, %xmm0"), "{}", text);
    assert!(text.contains(&format!(".quad 0x{:016x}", 1.5f64.to_bits())), "{}", text);
}

#[test]
fn test_native_float_parameters_spilled() {
    let text = assembly("f64 half(i32, f64, f32) { return %2 / 2; }");

    assert!(text.contains("movl %edi, -8(%rbp)"), "{}", text);
    assert!(text.contains("movsd %xmm0, -16(%rbp)"), "{}", text);
    assert!(text.contains("movss %xmm1, -24(%rbp)"), "{}", text);
    assert!(text.contains("divsd %xmm1, %xmm0"), "{}", text);
}

#[test]
fn test_native_float_stack_parameters() {
    let source = "f64 f(f64, f64, f64, f64, f64, f64, f64, f64, f64, i32) { return %9; }";
    let text = assembly(source);

    // The ninth float overflows to the stack, the integer still gets %edi
    assert!(text.contains("movsd %xmm7, -64(%rbp)"), "{}", text);
    assert!(text.contains("movl %edi, -72(%rbp)"), "{}", text);
    assert!(text.contains("movsd 16(%rbp), %xmm0"), "{}", text);
}

#[test]
fn test_native_variadic_float_arguments() {
    let source = r#"
        extrn i32 printf(ptr, ...);
        i32 main() { printf("%f %d", 1.5, 2); return 0; }
    "#;
    let text = assembly(source);

    assert!(text.contains("movsd .LF0(%rip), %xmm0"), "{}", text);
    assert!(text.contains("movl $2, %esi"), "{}", text);
    assert!(text.contains("movl $1, %eax"), "{}", text);
    assert!(!text.contains("xorl %eax, %eax"), "{}", text);
}

#[test]
fn test_native_float_call_arguments() {
    let source = "f64 scale(f64, i32) { return %1 * %2; } f64 main() { return scale(2.5, 3); }";
    let text = assembly(source);

    assert!(text.contains("movsd .LF0(%rip), %xmm0"), "{}", text);
    assert!(text.contains("movl $3, %edi"), "{}", text);
    assert!(text.contains("call scale\n"), "{}", text);
    assert!(text.contains("movsd %xmm0, "), "{}", text);
}

#[test]
fn test_native_statements_after_return_are_unreachable() {
    let text = assembly("i32 main() { return 0; i32 x = 2; return x; }");

    assert!(text.contains(".L.unreachable.main.0:"), "{}", text);
    assert_eq!(text.matches("jmp .L.return.main").count(), 2);
}

#[test]
fn test_unknown_function() {
    let error = compile_error("i32 main() { return foo(); }");

    assert_eq!(
        error.get_error(),
        &ErrorImpl::UnknownFunction {
            function: String::from("foo")
        }
    );
    assert_eq!(error.get_position().0, 20);
}

#[test]
fn test_missing_return() {
    let error = compile_error("i32 f() { }");

    assert_eq!(
        error.get_error(),
        &ErrorImpl::MissingReturn {
            function: String::from("f")
        }
    );
}

#[test]
fn test_bare_return_in_non_void_function() {
    let error = compile_error("i32 f() { return; }");

    assert_eq!(error.get_error_name(), "MissingReturn");
}

#[test]
fn test_invalid_return() {
    let error = compile_error("void f() { return 1; }");

    assert_eq!(
        error.get_error(),
        &ErrorImpl::InvalidReturn {
            function: String::from("f")
        }
    );
}

#[test]
fn test_pointer_plus_integer_mismatch() {
    let error = compile_error(r#"i32 main() { return "abc" + 1; }"#);

    assert_eq!(
        error.get_error(),
        &ErrorImpl::TypeMismatch {
            expected: String::from("i32"),
            received: String::from("ptr"),
        }
    );
}

#[test]
fn test_i64_operands_mismatch() {
    let error = compile_error("i64 f(i64, i64) { return %1 + %2; }");

    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_positional_param_out_of_range() {
    for source in ["i32 f(i32) { return %2; }", "i32 f(i32) { return %0; }"] {
        let error = compile_error(source);
        assert_eq!(error.get_error_name(), "UnknownIdentifier", "{}", source);
    }
}

#[test]
fn test_unknown_variable() {
    let error = compile_error("i32 main() { return x; }");

    assert_eq!(
        error.get_error(),
        &ErrorImpl::UnknownIdentifier {
            name: String::from("x")
        }
    );
}

#[test]
fn test_variable_already_declared() {
    let error = compile_error("i32 main() { i32 x = 1; { i32 x = 2; } return x; }");

    assert_eq!(
        error.get_error(),
        &ErrorImpl::VariableAlreadyDeclared {
            name: String::from("x")
        }
    );
}

#[test]
fn test_initializer_must_match_exactly() {
    let error = compile_error("i32 main() { i64 x = 1; return 0; }");

    assert_eq!(
        error.get_error(),
        &ErrorImpl::TypeMismatch {
            expected: String::from("i64"),
            received: String::from("i32"),
        }
    );
}

#[test]
fn test_initializer_cannot_read_itself() {
    let error = compile_error("i32 main() { i32 x = x; return 0; }");

    assert_eq!(error.get_error_name(), "UnknownIdentifier");
}

#[test]
fn test_argument_count_checked() {
    let error = compile_error("i32 f(i32) { return %1; } i32 main() { return f(); }");

    assert_eq!(
        error.get_error(),
        &ErrorImpl::ArgumentCountMismatch {
            function: String::from("f"),
            expected: 1,
            received: 0,
        }
    );

    let error = compile_error("extrn i32 printf(ptr, ...); i32 main() { return printf(); }");
    assert_eq!(error.get_error_name(), "ArgumentCountMismatch");
}

#[test]
fn test_argument_type_checked() {
    let error = compile_error("extrn i32 puts(ptr); i32 main() { return puts(1); }");

    assert_eq!(
        error.get_error(),
        &ErrorImpl::TypeMismatch {
            expected: String::from("ptr"),
            received: String::from("i32"),
        }
    );
}

#[test]
fn test_statements_after_return_are_checked() {
    let error = compile_error("void f() { return; return 1; }");
    assert_eq!(error.get_error_name(), "InvalidReturn");

    let error = compile_error("i32 f() { return 1; undefined(); }");
    assert_eq!(error.get_error_name(), "UnknownFunction");

    let error = compile_error(r#"i32 f() { return 1; i32 x = "s"; }"#);
    assert_eq!(error.get_error_name(), "TypeMismatch");

    let error = compile_error("i32 f() { { return 1; } return y; }");
    assert_eq!(error.get_error_name(), "UnknownIdentifier");
}

#[test]
fn test_untyped_pointers_accept_any_pointer() {
    let source = r#"
        extrn ptr malloc(i64);
        extrn void free(void*);
        extrn i32 puts(void*);
        i32 main() { free(malloc(8)); return puts("hi"); }
    "#;

    for backend in [Backend::Llvm, Backend::Native] {
        assert!(compile(source, &options(backend)).is_ok());
    }

    // Typed pointers still have to agree
    let error = compile_error("extrn void take(i32*); void f(f64*) { take(%1); }");
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_void_call_has_no_value() {
    let error = compile_error("void g() { } i32 main() { return g(); }");

    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_redefinition_through_compile() {
    let error = compile_error("void f() { } void f() { }");

    assert_eq!(error.get_error_name(), "RedefinitionError");
}

#[test]
fn test_syntax_error_through_compile() {
    let error = compile_error("i32 main() { return (1; }");

    assert_eq!(
        error.get_error(),
        &ErrorImpl::SyntaxError {
            message: String::from("Expected ')' after expression"),
            token: String::from(";"),
        }
    );
}

#[test]
fn test_emitted_module_extension() {
    let source = "i32 main() { return 0; }";

    assert_eq!(ir_module(source, Backend::Llvm).extension(), "ll");
    assert_eq!(ir_module(source, Backend::Native).extension(), "s");
}

fn ir_module(source: &str, backend: Backend) -> EmittedModule {
    compile(source, &options(backend)).unwrap()
}
