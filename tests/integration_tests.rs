//! Integration tests for end-to-end compilation.
//!
//! These tests drive the whole pipeline from source text through parsing and
//! lowering, then execute the LLVM module in the JIT or assemble the native
//! output with the system toolchain when one is available.

use std::{fs, path::PathBuf, process::Command, rc::Rc};

use bcc::{
    compiler::compiler::{compile, compile_to_module, Backend, CompileOptions},
    errors::errors::ErrorImpl,
    parser::parser::parse,
};
use inkwell::{context::Context, execution_engine::JitFunction, OptimizationLevel};

type MainFn = unsafe extern "C" fn() -> i32;

fn run_jit(source: &str) -> i32 {
    let program = parse(source.to_string(), Rc::new(String::from("test.b"))).unwrap();

    let context = Context::create();
    let module = compile_to_module(&program, &context, "test").unwrap();
    let engine = module
        .create_jit_execution_engine(OptimizationLevel::None)
        .unwrap();

    unsafe {
        let main: JitFunction<MainFn> = engine.get_function("main").unwrap();
        main.call()
    }
}

fn native(source: &str) -> String {
    let options = CompileOptions {
        backend: Backend::Native,
        module_name: String::from("test.b"),
    };

    compile(source, &options).unwrap().text().to_string()
}

#[test]
fn test_jit_add_through_main() {
    let source = r#"
        i32 add(i32, i32) { return %1 + %2; }
        i32 main() { return add(2, 3); }
    "#;

    assert_eq!(run_jit(source), 5);
}

#[test]
fn test_jit_precedence_and_locals() {
    let source = r#"
        i32 main() {
            i32 x = 2 + 3 * 4;
            i32 y = (x - 4) / 2;
            return y;
        }
    "#;

    assert_eq!(run_jit(source), 5);
}

#[test]
fn test_jit_stack_parameters() {
    let source = r#"
        i32 pick(i32, i32, i32, i32, i32, i32, i32, i32) { return %7 * 10 + %8; }
        i32 main() { return pick(1, 2, 3, 4, 5, 6, 7, 8); }
    "#;

    assert_eq!(run_jit(source), 78);
}

#[test]
fn test_jit_forward_reference() {
    let source = r#"
        i32 main() { return twice(21); }
        i32 twice(i32) { return %1 * 2; }
    "#;

    assert_eq!(run_jit(source), 42);
}

#[test]
fn test_native_reads_stack_parameters() {
    let assembly = native(
        "i32 pick(i32, i32, i32, i32, i32, i32, i32, i32) { return %7 + %8; }",
    );

    assert!(assembly.contains("movl 16(%rbp), %eax"));
    assert!(assembly.contains("movl 24(%rbp), %ecx"));
    assert!(assembly.contains(".L.return.pick:"));
}

#[test]
fn test_native_output_layout() {
    let assembly = native(
        r#"
        extrn i32 puts(ptr);
        i32 main() { puts("hi"); return 0; }
        "#,
    );

    let text = assembly.find(".text").unwrap();
    let rodata = assembly.find(".section .rodata").unwrap();
    let note = assembly.find(".note.GNU-stack").unwrap();

    assert!(text < rodata);
    assert!(rodata < note);
    assert!(assembly.contains("call puts@PLT"));
}

/// Assembles and links `source` with the system `cc` and runs it, returning
/// the exit status and standard output.
///
/// Returns `None` when no C toolchain is installed.
fn build_and_run(name: &str, source: &str) -> Option<(i32, String)> {
    let dir = std::env::temp_dir().join(format!("bcc_native_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let assembly_path: PathBuf = dir.join(format!("{}.s", name));
    let binary_path: PathBuf = dir.join(name);
    fs::write(&assembly_path, native(source)).unwrap();

    let built = match Command::new("cc")
        .arg("-o")
        .arg(&binary_path)
        .arg(&assembly_path)
        .status()
    {
        Ok(status) => status.success(),
        Err(_) => {
            let _ = fs::remove_dir_all(&dir);
            return None;
        }
    };
    assert!(built, "cc rejected the generated assembly");

    let output = Command::new(&binary_path).output().unwrap();
    let _ = fs::remove_dir_all(&dir);

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    output.status.code().map(|code| (code, stdout))
}

#[test]
fn test_native_build_and_run() {
    let source = r#"
        i32 add(i32, i32) { return %1 + %2; }
        i32 main() { return add(2, 3); }
    "#;

    if let Some((code, _)) = build_and_run("add", source) {
        assert_eq!(code, 5);
    }
}

#[test]
fn test_native_stack_parameters_at_runtime() {
    let source = r#"
        i32 pick(i32, i32, i32, i32, i32, i32, i32, i32) { return %7 * 10 + %8; }
        i32 main() { return pick(1, 2, 3, 4, 5, 6, 7, 8); }
    "#;

    if let Some((code, _)) = build_and_run("pick", source) {
        assert_eq!(code, 78);
    }
}

#[test]
fn test_native_float_parameters_at_runtime() {
    let source = r#"
        extrn i32 printf(ptr, ...);
        f64 half(f64) { return %1 / 2; }
        i32 main() { printf("%.2f %d\n", half(9), 7); return 0; }
    "#;

    if let Some((code, stdout)) = build_and_run("half", source) {
        assert_eq!(code, 0);
        assert_eq!(stdout, "4.50 7\n");
    }
}

#[test]
fn test_errors_are_reported_by_both_backends() {
    let cases = [
        ("i32 main() { return foo(); }", "UnknownFunction"),
        ("i32 main() { return x; }", "UnknownIdentifier"),
        ("i32 main() { i32 x = 1; i32 x = 2; return x; }", "VariableAlreadyDeclared"),
        ("i32 main() { }", "MissingReturn"),
        ("void main() { return 1; }", "InvalidReturn"),
        ("i32 f() { return 1; } i32 f() { return 2; }", "RedefinitionError"),
        ("i32 main() { return %1; }", "UnknownIdentifier"),
        ("void f() { return; return 1; }", "InvalidReturn"),
        ("i32 f() { return 1; undefined(); }", "UnknownFunction"),
    ];

    for (source, expected) in cases {
        for backend in [Backend::Llvm, Backend::Native] {
            let options = CompileOptions {
                backend,
                module_name: String::from("test.b"),
            };

            let error = compile(source, &options).unwrap_err();
            assert_eq!(error.get_error_name(), expected, "{}", source);
        }
    }
}

#[test]
fn test_argument_count_mismatch() {
    let source = r#"
        extrn i32 printf(ptr, ...);
        i32 main() { printf(); return 0; }
    "#;

    let error = compile(source, &CompileOptions::default()).unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::ArgumentCountMismatch {
            expected: 1,
            received: 0,
            ..
        }
    ));
}
