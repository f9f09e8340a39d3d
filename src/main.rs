//! bcc command-line driver.
//!
//! Reads one source file, compiles it with the selected backend and hands the
//! result to the system toolchain (`clang` for IR, `cc` for assembly).

use std::{
    fs,
    path::{Path, PathBuf},
    process::{self, Command},
    rc::Rc,
    time::Instant,
};

use anyhow::{anyhow, bail, Context as _};
use bcc::{
    compiler::compiler::{compile_program, Backend, CompileOptions},
    display_error,
    parser::parser::parse,
};
use clap::Parser;
use colored::Colorize;

#[derive(Parser)]
#[command(name = "bcc")]
#[command(version)]
#[command(about = "Compiler for a small B-like language", long_about = None)]
struct Cli {
    /// Input source file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output path (default: input file stem)
    #[arg(short = 'o', long = "out", value_name = "PATH")]
    out: Option<PathBuf>,

    /// Code generation backend
    #[arg(long, value_enum, default_value_t = Backend::Llvm)]
    backend: Backend,

    /// Write the IR or assembly text and stop
    #[arg(long = "emit-only-ir", visible_alias = "ir")]
    emit_only_ir: bool,

    /// Produce an object file without linking
    #[arg(short = 'C', long = "compile-only")]
    compile_only: bool,

    /// Run the built executable and exit with its status
    #[arg(long)]
    run: bool,

    /// Keep intermediate files
    #[arg(long = "no-cleanup")]
    no_cleanup: bool,

    /// Print phase timings to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Prints the elapsed time of a phase in `--verbose` mode.
struct Timings {
    verbose: bool,
}

impl Timings {
    fn report(&self, phase: &str, start: Instant) {
        if self.verbose {
            eprintln!("{} in {:?}", phase, start.elapsed());
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(Some(status)) => process::exit(status),
        Ok(None) => Ok(()),
        Err(error) => {
            eprintln!("{}: {:#}", "error".red().bold(), error);
            process::exit(1);
        }
    }
}

/// Returns the exit status of the built program when `--run` was given.
fn run(cli: &Cli) -> anyhow::Result<Option<i32>> {
    let timings = Timings {
        verbose: cli.verbose,
    };
    let start = Instant::now();

    let file_name = cli.input.to_string_lossy().into_owned();
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("could not read '{}'", cli.input.display()))?;

    let parse_start = Instant::now();
    let program = match parse(source.clone(), Rc::new(file_name.clone())) {
        Ok(program) => program,
        Err(error) => {
            display_error(&error, &source, &file_name);
            bail!("compilation failed");
        }
    };
    timings.report("Parsed", parse_start);

    let options = CompileOptions {
        backend: cli.backend,
        module_name: file_name.clone(),
    };

    let compile_start = Instant::now();
    let module = match compile_program(&program, &options) {
        Ok(module) => module,
        Err(error) => {
            display_error(&error, &source, &file_name);
            bail!("compilation failed");
        }
    };
    timings.report("Compiled", compile_start);

    let output = cli.out.clone().unwrap_or_else(|| default_output(&cli.input));
    let text_path = output.with_extension(module.extension());

    if cli.emit_only_ir {
        let path = cli.out.clone().unwrap_or(text_path);
        fs::write(&path, module.text())
            .with_context(|| format!("could not write '{}'", path.display()))?;
        timings.report("Total time", start);
        return Ok(None);
    }

    fs::write(&text_path, module.text())
        .with_context(|| format!("could not write '{}'", text_path.display()))?;

    let toolchain = match cli.backend {
        Backend::Llvm => "clang",
        Backend::Native => "cc",
    };

    let toolchain_start = Instant::now();
    let result = if cli.compile_only {
        let object = output.with_extension("o");
        invoke(toolchain, &["-c", "-o"], &object, &text_path)
    } else {
        invoke(toolchain, &["-o"], &output, &text_path)
    };
    timings.report("Assembled and linked", toolchain_start);

    if !cli.no_cleanup {
        let _ = fs::remove_file(&text_path);
    }
    result?;

    timings.report("Total time", start);

    if cli.run && !cli.compile_only {
        let executable = absolute(&output)?;
        let status = Command::new(&executable)
            .status()
            .with_context(|| format!("could not run '{}'", executable.display()))?;

        return Ok(Some(status.code().unwrap_or(1)));
    }

    Ok(None)
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("a.out"));

    match input.parent() {
        Some(parent) => parent.join(stem),
        None => stem,
    }
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    Ok(std::env::current_dir()?.join(path))
}

/// Runs `<toolchain> <flags> <output> <input>`, failing on a non-zero exit.
fn invoke(toolchain: &str, flags: &[&str], output: &Path, input: &Path) -> anyhow::Result<()> {
    let result = Command::new(toolchain)
        .args(flags)
        .arg(output)
        .arg(input)
        .output()
        .with_context(|| format!("failed to start {}", toolchain))?;

    if !result.status.success() {
        return Err(anyhow!(
            "{} failed:\n{}",
            toolchain,
            String::from_utf8_lossy(&result.stderr)
        ));
    }

    Ok(())
}
