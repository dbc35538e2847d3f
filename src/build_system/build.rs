//! Drives one source file through the toolchain.
//!
//! The CLI, the integration runner and the tests all come through here,
//! so every caller sees the same stages, timers and error handling.

use crate::backends::stack::instructions::StackProgram;
use crate::backends::stack::stack_compiler::compile_program;
use crate::backends::stack::stack_interpreter::run_stack_program;
use crate::backends::x86::asm_entities::NativeModule;
use crate::backends::x86::asm_rendering::{RenderOptions, render_module};
use crate::backends::x86::asm_simulator::simulate;
use crate::backends::x86::x86_codegen::generate_native;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::language::ast_nodes::Program;
use crate::compiler_frontend::{CompilerFrontend, Flag};
use crate::projects::settings::{
    ASSEMBLY_FILE_EXTENSION, Config, SOURCE_FILE_EXTENSION, TargetPlatform,
};
use crate::runtime::intrinsic_semantics::RunOutcome;
use crate::runtime::tree_interpreter::run_program;
use crate::{ast_log, stack_log, timer_log};
use saying::say;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Which executor runs a program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Tree,
    Stack,
    Native,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Tree, Backend::Stack, Backend::Native];

    pub fn from_name(name: &str) -> Option<Backend> {
        match name {
            "tree" => Some(Backend::Tree),
            "stack" => Some(Backend::Stack),
            "native" => Some(Backend::Native),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Tree => "tree",
            Backend::Stack => "stack",
            Backend::Native => "native",
        }
    }
}

pub struct InputFile {
    pub source_code: String,
    pub source_path: PathBuf,
}

impl InputFile {
    pub fn read(source_path: &Path) -> Result<Self, CompilerError> {
        if source_path.extension().is_none_or(|ext| ext != SOURCE_FILE_EXTENSION) {
            return Err(CompilerError::file_error(
                source_path,
                format!("Source files must have the .{SOURCE_FILE_EXTENSION} extension"),
            ));
        }

        match fs::read_to_string(source_path) {
            Ok(source_code) => Ok(InputFile {
                source_code,
                source_path: source_path.to_path_buf(),
            }),
            Err(e) => Err(CompilerError::file_error(source_path, e.to_string())),
        }
    }
}

/// Everything the compiler produced for one file
pub struct CompiledFile {
    pub program: Program,
    pub stack_program: StackProgram,
}

pub struct NativeBuild {
    pub module: NativeModule,
    pub assembly: String,
}

/// CLI flags win over the config file
pub fn apply_flags(config: &mut Config, flags: &[Flag]) {
    for flag in flags {
        match flag {
            Flag::WindowsTarget => config.target_platform = TargetPlatform::Windows,
            Flag::UnixTarget => config.target_platform = TargetPlatform::Unix,
            Flag::NoComments => config.emit_comments = false,
            Flag::DisableTimers => {}
        }
    }
}

/// Reads the source file and the `triad.toml` next to it
pub fn load_input(entry_path: &Path, flags: &[Flag]) -> Result<(InputFile, Config), CompilerError> {
    let input = InputFile::read(entry_path)?;
    let mut config = Config::for_source_file(entry_path)?;
    apply_flags(&mut config, flags);

    Ok((input, config))
}

/// Source text to bytecode
pub fn compile_file(input: &InputFile) -> Result<CompiledFile, CompilerError> {
    let frontend = CompilerFrontend::default();

    // ----------------------------------
    //           Tokenize
    // ----------------------------------
    let time = Instant::now();
    let tokens = frontend.source_to_tokens(&input.source_code, &input.source_path)?;
    timer_log!(time, "Tokenized in: ");

    // ----------------------------------
    //      Parse and resolve calls
    // ----------------------------------
    let time = Instant::now();
    let program = frontend.tokens_to_ast(tokens)?;
    let program = frontend
        .resolve_calls(program)
        .map_err(|e| e.with_file_path(input.source_path.to_owned()))?;
    timer_log!(time, "AST created in: ");
    ast_log!("{}", program);

    // ----------------------------------
    //            Bytecode
    // ----------------------------------
    let time = Instant::now();
    let stack_program = compile_program(&program)?;
    timer_log!(time, "Bytecode generated in: ");
    stack_log!("{} functions, {} pooled strings", stack_program.functions.len(), stack_program.literal_pool.len());

    Ok(CompiledFile {
        program,
        stack_program,
    })
}

/// Bytecode to assembly text
pub fn generate_assembly(
    stack_program: &StackProgram,
    config: &Config,
) -> Result<NativeBuild, CompilerError> {
    let time = Instant::now();
    let module = generate_native(stack_program)?;
    timer_log!(time, "Native code generated in: ");

    let options = RenderOptions {
        platform: config.target_platform,
        comments: config.emit_comments,
    };
    let assembly = render_module(&module, &options);

    Ok(NativeBuild { module, assembly })
}

/// Where `build` writes the assembly of a source file
pub fn assembly_path(entry_path: &Path, config: &Config) -> PathBuf {
    let folder = entry_path.parent().unwrap_or(Path::new(""));
    let stem = entry_path.file_stem().unwrap_or_default();

    folder
        .join(&config.output_folder)
        .join(stem)
        .with_extension(ASSEMBLY_FILE_EXTENSION)
}

/// Compiles a source file to `<output_folder>/<stem>.s`
pub fn build_file(entry_path: &Path, flags: &[Flag]) -> Result<PathBuf, CompilerMessages> {
    let start = Instant::now();

    let (input, config) = load_input(entry_path, flags)?;
    let compiled = compile_file(&input)?;
    let native = generate_assembly(&compiled.stack_program, &config)?;

    let output_path = assembly_path(entry_path, &config);
    if let Some(folder) = output_path.parent() {
        fs::create_dir_all(folder)
            .map_err(|e| CompilerError::file_error(folder, format!("Error creating the output folder: {e}")))?;
    }
    fs::write(&output_path, native.assembly)
        .map_err(|e| CompilerError::file_error(&output_path, format!("Error writing file: {e}")))?;

    if !flags.contains(&Flag::DisableTimers) {
        say!(
            "\nBuilt ",
            Blue output_path.to_string_lossy(),
            Reset " in: ",
            Green Bold #start.elapsed()
        );
    }

    Ok(output_path)
}

/// Runs an already compiled file on one backend
pub fn execute(
    compiled: &CompiledFile,
    backend: Backend,
    input: &[i32],
    config: &Config,
) -> Result<RunOutcome, CompilerError> {
    match backend {
        Backend::Tree => run_program(&compiled.program, input),
        Backend::Stack => run_stack_program(&compiled.stack_program, input),
        Backend::Native => {
            let native = generate_assembly(&compiled.stack_program, config)?;
            let run = simulate(&native.module, input, config.simulator_step_limit)?;
            Ok(run.outcome)
        }
    }
}

pub fn run_file(
    entry_path: &Path,
    backend: Backend,
    input: &[i32],
    flags: &[Flag],
) -> Result<RunOutcome, CompilerMessages> {
    let start = Instant::now();

    let (source, config) = load_input(entry_path, flags)?;
    let compiled = compile_file(&source)?;
    let outcome = execute(&compiled, backend, input, &config)?;

    if !flags.contains(&Flag::DisableTimers) {
        say!(
            "\nRan on the ",
            Blue backend.name(),
            Reset " backend in: ",
            Green Bold #start.elapsed()
        );
    }

    Ok(outcome)
}

#[cfg(test)]
#[path = "tests/build_tests.rs"]
mod tests;
