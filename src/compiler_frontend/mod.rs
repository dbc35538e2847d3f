pub(crate) mod tokenizer {
    pub(crate) mod tokenizer;
    pub(crate) mod tokens;
}

pub(crate) mod parsers {
    pub(crate) mod parse_program;
}

pub(crate) mod language {
    pub(crate) mod ast_display;
    pub(crate) mod ast_nodes;
    pub(crate) mod intrinsics;
    pub(crate) mod values;
}

pub(crate) mod compiler_messages {
    pub(crate) mod compiler_dev_logging;
    pub(crate) mod compiler_errors;
    pub(crate) mod display_messages;
}
pub(crate) use compiler_messages::compiler_errors;
pub(crate) use compiler_messages::display_messages;

pub(crate) mod resolution;

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::language::ast_nodes::Program;
use crate::compiler_frontend::parsers::parse_program::parse_program;
use crate::compiler_frontend::resolution::resolve_calls;
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;
use crate::compiler_frontend::tokenizer::tokens::FileTokens;
use crate::projects::settings;
use std::path::{Path, PathBuf};

/// Per-invocation switches from the command line.
/// Persistent settings live in `triad.toml` instead.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Flag {
    DisableTimers,
    WindowsTarget,
    UnixTarget,
    NoComments,
}

/// The front half of the pipeline: source text in, resolved `Program` out.
/// Each stage can also be driven on its own, which the tests and the CLI's
/// timers rely on.
pub struct CompilerFrontend {
    pub(crate) entry_name: String,
}

impl Default for CompilerFrontend {
    fn default() -> Self {
        CompilerFrontend::new(settings::ENTRY_FUNCTION_NAME)
    }
}

impl CompilerFrontend {
    pub fn new(entry_name: &str) -> Self {
        CompilerFrontend {
            entry_name: entry_name.to_owned(),
        }
    }

    /// -----------------------------
    /// TOKENIZER
    /// -----------------------------
    pub fn source_to_tokens(
        &self,
        source_code: &str,
        module_path: &Path,
    ) -> Result<FileTokens, CompilerError> {
        let module_path = module_path.to_path_buf();

        match tokenize(source_code, &module_path) {
            Ok(tokens) => Ok(tokens),
            Err(e) => Err(e.with_file_path(module_path)),
        }
    }

    /// -----------------------------
    /// AST CREATION
    /// -----------------------------
    /// Top-level statements become the entry function,
    /// which always comes last in declaration order.
    pub fn tokens_to_ast(&self, mut tokens: FileTokens) -> Result<Program, CompilerError> {
        let src_path = tokens.src_path.to_owned();

        match parse_program(&mut tokens, &self.entry_name) {
            Ok(program) => Ok(program),
            Err(e) => Err(e.with_file_path(src_path)),
        }
    }

    /// -----------------------------
    /// CALL RESOLUTION
    /// -----------------------------
    /// Every call site is bound to a user declaration or an intrinsic.
    /// The compiler assumes this has run and treats an unresolved call as its own bug.
    pub fn resolve_calls(&self, program: Program) -> Result<Program, CompilerError> {
        resolve_calls(program)
    }

    pub fn source_to_program(
        &self,
        source_code: &str,
        module_path: &Path,
    ) -> Result<Program, CompilerError> {
        let tokens = self.source_to_tokens(source_code, module_path)?;
        let program = self.tokens_to_ast(tokens)?;

        match self.resolve_calls(program) {
            Ok(program) => Ok(program),
            Err(e) => Err(e.with_file_path(PathBuf::from(module_path))),
        }
    }
}

/// Parses and resolves a source string that does not come from a file
pub fn parse_source(source_code: &str) -> Result<Program, CompilerError> {
    CompilerFrontend::default().source_to_program(source_code, Path::new(""))
}
