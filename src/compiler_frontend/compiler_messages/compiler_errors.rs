use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// The final set of errors and warnings emitted from one run of the toolchain
#[derive(Debug, Default)]
pub struct CompilerMessages {
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<String>,
}

impl CompilerMessages {
    pub fn new() -> Self {
        CompilerMessages {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_error(error: CompilerError) -> Self {
        CompilerMessages {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }
}

impl From<CompilerError> for CompilerMessages {
    fn from(error: CompilerError) -> Self {
        CompilerMessages::from_error(error)
    }
}

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum ErrorMetaDataKey {
    CompilationStage,

    // Optional suggestions
    PrimarySuggestion,
    AlternativeSuggestion,

    // Backend context
    InstructionKind,
    ExpectedStackShape,
    FoundStackShape,
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub msg: String,

    // Source files are the only scope this toolchain has,
    // so the location is the file plus the line/column span.
    // Errors raised past the parser carry a default location.
    pub location: TextLocation,
    pub error_type: ErrorType,

    pub metadata: HashMap<ErrorMetaDataKey, &'static str>,
}

impl CompilerError {
    pub fn new(
        msg: impl Into<String>,
        location: TextLocation,
        error_type: ErrorType,
    ) -> CompilerError {
        CompilerError {
            msg: msg.into(),
            location,
            error_type,
            metadata: HashMap::new(),
        }
    }

    pub fn with_file_path(mut self, file_path: PathBuf) -> Self {
        self.location.scope = file_path;
        self
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: &'static str) {
        self.metadata.insert(key, value);
    }

    pub fn new_syntax_error(msg: impl Into<String>, location: TextLocation) -> Self {
        CompilerError::new(msg, location, ErrorType::Syntax)
    }

    pub fn new_resolution_error(msg: impl Into<String>, location: TextLocation) -> Self {
        CompilerError::new(msg, location, ErrorType::Resolution)
    }

    /// Create a compiler error (internal bug, not user's fault)
    pub fn compiler_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, TextLocation::default(), ErrorType::Compiler)
    }

    /// Native code generation found a StackProgram it cannot lower
    pub fn codegen_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, TextLocation::default(), ErrorType::Codegen)
    }

    /// A fault while executing a program in one of the interpreters
    pub fn runtime_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, TextLocation::default(), ErrorType::Runtime)
    }

    pub fn file_error(path: &Path, msg: impl Into<String>) -> Self {
        CompilerError::new(
            msg,
            TextLocation::from_path(path.to_path_buf()),
            ErrorType::File,
        )
    }

    pub fn config_error(path: &Path, msg: impl Into<String>) -> Self {
        CompilerError::new(
            msg,
            TextLocation::from_path(path.to_path_buf()),
            ErrorType::Config,
        )
    }
}

impl std::fmt::Display for CompilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", error_type_to_str(&self.error_type), self.msg)
    }
}

// Adds more information to the CompilerError
// So it knows which stage produced it
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ErrorType {
    Syntax,
    Resolution,
    Compiler,
    Codegen,
    Runtime,
    File,
    Config,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::Syntax => "Syntax Error",
        ErrorType::Resolution => "Resolution Error",
        ErrorType::Compiler => "Compiler Bug",
        ErrorType::Codegen => "Native Codegen Bug",
        ErrorType::Runtime => "Runtime Fault",
        ErrorType::File => "File Error",
        ErrorType::Config => "Malformed Config",
    }
}

/// Returns a new CompilerError for syntax violations.
///
/// Usage:
/// `return_syntax_error!("Expected 'fi'", location, {
///     CompilationStage => "Parsing",
///     PrimarySuggestion => "Close the if statement with 'fi'",
/// })`;
#[macro_export]
macro_rules! return_syntax_error {
    ($msg:expr, $loc:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $loc,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Syntax,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $(
                    map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value);
                )*
                map
            },
        })
    };
    ($msg:expr, $loc:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $loc,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Syntax,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new CompilerError for calls that cannot be bound to a declaration.
///
/// Usage: `return_resolution_error!(format!("Unresolved function {name}"), location)`;
#[macro_export]
macro_rules! return_resolution_error {
    ($msg:expr, $loc:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $loc,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Resolution,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value); )*
                map
            },
        })
    };
    ($msg:expr, $loc:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $loc,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Resolution,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new CompilerError for internal compiler bugs.
///
/// Compiler errors indicate bugs in the compiler itself, not user code issues.
#[macro_export]
macro_rules! return_compiler_error {
    // Format string, arguments and metadata (with semicolon separator)
    ($fmt:expr, $($arg:expr),+ ; { $( $key:ident => $value:expr ),* $(,)? }) => {{
        return Err(::core::convert::From::from($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: format!($fmt, $($arg),+),
            location: $crate::compiler_frontend::tokenizer::tokens::TextLocation::default(),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Compiler,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value); )*
                map
            },
        }));
    }};
    // Format string and arguments
    ($fmt:expr, $($arg:expr),+ $(,)?) => {{
        return Err(::core::convert::From::from($crate::compiler_frontend::compiler_errors::CompilerError::compiler_error(
            format!($fmt, $($arg),+),
        )));
    }};
    // Message only
    ($msg:expr) => {{
        return Err(::core::convert::From::from($crate::compiler_frontend::compiler_errors::CompilerError::compiler_error($msg)));
    }};
}

/// Returns a new CompilerError for malformed input reaching the native code generator.
#[macro_export]
macro_rules! return_codegen_error {
    ($fmt:expr, $($arg:expr),+ ; { $( $key:ident => $value:expr ),* $(,)? }) => {{
        return Err(::core::convert::From::from($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: format!($fmt, $($arg),+),
            location: $crate::compiler_frontend::tokenizer::tokens::TextLocation::default(),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Codegen,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value); )*
                map
            },
        }));
    }};
    ($fmt:expr, $($arg:expr),+ $(,)?) => {{
        return Err(::core::convert::From::from($crate::compiler_frontend::compiler_errors::CompilerError::codegen_error(
            format!($fmt, $($arg),+),
        )));
    }};
    ($msg:expr) => {{
        return Err(::core::convert::From::from($crate::compiler_frontend::compiler_errors::CompilerError::codegen_error($msg)));
    }};
}

/// Returns a new CompilerError for faults raised while executing a program.
#[macro_export]
macro_rules! return_runtime_error {
    ($fmt:expr, $($arg:expr),+ $(,)?) => {{
        return Err(::core::convert::From::from($crate::compiler_frontend::compiler_errors::CompilerError::runtime_error(
            format!($fmt, $($arg),+),
        )));
    }};
    ($msg:expr) => {{
        return Err(::core::convert::From::from($crate::compiler_frontend::compiler_errors::CompilerError::runtime_error($msg)));
    }};
}
