use crate::compiler_frontend::compiler_errors::CompilerError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SOURCE_FILE_EXTENSION: &str = "expr";
pub const ASSEMBLY_FILE_EXTENSION: &str = "s";
pub const CONFIG_FILE_NAME: &str = "triad.toml";
pub const ENTRY_FUNCTION_NAME: &str = "main";
pub const TEST_CASES_FOLDER: &str = "tests/cases";

// This is a guess about how much should be initially allocated for the token vec.
// Just a heuristic based on the test programs, most tokens are 4-6 chars plus whitespace.
pub const SRC_TO_TOKEN_RATIO: usize = 5;

pub const DEFAULT_SIMULATOR_STEP_LIMIT: u64 = 50_000_000;

/// Which assembler/linker conventions the native backend targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    #[default]
    Unix,

    // Global symbols get a leading underscore
    Windows,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub target_platform: TargetPlatform,
    pub output_folder: PathBuf,

    /// Annotate the assembly with the stack instruction each block came from
    pub emit_comments: bool,

    pub simulator_step_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_platform: TargetPlatform::Unix,
            output_folder: PathBuf::from("build"),
            emit_comments: true,
            simulator_step_limit: DEFAULT_SIMULATOR_STEP_LIMIT,
        }
    }
}

impl Config {
    /// Reads `triad.toml` next to the source file, if there is one
    pub fn for_source_file(source_file: &Path) -> Result<Self, CompilerError> {
        let folder = source_file.parent().unwrap_or(Path::new(""));
        Config::load(&folder.join(CONFIG_FILE_NAME))
    }

    pub fn load(config_path: &Path) -> Result<Self, CompilerError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let text = fs::read_to_string(config_path)
            .map_err(|e| CompilerError::file_error(config_path, e.to_string()))?;

        Config::parse(&text).map_err(|msg| CompilerError::config_error(config_path, msg))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
