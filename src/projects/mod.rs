/// # The command-line surface of the toolchain
/// Everything here is glue around the build system: argument parsing,
/// per-project settings and printing results.

// The basic compiler CLI
pub mod cli;

pub(crate) mod settings;
