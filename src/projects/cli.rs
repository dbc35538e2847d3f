//! Command-line entrypoints for the triad toolchain.
//!
//! This module parses CLI commands and dispatches them into the build,
//! run, bytecode dump and integration test workflows.

use crate::build_system::build::{self, Backend};
use crate::compiler_frontend::Flag;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::display_messages::print_compiler_messages;
use crate::compiler_tests::integration_test_runner::run_all_test_cases;
use crate::runtime::intrinsic_semantics::RunOutcome;
use saying::say;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    // Compiles a file to assembly
    Build(PathBuf),

    Run {
        path: PathBuf,
        backend: Backend,
        input: Vec<i32>,
    },

    // Prints the compiled stack program
    Bytecode { path: PathBuf, json: bool },

    Help,
    CompilerTests, // Runs the integration cases under tests/cases on every backend
}

pub fn start_cli() {
    let compiler_args: Vec<String> = env::args().collect();

    if compiler_args.len() < 2 {
        print_help(false);
        return;
    }

    let command = match get_command(&compiler_args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red e);
            print_help(true);
            return;
        }
    };

    // Gather a list of any additional flags
    let flags = get_flags(&compiler_args);

    match command {
        Command::Help => print_help(false),

        Command::Build(path) => match build::build_file(&path, &flags) {
            Ok(output_path) => {
                say!(Green "Wrote ", #output_path);
            }
            Err(messages) => print_compiler_messages(messages),
        },

        Command::Run {
            path,
            backend,
            input,
        } => match build::run_file(&path, backend, &input, &flags) {
            Ok(outcome) => print_outcome(&outcome),
            Err(messages) => print_compiler_messages(messages),
        },

        Command::Bytecode { path, json } => match print_bytecode(&path, json, &flags) {
            Ok(()) => {}
            Err(messages) => print_compiler_messages(messages),
        },

        Command::CompilerTests => {
            run_all_test_cases(!flags.contains(&Flag::DisableTimers));
        }
    }
}

fn get_command(args: &[String]) -> Result<Command, String> {
    let command = args.first().map(String::as_str);

    match command {
        Some("help") => Ok(Command::Help),

        Some("build") => Ok(Command::Build(get_path(args, "build")?)),

        Some("run") => parse_run_command(args),

        Some("bytecode") => Ok(Command::Bytecode {
            path: get_path(args, "bytecode")?,
            json: args.iter().any(|arg| arg == "--json"),
        }),

        Some("tests") => Ok(Command::CompilerTests),

        Some(other) => Err(format!("Invalid command: '{other}'")),
        None => Err(String::from("No command given")),
    }
}

/// The first argument after the command that is not a flag
fn get_path(args: &[String], command: &str) -> Result<PathBuf, String> {
    let mut remaining = args[1..].iter();

    while let Some(arg) = remaining.next() {
        match arg.as_str() {
            // Flags that take a value
            "--backend" | "--input" => {
                remaining.next();
            }
            _ if arg.starts_with("--") => {}
            _ => return Ok(PathBuf::from(arg)),
        }
    }

    Err(format!("The {command} command needs a path to a source file"))
}

fn parse_run_command(args: &[String]) -> Result<Command, String> {
    let path = get_path(args, "run")?;
    let mut backend = Backend::Stack;
    let mut input = Vec::new();
    let mut index = 1usize;

    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "--backend" => {
                let Some(name) = args.get(index + 1) else {
                    return Err(String::from("Missing value for --backend"));
                };
                backend = match Backend::from_name(name) {
                    Some(backend) => backend,
                    None => {
                        return Err(format!(
                            "Unknown backend: '{name}'. Expected tree, stack or native."
                        ));
                    }
                };
                index += 2;
            }
            "--input" => {
                let Some(values) = args.get(index + 1) else {
                    return Err(String::from("Missing value for --input"));
                };
                input = parse_input(values)?;
                index += 2;
            }
            _ => index += 1,
        }
    }

    Ok(Command::Run {
        path,
        backend,
        input,
    })
}

/// Comma-separated integers, e.g. `1,2,-3`
fn parse_input(values: &str) -> Result<Vec<i32>, String> {
    values
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<i32>()
                .map_err(|_| format!("Invalid --input value: '{value}' is not a 32-bit integer"))
        })
        .collect()
}

fn get_flags(args: &[String]) -> Vec<Flag> {
    let mut flags = Vec::new();

    for arg in args {
        match arg.as_str() {
            "--hide-timers" => flags.push(Flag::DisableTimers),
            "--windows" => flags.push(Flag::WindowsTarget),
            "--unix" => flags.push(Flag::UnixTarget),
            "--no-comments" => flags.push(Flag::NoComments),
            _ => {}
        }
    }

    flags
}

fn print_outcome(outcome: &RunOutcome) {
    for value in &outcome.output {
        println!("{value}");
    }

    if let Some(uncaught) = &outcome.uncaught {
        say!(
            Yellow "Uncaught exception ",
            Bright Red uncaught.name.to_owned(),
            Reset " (id ",
            uncaught.id,
            ") with payload ",
            Bright uncaught.payload
        );
    }
}

fn print_bytecode(path: &Path, json: bool, flags: &[Flag]) -> Result<(), CompilerMessages> {
    let (input, _) = build::load_input(path, flags)?;
    let compiled = build::compile_file(&input)?;

    if json {
        let text = serde_json::to_string_pretty(&compiled.stack_program).map_err(|e| {
            CompilerError::compiler_error(format!("Could not serialise the stack program: {e}"))
        })?;
        println!("{text}");
        return Ok(());
    }

    for function in &compiled.stack_program.functions {
        print!("{function}");
    }
    for (index, literal) in compiled.stack_program.literal_pool.iter().enumerate() {
        say!(Dark Magenta "#", index, Reset " ", #literal);
    }

    Ok(())
}

fn print_help(commands_only: bool) {
    if !commands_only {
        say!(Bright Black "------------------------------------");
        say!(Green Bold "triad: an expression language compiler with three backends");
        say!("Usage: ", Bold "<command> ", Italic "<args>");
    }
    say!(Green Bold "\nCommands:");
    say!("  build <file.expr>                 - Compiles to x86 assembly in the output folder");
    say!("  run <file.expr>                   - Runs a program and prints its output");
    say!("      --backend tree|stack|native   (default: stack)");
    say!("      --input 1,2,3                 values returned by read()");
    say!("  bytecode <file.expr> [--json]     - Prints the compiled stack program");
    say!("  tests                             - Runs the integration cases");
    say!("  help");

    say!(Green Bold "\nFlags:");
    say!("  --hide-timers");
    say!("  --windows       (prefix global symbols with '_')");
    say!("  --unix");
    say!("  --no-comments   (no source annotations in the assembly)");
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
