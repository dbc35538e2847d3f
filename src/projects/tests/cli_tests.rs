//! Tests for CLI command parsing and validation.

use super::{Command, get_command, get_flags, parse_input};
use crate::build_system::build::Backend;
use crate::compiler_frontend::Flag;
use std::path::PathBuf;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn build_takes_the_first_path() {
    let command =
        get_command(&args(&["build", "--windows", "main.expr"])).expect("command should parse");
    assert_eq!(command, Command::Build(PathBuf::from("main.expr")));
}

#[test]
fn build_without_a_path_is_rejected() {
    let error = get_command(&args(&["build", "--hide-timers"])).expect_err("no path");
    assert!(error.contains("needs a path"));
}

#[test]
fn run_defaults_to_the_stack_backend() {
    let command = get_command(&args(&["run", "main.expr"])).expect("command should parse");
    assert_eq!(
        command,
        Command::Run {
            path: PathBuf::from("main.expr"),
            backend: Backend::Stack,
            input: Vec::new(),
        }
    );
}

#[test]
fn run_parses_backend_and_input() {
    let command = get_command(&args(&[
        "run",
        "--backend",
        "native",
        "--input",
        "6, -2,3",
        "prog.expr",
    ]))
    .expect("command should parse");

    assert_eq!(
        command,
        Command::Run {
            path: PathBuf::from("prog.expr"),
            backend: Backend::Native,
            input: vec![6, -2, 3],
        }
    );
}

#[test]
fn run_rejects_unknown_backends() {
    let error = get_command(&args(&["run", "main.expr", "--backend", "jvm"]))
        .expect_err("jvm is not a backend");
    assert!(error.contains("Unknown backend"));
}

#[test]
fn input_values_must_be_integers() {
    assert_eq!(parse_input(""), Ok(Vec::new()));
    let error = parse_input("1,x").expect_err("x is not a number");
    assert!(error.contains("'x'"));
}

#[test]
fn bytecode_json_switch() {
    let command =
        get_command(&args(&["bytecode", "main.expr", "--json"])).expect("command should parse");
    assert_eq!(
        command,
        Command::Bytecode {
            path: PathBuf::from("main.expr"),
            json: true,
        }
    );
}

#[test]
fn unknown_commands_are_rejected() {
    let error = get_command(&args(&["dev", "main.expr"])).expect_err("no dev server");
    assert!(error.contains("Invalid command"));
}

#[test]
fn flags_are_collected_from_anywhere() {
    let flags = get_flags(&args(&[
        "triad",
        "build",
        "--no-comments",
        "main.expr",
        "--windows",
        "--hide-timers",
    ]));
    assert_eq!(
        flags,
        vec![Flag::NoComments, Flag::WindowsTarget, Flag::DisableTimers]
    );
}
