#![cfg(test)]

use crate::build_system::build::{Backend, apply_flags, assembly_path, build_file, run_file};
use crate::compiler_frontend::Flag;
use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::projects::settings::{Config, TargetPlatform};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FLAGS: [Flag; 1] = [Flag::DisableTimers];

fn write_source(folder: &Path, name: &str, source: &str) -> PathBuf {
    let path = folder.join(name);
    fs::write(&path, source).expect("source file should be writable");
    path
}

#[test]
fn build_writes_assembly_into_the_output_folder() {
    let folder = TempDir::new().expect("temp dir");
    let source = write_source(folder.path(), "hello.expr", "write(strlen(\"hello\"))");

    let output = build_file(&source, &FLAGS).expect("build should succeed");
    assert_eq!(output, folder.path().join("build").join("hello.s"));

    let assembly = fs::read_to_string(&output).expect("assembly was written");
    assert!(assembly.contains(".globl main"));
    assert!(assembly.contains("call strlen"));
    assert!(assembly.contains(".asciz \"hello\""));
}

#[test]
fn config_next_to_the_source_is_respected() {
    let folder = TempDir::new().expect("temp dir");
    fs::write(
        folder.path().join("triad.toml"),
        "target_platform = \"windows\"\noutput_folder = \"asm\"\nemit_comments = false\n",
    )
    .expect("config is writable");
    let source = write_source(folder.path(), "prog.expr", "write(1)");

    let output = build_file(&source, &FLAGS).expect("build should succeed");
    assert_eq!(output, folder.path().join("asm").join("prog.s"));

    let assembly = fs::read_to_string(&output).expect("assembly was written");
    assert!(assembly.contains("call _write"));
    assert!(!assembly.contains('#'));
}

#[test]
fn flags_override_the_config_file() {
    let mut config = Config {
        target_platform: TargetPlatform::Windows,
        ..Config::default()
    };

    apply_flags(&mut config, &[Flag::UnixTarget, Flag::NoComments]);
    assert_eq!(config.target_platform, TargetPlatform::Unix);
    assert!(!config.emit_comments);

    assert_eq!(
        assembly_path(Path::new("src/app.expr"), &config),
        Path::new("src/build/app.s")
    );
}

#[test]
fn wrong_extension_is_a_file_error() {
    let folder = TempDir::new().expect("temp dir");
    let source = write_source(folder.path(), "prog.txt", "write(1)");

    let messages = build_file(&source, &FLAGS).expect_err("not a source file");
    assert_eq!(messages.errors[0].error_type, ErrorType::File);
}

#[test]
fn syntax_errors_carry_the_source_path() {
    let folder = TempDir::new().expect("temp dir");
    let source = write_source(folder.path(), "broken.expr", "write(1");

    let messages = build_file(&source, &FLAGS).expect_err("unclosed call");
    let error = &messages.errors[0];
    assert_eq!(error.error_type, ErrorType::Syntax);
    assert_eq!(error.location.scope, source);
}

#[test]
fn every_backend_runs_the_same_file() {
    let folder = TempDir::new().expect("temp dir");
    let source = write_source(
        folder.path(),
        "sum.expr",
        "fun sum(a, b) begin return a + b end
        write(sum(read(), read()))",
    );

    for backend in Backend::ALL {
        let outcome = run_file(&source, backend, &[20, 22], &FLAGS).expect("program runs");
        assert_eq!(outcome.output, vec![42], "{} backend", backend.name());
    }
}
