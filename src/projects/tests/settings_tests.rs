#![cfg(test)]

use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::projects::settings::{CONFIG_FILE_NAME, Config, TargetPlatform};
use std::fs;
use std::path::PathBuf;

#[test]
fn empty_config_uses_defaults() {
    let config = Config::parse("").expect("empty config is valid");
    assert_eq!(config, Config::default());
    assert_eq!(config.output_folder, PathBuf::from("build"));
    assert!(config.emit_comments);
}

#[test]
fn every_field_can_be_set() {
    let config = Config::parse(
        r#"
        target_platform = "windows"
        output_folder = "out/asm"
        emit_comments = false
        simulator_step_limit = 1000
        "#,
    )
    .expect("config should parse");

    assert_eq!(config.target_platform, TargetPlatform::Windows);
    assert_eq!(config.output_folder, PathBuf::from("out/asm"));
    assert!(!config.emit_comments);
    assert_eq!(config.simulator_step_limit, 1000);
}

#[test]
fn unknown_platform_is_rejected() {
    let error = Config::parse("target_platform = \"amiga\"").expect_err("not a platform");
    assert!(error.contains("amiga") || error.contains("variant"));
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(Config::parse("optimise = true").is_err());
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let folder = tempfile::tempdir().expect("temp dir");
    let config = Config::for_source_file(&folder.path().join("program.expr"))
        .expect("no config file is fine");

    assert_eq!(config, Config::default());
}

#[test]
fn config_next_to_the_source_is_loaded() {
    let folder = tempfile::tempdir().expect("temp dir");
    fs::write(folder.path().join(CONFIG_FILE_NAME), "emit_comments = false")
        .expect("write config");

    let config = Config::for_source_file(&folder.path().join("program.expr"))
        .expect("config should load");
    assert!(!config.emit_comments);
    assert_eq!(config.target_platform, TargetPlatform::Unix);
}

#[test]
fn malformed_file_is_a_config_error() {
    let folder = tempfile::tempdir().expect("temp dir");
    let path = folder.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "emit_comments = [").expect("write config");

    let error = Config::load(&path).expect_err("broken toml");
    assert_eq!(error.error_type, ErrorType::Config);
}
