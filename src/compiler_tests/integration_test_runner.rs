//! Runs the integration cases under `tests/cases` on every backend.
//!
//! `success/NAME.expr` must compile and, on the tree interpreter, the stack
//! interpreter and the native simulator alike, produce what the sibling
//! `NAME.toml` expects. `failure/NAME.expr` must be rejected by the compiler.

use crate::build_system::build::{Backend, InputFile, compile_file, execute};
use crate::compiler_frontend::compiler_messages::compiler_errors::error_type_to_str;
use crate::projects::settings::{Config, SOURCE_FILE_EXTENSION, TEST_CASES_FOLDER};
use saying::say;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

const SEPARATOR_LINE_LENGTH: usize = 37;

/// What a success case must do, read from the `.toml` next to it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseExpectation {
    #[serde(default)]
    pub input: Vec<i32>,
    pub output: Vec<i32>,

    /// Name of the exception expected to escape the entry function
    #[serde(default)]
    pub uncaught: Option<String>,
}

impl CaseExpectation {
    pub fn for_case(source_path: &Path) -> Result<Self, String> {
        let path = source_path.with_extension("toml");
        let text = fs::read_to_string(&path)
            .map_err(|e| format!("Could not read {}: {e}", path.display()))?;

        toml::from_str(&text).map_err(|e| format!("Malformed {}: {e}", path.display()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub expected_failures: usize,
    pub unexpected_successes: usize,
}

impl TestSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.expected_failures + self.unexpected_successes
    }

    pub fn all_correct(&self) -> bool {
        self.failed == 0 && self.unexpected_successes == 0
    }
}

/// Source files of one case folder, sorted so runs are reproducible
pub fn collect_cases(folder: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(folder) else {
        return Vec::new();
    };

    let mut cases: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == SOURCE_FILE_EXTENSION))
        .collect();
    cases.sort();
    cases
}

/// Every way a success case went wrong, empty when it passed
pub fn check_success_case(source_path: &Path) -> Vec<String> {
    let expectation = match CaseExpectation::for_case(source_path) {
        Ok(expectation) => expectation,
        Err(problem) => return vec![problem],
    };

    let compiled = match InputFile::read(source_path).and_then(|input| compile_file(&input)) {
        Ok(compiled) => compiled,
        Err(e) => return vec![format!("did not compile: {e}")],
    };

    let config = Config::default();
    let mut problems = Vec::new();

    for backend in Backend::ALL {
        let outcome = match execute(&compiled, backend, &expectation.input, &config) {
            Ok(outcome) => outcome,
            Err(e) => {
                problems.push(format!("{} backend: {e}", backend.name()));
                continue;
            }
        };

        if outcome.output != expectation.output {
            problems.push(format!(
                "{} backend wrote {:?}, expected {:?}",
                backend.name(),
                outcome.output,
                expectation.output
            ));
        }

        let uncaught = outcome.uncaught.map(|exception| exception.name);
        if uncaught != expectation.uncaught {
            problems.push(format!(
                "{} backend ended with uncaught {:?}, expected {:?}",
                backend.name(),
                uncaught,
                expectation.uncaught
            ));
        }
    }

    problems
}

/// A failure case passes when compilation stops with an error
pub fn check_failure_case(source_path: &Path) -> Result<String, String> {
    match InputFile::read(source_path).and_then(|input| compile_file(&input)) {
        Ok(_) => Err(String::from("compiled without errors")),
        Err(e) => Ok(error_type_to_str(&e.error_type).to_owned()),
    }
}

/// Run all test cases from the tests/cases directory
pub fn run_all_test_cases(show_timers: bool) -> TestSummary {
    say!("Running all triad test cases...\n");
    let timer = Instant::now();

    let test_cases_dir = Path::new(TEST_CASES_FOLDER);
    let mut summary = TestSummary::default();

    say!(Cyan "Cases that should run on every backend:");
    println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    for path in collect_cases(&test_cases_dir.join("success")) {
        println!("  {}", display_name(&path));

        let problems = check_success_case(&path);
        if problems.is_empty() {
            say!(Green "✓ PASS");
            summary.passed += 1;
        } else {
            say!(Red "✗ FAIL");
            summary.failed += 1;
            for problem in problems {
                say!(Red "    ", problem);
            }
        }
        println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    }

    println!();

    say!(Cyan "Cases that should fail to compile:");
    println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    for path in collect_cases(&test_cases_dir.join("failure")) {
        println!("  {}", display_name(&path));

        match check_failure_case(&path) {
            Ok(error_type) => {
                say!(Green "✓ EXPECTED FAILURE");
                say!(Yellow error_type);
                summary.expected_failures += 1;
            }
            Err(problem) => {
                say!(Yellow "✗ UNEXPECTED SUCCESS");
                say!(problem);
                summary.unexpected_successes += 1;
            }
        }
        println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    }

    print_summary(&summary, show_timers.then(|| timer.elapsed()));
    summary
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn print_summary(summary: &TestSummary, elapsed: Option<std::time::Duration>) {
    println!("\n{}", "=".repeat(SEPARATOR_LINE_LENGTH));
    match elapsed {
        Some(elapsed) => {
            print!("Test Results Summary. Took: ");
            say!(Green #elapsed);
        }
        None => {
            say!("Test Results Summary");
        }
    }
    say!("  Total tests: ", Yellow summary.total());
    say!("  Passed on every backend: ", Blue summary.passed);
    say!("  Failed: ", Blue summary.failed);
    say!("  Expected failures: ", Blue summary.expected_failures);
    say!("  Unexpected successes: ", Blue summary.unexpected_successes);

    let correct_results = summary.passed + summary.expected_failures;
    println!("\n  Correct results: {} / {}", correct_results, summary.total());

    if summary.all_correct() {
        say!("\n🎉 All tests behaved as expected!");
    } else if summary.total() > 0 {
        let percentage = (correct_results as f64 / summary.total() as f64) * 100.0;
        say!(Yellow "\n⚠ ", Bright Yellow format!("{:.1}", percentage), " %", Reset " of tests behaved as expected");
    }

    println!("{}", "=".repeat(SEPARATOR_LINE_LENGTH));
}
