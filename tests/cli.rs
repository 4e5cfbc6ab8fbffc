use std::io::Write;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use speculoos::prelude::*;
use tempfile::NamedTempFile;

const PROGRAM: &str = r#"fn main(){print("hi\n");return 3;}"#;

fn source_file(source: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Cannot create the source file");
    file.write_all(source.as_bytes()).unwrap();
    file
}

fn workbench(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_workbench"))
        .args(args)
        .output()
        .expect("Cannot run workbench")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn run_exits_with_the_program_code() {
    let file = source_file(PROGRAM, ".b");
    let output = workbench(&["run", file.path().to_str().unwrap()]);
    assert_that!(output.status.code()).is_equal_to(Some(3));
    assert_eq!(stdout(&output), "hi\n");
}

#[test]
fn format_prints_the_canonical_layout() {
    let file = source_file(PROGRAM, ".b");
    let output = workbench(&["format", file.path().to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "fn main() {\n    print(\"hi\\n\");\n    return 3;\n}\n"
    );
}

#[test]
fn synth_to_assembly_and_binary() {
    let file = source_file(PROGRAM, ".txt");
    let output = workbench(&["synth", file.path().to_str().unwrap(), "--lang", "b", "--to", "a"]);
    assert!(output.status.success());
    let listing = stdout(&output);
    assert_that!(listing.as_str()).starts_with(".data\n    \"hi\\n\"\n.code\n");

    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("hi.mp0");
    let binary = binary.to_str().unwrap();
    let output = workbench(&["synth", file.path().to_str().unwrap(), "--to", "mp0", "-o", binary]);
    assert!(output.status.success());
    let output = workbench(&["run", binary]);
    assert_that!(output.status.code()).is_equal_to(Some(3));
    assert_eq!(stdout(&output), "hi\n");
}

#[test]
fn errors_point_at_the_source() {
    let file = source_file("fn main() return y;", ".b");
    let output = workbench(&["run", file.path().to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_that!(stderr.as_ref()).contains("variable y is used before being assigned");
    assert_that!(stderr.as_ref()).contains("fn main() return y;");
}

#[test]
fn kinds_lists_the_graph() {
    let output = workbench(&["kinds"]);
    assert!(output.status.success());
    let kinds = stdout(&output);
    assert_that!(kinds.as_str()).contains("b-ast -> a");
    assert_that!(kinds.as_str()).contains("a-ast -> mp0");
}
