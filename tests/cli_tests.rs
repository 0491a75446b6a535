//! CLI contract tests: stdout carries results or `!trap`, stderr stays
//! empty for normal and trapping runs, environmental errors exit non-zero
//! with a diagnostic on stderr.

mod common;

use assert_cmd::Command;
use common::main_module;
use wasmite::module::{Module, ValueType};
use wasmite::opcode as op;

fn write_module(dir: &tempfile::TempDir, module: &Module) -> std::path::PathBuf {
    let path = dir.path().join("module.json");
    let json = serde_json::to_string(module).expect("serialize module");
    std::fs::write(&path, json).expect("write module file");
    path
}

fn identity_module() -> Module {
    main_module(
        vec![ValueType::I32],
        vec![ValueType::I32],
        vec![],
        vec![op::LOCAL_GET, 0x00, op::END],
    )
}

#[test]
fn runs_main_and_prints_result() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_module(&dir, &identity_module());

    Command::cargo_bin("wasmite")
        .unwrap()
        .arg(&path)
        .arg("42")
        .assert()
        .success()
        .stdout("42\n")
        .stderr("");
}

#[test]
fn negative_arguments_are_not_flags() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_module(&dir, &identity_module());

    Command::cargo_bin("wasmite")
        .unwrap()
        .arg(&path)
        .arg("-7")
        .assert()
        .success()
        .stdout("-7\n")
        .stderr("");
}

#[test]
fn float_results_use_fixed_notation() {
    let module = main_module(
        vec![ValueType::F64, ValueType::F64],
        vec![ValueType::F64],
        vec![],
        vec![op::LOCAL_GET, 0x00, op::LOCAL_GET, 0x01, op::F64_ADD, op::END],
    );
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_module(&dir, &module);

    Command::cargo_bin("wasmite")
        .unwrap()
        .arg(&path)
        .args(["1.5", "2.25"])
        .assert()
        .success()
        .stdout("3.750000\n")
        .stderr("");
}

#[test]
fn trap_prints_marker_and_exits_zero() {
    let module = main_module(vec![], vec![], vec![], vec![op::UNREACHABLE, op::END]);
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_module(&dir, &module);

    Command::cargo_bin("wasmite")
        .unwrap()
        .arg(&path)
        .assert()
        .success()
        .stdout("!trap\n")
        .stderr("");
}

#[test]
fn missing_file_is_an_environmental_error() {
    Command::cargo_bin("wasmite")
        .unwrap()
        .arg("no-such-module.json")
        .assert()
        .failure()
        .stdout("")
        .stderr(predicates::str::contains("Error reading"));
}

#[test]
fn malformed_module_is_an_environmental_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").expect("write file");

    Command::cargo_bin("wasmite")
        .unwrap()
        .arg(&path)
        .assert()
        .failure()
        .stdout("")
        .stderr(predicates::str::contains("Error parsing"));
}

#[test]
fn missing_main_is_an_environmental_error() {
    let mut module = identity_module();
    module.exports.clear();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_module(&dir, &module);

    Command::cargo_bin("wasmite")
        .unwrap()
        .arg(&path)
        .arg("42")
        .assert()
        .failure()
        .stdout("")
        .stderr(predicates::str::contains("main"));
}

#[test]
fn wrong_argument_count_is_an_environmental_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_module(&dir, &identity_module());

    Command::cargo_bin("wasmite")
        .unwrap()
        .arg(&path)
        .assert()
        .failure()
        .stdout("")
        .stderr(predicates::str::contains("argument"));
}

#[test]
fn unparseable_argument_is_an_environmental_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_module(&dir, &identity_module());

    Command::cargo_bin("wasmite")
        .unwrap()
        .arg(&path)
        .arg("forty-two")
        .assert()
        .failure()
        .stdout("")
        .stderr(predicates::str::contains("argument"));
}

#[test]
fn dump_prints_module_summary() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_module(&dir, &identity_module());

    Command::cargo_bin("wasmite")
        .unwrap()
        .arg("--dump")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicates::str::contains("module:"))
        .stdout(predicates::str::contains("exports: 1"));
}
