//! CLI argument validation tests.
//!
//! Tests command-line argument parsing, validation, and error handling.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the developer's own config files.
fn emotion(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("emotion").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"));
    cmd
}

#[test]
fn test_subcommand_is_required() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("train")
                .and(predicate::str::contains("serve"))
                .and(predicate::str::contains("predict"))
                .and(predicate::str::contains("artifacts")),
        );
}

#[test]
fn test_train_without_dataset_fails() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .arg("train")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No dataset specified"));
}

#[test]
fn test_train_missing_dataset_file() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .args(["train", "--dataset", "missing.csv", "--quiet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read dataset"));
}

#[test]
fn test_train_rejects_non_numeric_epochs() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .args(["train", "--epochs", "many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_serve_rejects_bad_address() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .args(["serve", "--addr", "not-an-address"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_predict_without_artifacts_is_unavailable() {
    let home = tempfile::tempdir().unwrap();
    let landmarks = serde_json::json!({ "landmarks": vec![0.0_f32; 1404] }).to_string();
    emotion(&home)
        .args(["predict", "--artifacts-dir", "empty"])
        .write_stdin(landmarks)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Model unavailable"));
}

#[test]
fn test_predict_checks_length_before_loading_artifacts() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .args(["predict", "--artifacts-dir", "empty"])
        .write_stdin("[0.1, 0.2, 0.3]")
        .assert()
        .code(2)
        .stderr(
            predicate::str::contains("expected 1404, got 3")
                .and(predicate::str::contains("Model unavailable").not()),
        );
}

#[test]
fn test_predict_rejects_malformed_json() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .arg("predict")
        .write_stdin("{\"landmarks\": ")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("landmarks"));
}

#[test]
fn test_artifacts_path_uses_flag() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .args(["artifacts", "path", "--artifacts-dir", "/opt/emotion"])
        .assert()
        .success()
        .stdout("/opt/emotion\n");
}

#[test]
fn test_artifacts_list_reports_missing_files() {
    let home = tempfile::tempdir().unwrap();
    emotion(&home)
        .args(["artifacts", "--artifacts-dir", "nowhere", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("✗ emotion_model.safetensors (missing)")
                .and(predicate::str::contains("✗ manifest.json (missing)")),
        );
}
