//! Integration tests for configuration layering.
//!
//! Tests the full priority chain: hardcoded defaults < XDG config < project config < CLI args

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn emotion(home: &Path, cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("emotion").unwrap();
    cmd.current_dir(cwd)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"));
    cmd
}

fn write_xdg_config(home: &Path, content: &str) {
    let dir = home.join("config").join("emotion");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), content).unwrap();
}

#[test]
fn test_default_artifacts_dir_is_under_data_home() {
    let home = tempfile::tempdir().unwrap();
    emotion(home.path(), home.path())
        .args(["artifacts", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data/emotion/artifacts"));
}

#[test]
fn test_xdg_config_sets_artifacts_dir() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(home.path(), "[artifacts]\ndir = '/from/xdg'\n");

    emotion(home.path(), home.path())
        .args(["artifacts", "path"])
        .assert()
        .success()
        .stdout("/from/xdg\n");
}

#[test]
fn test_project_config_overrides_xdg() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(home.path(), "[artifacts]\ndir = '/from/xdg'\n");

    let project = home.path().join("project");
    let nested = project.join("src");
    fs::create_dir_all(&nested).unwrap();
    fs::write(project.join(".emotion.toml"), "[artifacts]\ndir = '/from/project'\n").unwrap();

    // Found by searching up from a subdirectory
    emotion(home.path(), &nested)
        .args(["artifacts", "path"])
        .assert()
        .success()
        .stdout("/from/project\n");
}

#[test]
fn test_cli_flag_overrides_project_config() {
    let home = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join(".emotion.toml"),
        "[artifacts]\ndir = '/from/project'\n",
    )
    .unwrap();

    emotion(home.path(), home.path())
        .args(["artifacts", "path", "--artifacts-dir", "/from/flag"])
        .assert()
        .success()
        .stdout("/from/flag\n");
}

#[test]
fn test_invalid_config_warns_and_continues() {
    let home = tempfile::tempdir().unwrap();
    fs::write(home.path().join(".emotion.toml"), "[training]\nepochs = 0\n").unwrap();

    emotion(home.path(), home.path())
        .args(["artifacts", "path"])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: training.epochs must be at least 1"));
}

#[test]
fn test_unparsable_config_is_ignored() {
    let home = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join(".emotion.toml"),
        "[artifacts\ndir = '/broken'\n",
    )
    .unwrap();

    emotion(home.path(), home.path())
        .args(["artifacts", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/broken").not());
}

#[test]
fn test_config_dataset_path_is_used_by_train() {
    let home = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join(".emotion.toml"),
        "[dataset]\npath = 'configured.csv'\n",
    )
    .unwrap();

    emotion(home.path(), home.path())
        .args(["train", "--quiet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("configured.csv"));
}
