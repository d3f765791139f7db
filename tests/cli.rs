use assert_cmd::Command;
use predicates::prelude::*;

fn raccoon(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("raccoon").unwrap();
    cmd.env("HOME", home).env_remove("RACCOON_API_KEY");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("raccoon")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_status_before_init() {
    let home = tempfile::tempdir().unwrap();
    raccoon(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ledger not found"));
}

#[test]
fn test_init_creates_ledger() {
    let home = tempfile::tempdir().unwrap();
    let data_dir = home.path().join("books");
    raccoon(home.path())
        .args(["init", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ledger created"));
    assert!(data_dir.join("raccoon.db").exists());

    raccoon(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Records:    0"));
}

#[test]
fn test_chat_builtin_works_without_api_key() {
    let home = tempfile::tempdir().unwrap();
    let data_dir = home.path().join("books");
    raccoon(home.path())
        .args(["init", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success();

    raccoon(home.path())
        .args(["chat", "--message", "check balance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Income"));

    raccoon(home.path())
        .args(["chat", "--message", "help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Record"));
}

#[test]
fn test_chat_without_init_points_at_setup() {
    let home = tempfile::tempdir().unwrap();
    raccoon(home.path())
        .args(["chat", "--message", "help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("raccoon init"));
}
