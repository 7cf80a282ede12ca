use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_all_commands() {
    Command::cargo_bin("shiplog")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("eval"))
        .stdout(predicate::str::contains("dataset"));
}

#[test]
fn version_matches_crate_version() {
    Command::cargo_bin("shiplog")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn serve_help_documents_bind_flag() {
    Command::cargo_bin("shiplog")
        .unwrap()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"));
}

#[test]
fn eval_requires_a_dataset_argument() {
    Command::cargo_bin("shiplog")
        .unwrap()
        .arg("eval")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATASET"));
}
