//! End-to-end checks of the admin binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn coretask(db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("coretask").unwrap();
    cmd.arg("--db").arg(db);
    cmd
}

#[test]
fn health_reports_ok_on_a_fresh_database() {
    let dir = tempfile::tempdir().unwrap();
    coretask(&dir.path().join("t.db"))
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn stats_counts_the_seeded_data() {
    let dir = tempfile::tempdir().unwrap();
    coretask(&dir.path().join("t.db"))
        .args(["--format", "json", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tasks\": 2"));
}

#[test]
fn export_then_import_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let db_a = dir.path().join("a.db");
    let db_b = dir.path().join("b.db");
    let snapshot = dir.path().join("snapshot.json");

    coretask(&db_a)
        .arg("export")
        .arg("--output")
        .arg(&snapshot)
        .assert()
        .success();

    coretask(&db_b)
        .arg("import")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("version 1.0.0"));
}

#[test]
fn reset_requires_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    coretask(&dir.path().join("t.db"))
        .arg("reset")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn import_of_malformed_json_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{\"tasks\": 42}").unwrap();

    coretask(&dir.path().join("t.db"))
        .arg("import")
        .arg(&bad)
        .assert()
        .failure();
}
