//! Driver surface tests: phase selection, dry runs, and exit codes.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

fn newsloom(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("newsloom").unwrap();
    cmd.current_dir(dir)
        .env("NEWSLOOM_DB", dir.join("db/newsloom.db"));
    cmd
}

#[test]
fn no_phase_selected_is_an_error() {
    let dir = tempdir().unwrap();
    newsloom(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no phase selected"));
}

#[test]
fn verify_on_a_fresh_store_passes() {
    let dir = tempdir().unwrap();
    newsloom(dir.path())
        .arg("--verify")
        .assert()
        .success()
        .stdout(predicate::str::contains("all invariants hold"));

    // The phase log landed next to the run log.
    let logs: Vec<_> = std::fs::read_dir(dir.path().join("log"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert!(logs.iter().any(|name| name.starts_with("phase_verify_")));
    assert!(logs.iter().any(|name| name.starts_with("pipeline_")));
}

#[test]
fn dry_run_mine_previews_without_side_effects() {
    let dir = tempdir().unwrap();
    newsloom(dir.path())
        .args(["--mine", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would crawl 0 feeds"));

    // No generated-content tree appears on a dry run.
    assert!(!dir.path().join("website").exists());
}

#[test]
fn deepseek_without_an_api_key_fails_the_phase() {
    let dir = tempdir().unwrap();
    newsloom(dir.path())
        .arg("--deepseek")
        .assert()
        .failure()
        .stdout(predicate::str::contains("❌ phase deepseek"));
}

#[test]
fn purge_dry_run_reports_what_it_would_delete() {
    let dir = tempdir().unwrap();
    newsloom(dir.path())
        .args(["--purge", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run, nothing deleted"));
}

#[test]
fn articles_per_seed_accepts_an_integer() {
    let dir = tempdir().unwrap();
    newsloom(dir.path())
        .args(["--mine", "--dry-run", "--articles-per-seed", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("x 5 articles"));
}
