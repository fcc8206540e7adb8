//! CLI tests for the taskloom binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Command with logs and user config redirected into `home`
fn taskloom(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("taskloom").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CONFIG_HOME", home.join("config"));
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const WORKFLOW: &str = r#"
name: release
tasks:
  - id: build
    role: coder
    description: build the release
    estimated-ms: 40
  - id: notes
    role: writer
    description: draft notes
    estimated-ms: 30
  - id: review
    role: reviewer
    description: review everything
    estimated-ms: 20
    deps: [build, notes]
"#;

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    taskloom(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("simulate"));
}

#[test]
fn test_resolve_prints_chain() {
    let dir = TempDir::new().unwrap();
    let batch = write(
        &dir,
        "batch.yml",
        r#"
- tool: read_file
  input: { path: a.txt }
- tool: write_file
  input: { path: a.txt, content: hi }
- tool: read_file
  input: { file: a.txt }
"#,
    );

    taskloom(dir.path())
        .arg("resolve")
        .arg(&batch)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 actions"))
        .stdout(predicate::str::contains("deps=1-1"))
        .stdout(predicate::str::contains("exclusive"));
}

#[test]
fn test_resolve_json_batch_as_json() {
    let dir = TempDir::new().unwrap();
    let batch = write(
        &dir,
        "batch.json",
        r#"{"actions": [{"name": "git_status"}, {"name": "git_diff", "args": {"staged": true}}]}"#,
    );

    let output = taskloom(dir.path())
        .args(["--format", "json", "resolve"])
        .arg(&batch)
        .output()
        .unwrap();
    assert!(output.status.success());

    let actions: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(actions.as_array().unwrap().len(), 2);
    assert_eq!(actions[0]["tool"], "git_status");
    assert_eq!(actions[1]["parallel_safe"], true);
}

#[test]
fn test_resolve_rejects_unknown_tool() {
    let dir = TempDir::new().unwrap();
    let batch = write(&dir, "batch.yml", "- tool: format_disk\n");

    taskloom(dir.path())
        .arg("resolve")
        .arg(&batch)
        .assert()
        .failure()
        .stderr(predicate::str::contains("format_disk"));
}

#[test]
fn test_check_prints_waves() {
    let dir = TempDir::new().unwrap();
    let flow = write(&dir, "flow.yml", WORKFLOW);

    taskloom(dir.path())
        .arg("check")
        .arg(&flow)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 tasks in 2 waves"))
        .stdout(predicate::str::contains("wave 1: build, notes"))
        .stdout(predicate::str::contains("wave 2: review"));
}

#[test]
fn test_check_reports_cycle() {
    let dir = TempDir::new().unwrap();
    let flow = write(
        &dir,
        "cycle.yml",
        r#"
tasks:
  - { id: a, role: coder, description: a, deps: [b] }
  - { id: b, role: coder, description: b, deps: [a] }
"#,
    );

    taskloom(dir.path())
        .arg("check")
        .arg(&flow)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dependency cycle"));
}

#[test]
fn test_simulate_reports_statistics() {
    let dir = TempDir::new().unwrap();
    let flow = write(&dir, "flow.yml", WORKFLOW);

    taskloom(dir.path())
        .arg("simulate")
        .arg(&flow)
        .args(["--parallelism", "2", "--time-scale", "0.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 total, 3 succeeded, 0 failed"))
        .stdout(predicate::str::contains("Parallelism: 2"));
}

#[test]
fn test_simulate_json_with_failure() {
    let dir = TempDir::new().unwrap();
    let flow = write(
        &dir,
        "flow.yml",
        r#"
tasks:
  - { id: a, role: coder, description: "compile [fail]", estimated-ms: 5 }
  - { id: b, role: coder, description: "docs", estimated-ms: 5 }
  - { id: c, role: tester, description: "test", deps: [{ id: a, requires-success: true }] }
"#,
    );

    let output = taskloom(dir.path())
        .args(["-f", "json", "simulate"])
        .arg(&flow)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["synthesis"]["success"], false);
    assert_eq!(report["synthesis"]["stats"]["failed"], 2);
    assert_eq!(report["results"].as_array().unwrap().len(), 3);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "taskloom.yml", "concurrency:\n  role-parallelism: 0\n");
    let flow = write(&dir, "flow.yml", WORKFLOW);

    taskloom(dir.path())
        .arg("-c")
        .arg(&config)
        .arg("check")
        .arg(&flow)
        .assert()
        .failure()
        .stderr(predicate::str::contains("role-parallelism"));
}
