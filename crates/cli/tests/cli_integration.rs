//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `rolltreppe` binary and verify exit
//! codes, stdout content, and stderr content. Every test runs in its own
//! temporary directory so state files and `rolltreppe.toml` never leak
//! between tests.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper: create a Command for the `rolltreppe` binary, rooted at `dir`.
fn rolltreppe(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("rolltreppe");
    cmd.current_dir(dir);
    cmd.env_remove("ROLLTREPPE_LOG");
    cmd
}

fn stdout_of(dir: &Path, args: &[&str]) -> String {
    let out = rolltreppe(dir).args(args).assert().success();
    String::from_utf8(out.get_output().stdout.clone()).unwrap()
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let dir = TempDir::new().unwrap();
    rolltreppe(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Escalator repair ticket chaincode"));
}

#[test]
fn version_exits_0() {
    let dir = TempDir::new().unwrap();
    rolltreppe(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rolltreppe"));
}

// ──────────────────────────────────────────────
// 2. init
// ──────────────────────────────────────────────

#[test]
fn init_creates_state_file_with_default_escalator() {
    let dir = TempDir::new().unwrap();
    rolltreppe(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized ledger"));
    assert!(dir.path().join("rolltreppe-ledger.json").exists());

    let esc = stdout_of(dir.path(), &["query", "getEscalatorState", "KI0001"]);
    let value: serde_json::Value = serde_json::from_str(esc.trim()).unwrap();
    assert_eq!(value["Trainstation"], "Kiel Hbf");
    assert_eq!(value["IsWorking"], true);

    rolltreppe(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn init_json_output() {
    let dir = TempDir::new().unwrap();
    let out = stdout_of(dir.path(), &["--output", "json", "init"]);
    let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
    assert_eq!(value["initialized"], true);
}

// ──────────────────────────────────────────────
// 3. invoke / query
// ──────────────────────────────────────────────

#[test]
fn invoke_persists_between_runs() {
    let dir = TempDir::new().unwrap();
    let id = stdout_of(
        dir.path(),
        &[
            "invoke",
            "createTicket",
            "Kiel Hbf",
            "Gleis 1",
            "KI0001",
            "Motor",
            "E-1",
            "steht",
        ],
    );
    assert_eq!(id.trim(), "0001");

    stdout_of(dir.path(), &["invoke", "assignTicket", "0001", "Foo GmbH"]);

    let found = stdout_of(
        dir.path(),
        &["query", "getTicketsByStatus", "ZUGEWIESEN", "foo gmbh"],
    );
    let tickets: Vec<serde_json::Value> = serde_json::from_str(found.trim()).unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["TicketID"], "0001");
    assert_eq!(tickets[0]["RepairStatus"], "Wird geprueft");

    let counter = stdout_of(dir.path(), &["query", "getTicketCounter"]);
    assert_eq!(counter.trim(), "1");
}

#[test]
fn query_json_wraps_payload() {
    let dir = TempDir::new().unwrap();
    let out = stdout_of(dir.path(), &["--output", "json", "query", "getAllTickets"]);
    let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
    assert_eq!(value["payload"], serde_json::json!([]));

    let out = stdout_of(dir.path(), &["--output", "json", "invoke", "createDefaultTicket"]);
    let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
    assert_eq!(value["payload"], "0001");
}

#[test]
fn illegal_transition_exits_1_with_error() {
    let dir = TempDir::new().unwrap();
    stdout_of(dir.path(), &["invoke", "createDefaultTicket"]);
    rolltreppe(dir.path())
        .args(["invoke", "finishRepair", "0001"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("IllegalTransition"));
}

#[test]
fn unknown_function_exits_1() {
    let dir = TempDir::new().unwrap();
    rolltreppe(dir.path())
        .args(["query", "getEverything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("UnknownFunction"));
}

#[test]
fn query_refuses_mutating_function() {
    let dir = TempDir::new().unwrap();
    rolltreppe(dir.path())
        .args(["query", "createDefaultTicket"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidArguments"));
    let counter = stdout_of(dir.path(), &["query", "getTicketCounter"]);
    assert_eq!(counter.trim(), "0");
}

#[test]
fn first_call_seeds_default_escalator() {
    let dir = TempDir::new().unwrap();
    let esc = stdout_of(dir.path(), &["query", "getEscalatorState", "KI0001"]);
    let value: serde_json::Value = serde_json::from_str(esc.trim()).unwrap();
    assert_eq!(value["EscalatorID"], "KI0001");
    assert!(dir.path().join("rolltreppe-ledger.json").exists());

    stdout_of(dir.path(), &["invoke", "createDefaultTicket"]);
    let raw = stdout_of(dir.path(), &["query", "getFullTicket", "0001"]);
    let ticket: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
    assert_eq!(ticket["Trainstation"], "Kiel Hbf");
    assert_eq!(ticket["Platform"], "Gleis 5");
    assert_eq!(ticket["Device"], "KI0001");

    rolltreppe(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn json_errors_go_to_stderr() {
    let dir = TempDir::new().unwrap();
    let out = rolltreppe(dir.path())
        .args(["--output", "json", "query", "getFullTicket", "0042"])
        .assert()
        .failure();
    let stderr = String::from_utf8(out.get_output().stderr.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert!(value["error"].as_str().unwrap().starts_with("NotFound"));
}

#[test]
fn quiet_suppresses_errors() {
    let dir = TempDir::new().unwrap();
    rolltreppe(dir.path())
        .args(["--quiet", "query", "getFullTicket", "0042"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 4. Settings
// ──────────────────────────────────────────────

#[test]
fn state_flag_selects_ledger_file() {
    let dir = TempDir::new().unwrap();
    stdout_of(dir.path(), &["--state", "other.json", "invoke", "createDefaultTicket"]);
    assert!(dir.path().join("other.json").exists());
    assert!(!dir.path().join("rolltreppe-ledger.json").exists());
}

#[test]
fn config_file_sets_state_file_and_scan_policy() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("rolltreppe.toml"),
        "[ledger]\nstate_file = \"fleet.json\"\n\n[scan]\nmalformed = \"abort\"\n",
    )
    .unwrap();
    stdout_of(dir.path(), &["invoke", "createDefaultTicket"]);
    assert!(dir.path().join("fleet.json").exists());

    let all = stdout_of(dir.path(), &["query", "getAllTickets"]);
    let tickets: Vec<serde_json::Value> = serde_json::from_str(all.trim()).unwrap();
    assert_eq!(tickets.len(), 1);
}

#[test]
fn missing_explicit_config_exits_1() {
    let dir = TempDir::new().unwrap();
    rolltreppe(dir.path())
        .args(["--config", "absent.toml", "query", "getAllTickets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read"));
}

#[test]
fn corrupt_state_file_exits_1() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("rolltreppe-ledger.json"), "not json").unwrap();
    rolltreppe(dir.path())
        .args(["query", "getAllTickets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not load"));
}
