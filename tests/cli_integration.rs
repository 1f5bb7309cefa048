//! Integration tests for the `tp` CLI.
//!
//! Each test creates a temp workspace, runs `tp` as a subprocess, and
//! verifies stdout and/or the files under `.taskpanel/`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Get the path to the built `tp` binary.
fn tp_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tp"))
}

/// Initialize a fresh workspace in a new temp directory.
fn workspace() -> tempfile::TempDir {
    let tmp = tempfile::TempDir::new().unwrap();
    run_tp_ok(tmp.path(), &["init"]);
    tmp
}

/// Run `tp` with the given args in the given directory, returning (stdout, stderr, success).
fn run_tp(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tp_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run tp");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `tp` expecting success, return stdout.
fn run_tp_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tp(dir, args);
    if !success {
        panic!("tp {:?} failed:\nstdout: {}\nstderr: {}", args, stdout, stderr);
    }
    stdout
}

/// Run `tp` with `input` on stdin, return stdout.
fn run_tp_stdin(dir: &Path, args: &[&str], input: &str) -> String {
    let mut child = Command::new(tp_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run tp");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(
        output.status.success(),
        "tp {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn add(dir: &Path, args: &[&str]) -> String {
    let mut full = vec!["add"];
    full.extend_from_slice(args);
    run_tp_ok(dir, &full).trim().to_string()
}

fn stored_tasks(dir: &Path) -> Vec<serde_json::Value> {
    let raw = fs::read_to_string(dir.join(".taskpanel/tasks.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn section<'a>(sections: &'a serde_json::Value, group: &str) -> &'a Vec<serde_json::Value> {
    sections
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["group"] == group)
        .unwrap_or_else(|| panic!("no section {}", group))["tasks"]
        .as_array()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_workspace() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_tp_ok(tmp.path(), &["init"]);
    assert!(out.contains("Initialized taskpanel workspace"));
    assert!(tmp.path().join(".taskpanel/config.toml").is_file());
    assert!(stored_tasks(tmp.path()).is_empty());

    let (_, stderr, success) = run_tp(tmp.path(), &["init"]);
    assert!(!success);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_init_with_workspace_dir_flag() {
    let target = tempfile::TempDir::new().unwrap();
    let elsewhere = tempfile::TempDir::new().unwrap();
    let dir = target.path().to_str().unwrap();

    run_tp_ok(elsewhere.path(), &["init", "-C", dir]);
    assert!(target.path().join(".taskpanel/tasks.json").is_file());
    assert!(!elsewhere.path().join(".taskpanel").exists());
    run_tp_ok(elsewhere.path(), &["list", "-C", dir]);
}

#[test]
fn test_outside_workspace_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_tp(tmp.path(), &["list"]);
    assert!(!success);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_workspace_dir_flag() {
    let tmp = workspace();
    let elsewhere = tempfile::TempDir::new().unwrap();
    let dir = tmp.path().to_str().unwrap();

    let id = add(elsewhere.path(), &["-C", dir, "From afar"]);
    let out = run_tp_ok(tmp.path(), &["show", &id]);
    assert!(out.contains("From afar"));
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[test]
fn test_add_and_show() {
    let tmp = workspace();
    let id = add(
        tmp.path(),
        &["Write docs", "-p", "must", "-d", "Cover the CLI", "--due", "2030-01-15"],
    );

    let out = run_tp_ok(tmp.path(), &["show", &id]);
    assert!(out.contains("Write docs"));
    assert!(out.contains("priority: Must"));
    assert!(out.contains("due: 2030-01-15"));
    assert!(out.contains("Cover the CLI"));

    let tasks = stored_tasks(tmp.path());
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], id.as_str());
    assert_eq!(tasks[0]["status"], "Todo");
    assert!(tasks[0]["order"].is_number());
}

#[test]
fn test_add_uses_configured_default_priority() {
    let tmp = workspace();
    run_tp_ok(tmp.path(), &["config", "set", "general.default_priority", "Could"]);
    add(tmp.path(), &["Later"]);
    assert_eq!(stored_tasks(tmp.path())[0]["priority"], "Could");
}

#[test]
fn test_status_done_sets_completed() {
    let tmp = workspace();
    let id = add(tmp.path(), &["Ship it"]);

    run_tp_ok(tmp.path(), &["status", &id, "done"]);
    let tasks = stored_tasks(tmp.path());
    assert_eq!(tasks[0]["status"], "Done");
    assert_eq!(tasks[0]["completed"], true);

    run_tp_ok(tmp.path(), &["status", &id, "in-progress"]);
    let tasks = stored_tasks(tmp.path());
    assert_eq!(tasks[0]["status"], "In Progress");
    assert_eq!(tasks[0]["completed"], false);
}

#[test]
fn test_unknown_task_fails() {
    let tmp = workspace();
    let (_, stderr, success) = run_tp(tmp.path(), &["status", "nope", "done"]);
    assert!(!success);
    assert!(stderr.contains("nope"));
}

#[test]
fn test_empty_title_rejected() {
    let tmp = workspace();
    let id = add(tmp.path(), &["Keep me"]);
    let (_, _, success) = run_tp(tmp.path(), &["title", &id, "   "]);
    assert!(!success);
    assert_eq!(stored_tasks(tmp.path())[0]["text"], "Keep me");
}

#[test]
fn test_list_json_sections() {
    let tmp = workspace();
    let a = add(tmp.path(), &["Alpha"]);
    let b = add(tmp.path(), &["Beta"]);
    run_tp_ok(tmp.path(), &["status", &b, "done"]);

    let out = run_tp_ok(tmp.path(), &["list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let groups: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["group"].as_str().unwrap())
        .collect();
    assert_eq!(groups, vec!["Todo", "Ready", "In Progress", "Testing", "Done"]);
    assert_eq!(section(&parsed, "Todo")[0]["id"], a.as_str());
    assert_eq!(section(&parsed, "Done")[0]["id"], b.as_str());
}

#[test]
fn test_list_hides_completed_when_configured() {
    let tmp = workspace();
    add(tmp.path(), &["Open task"]);
    let done = add(tmp.path(), &["Closed task"]);
    run_tp_ok(tmp.path(), &["status", &done, "done"]);

    run_tp_ok(tmp.path(), &["settings", "--hide-completed", "true"]);
    let out = run_tp_ok(tmp.path(), &["list"]);
    assert!(out.contains("Open task"));
    assert!(!out.contains("Closed task"));

    let out = run_tp_ok(tmp.path(), &["list", "--all"]);
    assert!(out.contains("Closed task"));
}

#[test]
fn test_mv_before_reorders() {
    let tmp = workspace();
    let a = add(tmp.path(), &["A"]);
    let b = add(tmp.path(), &["B"]);
    let c = add(tmp.path(), &["C"]);

    run_tp_ok(tmp.path(), &["mv", &c, "--before", &a]);

    let out = run_tp_ok(tmp.path(), &["list", "--json", "--sort", "custom"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let ids: Vec<&str> = section(&parsed, "Todo")
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![c.as_str(), a.as_str(), b.as_str()]);
}

#[test]
fn test_mv_into_other_status_group() {
    let tmp = workspace();
    let a = add(tmp.path(), &["A"]);
    let b = add(tmp.path(), &["B", "-s", "testing"]);

    run_tp_ok(tmp.path(), &["mv", &a, "--status", "testing", "--before", &b]);

    let tasks = stored_tasks(tmp.path());
    let moved = tasks.iter().find(|t| t["id"] == a.as_str()).unwrap();
    assert_eq!(moved["status"], "Testing");
}

#[test]
fn test_rm_removes_task() {
    let tmp = workspace();
    let a = add(tmp.path(), &["A"]);
    add(tmp.path(), &["B"]);

    run_tp_ok(tmp.path(), &["rm", &a]);
    let tasks = stored_tasks(tmp.path());
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["text"], "B");
}

#[test]
fn test_subtasks() {
    let tmp = workspace();
    let id = add(tmp.path(), &["Parent"]);

    let sub = run_tp_ok(tmp.path(), &["sub", "add", &id, "Child"]).trim().to_string();
    assert_eq!(run_tp_ok(tmp.path(), &["sub", "toggle", &id, &sub]).trim(), "done");

    let out = run_tp_ok(tmp.path(), &["list"]);
    assert!(out.contains("[1/1]"));

    run_tp_ok(tmp.path(), &["sub", "rm", &id, &sub]);
    assert!(stored_tasks(tmp.path())[0].get("subtasks").is_none());
}

// ---------------------------------------------------------------------------
// Dates and reminders
// ---------------------------------------------------------------------------

#[test]
fn test_remind_adds_and_clears() {
    let tmp = workspace();
    let id = add(tmp.path(), &["Call back", "--remind", "2030-02-01 09:00"]);

    run_tp_ok(tmp.path(), &["remind", &id, "2030-01-01 09:00"]);
    let tasks = stored_tasks(tmp.path());
    let reminders = tasks[0]["reminders"].as_array().unwrap();
    assert_eq!(reminders.len(), 2);
    assert!(reminders[0].as_i64().unwrap() < reminders[1].as_i64().unwrap());

    run_tp_ok(tmp.path(), &["remind", &id, "--clear"]);
    assert!(stored_tasks(tmp.path())[0].get("reminders").is_none());
}

#[test]
fn test_one_shot_commands_leave_overdue_reminders() {
    let tmp = workspace();
    let id = add(tmp.path(), &["Overdue", "--remind", "2001-01-01"]);

    run_tp_ok(tmp.path(), &["list"]);
    run_tp_ok(tmp.path(), &["show", &id]);
    assert_eq!(
        stored_tasks(tmp.path())[0]["reminders"].as_array().unwrap().len(),
        1
    );
}

#[test]
fn test_due_clear() {
    let tmp = workspace();
    let id = add(tmp.path(), &["Deadline", "--due", "2030-03-01"]);
    run_tp_ok(tmp.path(), &["due", &id, "--clear"]);
    assert!(stored_tasks(tmp.path())[0].get("dueDate").is_none());
}

#[test]
fn test_bad_date_rejected() {
    let tmp = workspace();
    let (_, stderr, success) = run_tp(tmp.path(), &["add", "X", "--due", "someday"]);
    assert!(!success);
    assert!(stderr.contains("someday"));
    assert!(stored_tasks(tmp.path()).is_empty());
}

// ---------------------------------------------------------------------------
// Stats, settings, config
// ---------------------------------------------------------------------------

#[test]
fn test_stats_follow_config() {
    let tmp = workspace();
    let a = add(tmp.path(), &["A", "-p", "must"]);
    add(tmp.path(), &["B", "-p", "could"]);
    run_tp_ok(tmp.path(), &["status", &a, "done"]);

    let out = run_tp_ok(tmp.path(), &["stats", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["total"], 2);
    assert_eq!(parsed["done"], 1);
    assert_eq!(parsed["must"], 1);

    run_tp_ok(tmp.path(), &["config", "set", "stats.show_done", "false"]);
    let out = run_tp_ok(tmp.path(), &["stats", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(parsed.get("done").is_none());
    assert_eq!(parsed["total"], 2);
}

#[test]
fn test_settings_persist_per_view() {
    let tmp = workspace();
    run_tp_ok(
        tmp.path(),
        &["settings", "--view", "full", "--mode", "kanban", "--collapse", "Done"],
    );

    let out = run_tp_ok(tmp.path(), &["settings", "--view", "full", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["viewMode"], "kanban");
    assert_eq!(parsed["collapsedSections"], serde_json::json!(["Done"]));

    let out = run_tp_ok(tmp.path(), &["settings", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["viewMode"], "list");
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let tmp = workspace();
    let before = fs::read_to_string(tmp.path().join(".taskpanel/config.toml")).unwrap();

    let (_, _, success) = run_tp(tmp.path(), &["config", "set", "stats.nope", "true"]);
    assert!(!success);
    let (_, _, success) = run_tp(tmp.path(), &["config", "set", "stats.show_done", "maybe"]);
    assert!(!success);

    let after = fs::read_to_string(tmp.path().join(".taskpanel/config.toml")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_config_show_json() {
    let tmp = workspace();
    let out = run_tp_ok(tmp.path(), &["config", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["stats"]["show_total"], true);
    assert!(parsed["reminders"]["grace_ms"].is_number());
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

#[test]
fn test_apply_answers_each_line() {
    let tmp = workspace();
    let input = concat!(
        r#"{"type":"addTask","value":{"text":"From host","priority":"Should"}}"#,
        "\n",
        r#"{"type":"ready","viewType":"sidebar"}"#,
        "\n",
        "not json\n",
        r#"{"type":"deleteTask","id":"missing"}"#,
        "\n",
    );
    let out = run_tp_stdin(tmp.path(), &["apply"], input);
    let responses: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 4);

    assert_eq!(responses[0]["type"], "updateTasks");
    assert_eq!(responses[0]["tasks"][0]["text"], "From host");
    assert!(responses[0].get("settings").is_none());

    assert_eq!(responses[1]["type"], "updateTasks");
    assert!(responses[1]["settings"].is_object());

    assert_eq!(responses[2]["type"], "error");
    assert_eq!(responses[3]["type"], "error");

    assert_eq!(stored_tasks(tmp.path()).len(), 1);
}
