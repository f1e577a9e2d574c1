//! Integration tests for task commands via CLI.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_task_add_is_open() {
    let env = TestEnv::new();

    env.parley()
        .args(["task", "add", "file taxes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":1"));

    env.parley()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"open\""))
        .stdout(predicate::str::contains("file taxes"));
}

#[test]
fn test_task_close_moves_to_done() {
    let env = TestEnv::new();
    env.parley().args(["task", "add", "ship it"]).assert().success();

    env.parley()
        .args(["-H", "task", "close", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Closed task #1"));

    env.parley()
        .args(["-H", "task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No open tasks."));

    env.parley()
        .args(["-H", "task", "list", "--status", "done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 [done] ship it"));
}

#[test]
fn test_task_close_twice_succeeds() {
    let env = TestEnv::new();
    env.parley().args(["task", "add", "ship it"]).assert().success();

    env.parley().args(["task", "close", "1"]).assert().success();
    env.parley()
        .args(["task", "close", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"done\""));
}

#[test]
fn test_task_close_missing_fails_without_side_effects() {
    let env = TestEnv::new();
    env.parley().args(["task", "add", "stay open"]).assert().success();

    env.parley()
        .args(["task", "close", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found: #99"));

    env.parley()
        .args(["-H", "task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 [open] stay open"));
}

#[test]
fn test_task_list_invalid_status() {
    let env = TestEnv::new();

    env.parley()
        .args(["task", "list", "--status", "pending"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid status"));
}

#[test]
fn test_task_add_blank_fails() {
    let env = TestEnv::new();

    env.parley()
        .args(["-H", "task", "add", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: task content must not be empty"));
}
