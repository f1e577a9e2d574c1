//! Integration tests for `ask` and `chat` via CLI.
//!
//! No test reaches a real completion API: either no key is configured, or the
//! API base points at a closed local port.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_ask_without_key_fails_before_any_turn() {
    let env = TestEnv::new();

    env.parley()
        .args(["ask", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_chat_without_key_fails() {
    let env = TestEnv::new();

    env.parley()
        .arg("chat")
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stdout(predicate::str::contains("assistant>").not())
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_ask_empty_message_fails() {
    let env = TestEnv::new();

    env.parley_offline()
        .args(["ask", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("message must not be empty"));
}

#[test]
fn test_ask_transport_error_is_reported_as_outcome() {
    let env = TestEnv::new();

    env.parley_offline()
        .args(["ask", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\":\"transport_error\""))
        .stdout(predicate::str::contains("Completion API error"));
}

#[test]
fn test_chat_session_survives_transport_errors() {
    let env = TestEnv::new();

    env.parley_offline()
        .arg("chat")
        .write_stdin("hello\nstill there?\n/clear\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("assistant> Hey! Ask me anything."))
        .stdout(predicate::str::contains("Completion API error").count(2))
        .stdout(predicate::str::contains("Conversation cleared."));
}

#[test]
fn test_chat_ends_on_eof() {
    let env = TestEnv::new();

    env.parley_offline()
        .arg("chat")
        .write_stdin("/help\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("/quit"));
}
