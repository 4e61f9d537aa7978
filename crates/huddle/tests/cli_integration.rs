//! CLI integration tests for the Huddle command-line interface.
//!
//! These tests do not start a server. They cover help output, argument
//! parsing, and the behavior of client commands against an unreachable
//! server.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// An unroutable server URL so client commands fail fast.
const DEAD_SERVER: &str = "http://127.0.0.1:1";

/// Get a command for the huddle binary, logging into a scratch directory.
fn huddle(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("huddle").unwrap();
    cmd.env("HUDDLE_CONFIG_DIR", config_dir.path())
        .env_remove("HUDDLE_SERVER_URL")
        .env_remove("HUDDLE_MESSAGING_KEY");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Huddle"))
        .stdout(predicate::str::contains("AI participant"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("huddle"));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("token"))
        .stdout(predicate::str::contains("reply"))
        .stdout(predicate::str::contains("chat"));
}

#[test]
fn test_no_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    huddle(&dir).assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Flag Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_global_flags_accepted() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .args(["--verbose", "--json", "--server", "http://localhost:9999", "--help"])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommand Help Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_start_help_lists_overrides() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Start the Huddle server"))
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--messaging-key"))
        .stdout(predicate::str::contains("--completion-url"))
        .stdout(predicate::str::contains("--mock"));
}

#[test]
fn test_chat_help() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .args(["chat", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--name"))
        .stdout(predicate::str::contains("huddle-chat"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Validation Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_start_rejects_invalid_port() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .args(["start", "--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_token_requires_client_id() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .arg("token")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CLIENT_ID"));
}

#[test]
fn test_reply_requires_message() {
    let dir = TempDir::new().unwrap();
    huddle(&dir).arg("reply").assert().failure();
}

#[test]
fn test_start_with_unreadable_config_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.toml");
    huddle(&dir)
        .args(["start", "--config"])
        .arg(&missing)
        .assert()
        .failure();
}

#[test]
fn test_start_with_malformed_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("huddle.toml");
    std::fs::write(&path, "[server\nport = ").unwrap();
    huddle(&dir)
        .args(["start", "--config"])
        .arg(&path)
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Unreachable Server Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_status_reports_not_running() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .args(["--server", DEAD_SERVER, "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}

#[test]
fn test_status_json_reports_not_running() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .args(["--json", "--server", DEAD_SERVER, "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"running\": false"));
}

#[test]
fn test_reply_fails_without_server() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .args(["--server", DEAD_SERVER, "reply", "hello"])
        .assert()
        .failure();
}

#[test]
fn test_server_url_from_env() {
    let dir = TempDir::new().unwrap();
    huddle(&dir)
        .env("HUDDLE_SERVER_URL", DEAD_SERVER)
        .args(["--json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains(DEAD_SERVER));
}
