//! Tests for the CLI module.

use super::*;
use crate::config::{KEY_VAR, TABLE_VAR, URL_VAR};
use clap::Parser;
use serde_json::json;
use serial_test::serial;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("mytodo").chain(args.iter().copied())).unwrap()
}

/// Run a command against a SQLite database inside `dir`.
async fn run_sqlite(dir: &TempDir, args: &[&str]) -> CliOutput {
    let db = dir.path().join("tasks.db");
    let db = db.to_str().unwrap();
    let mut full = vec!["--sqlite", db];
    full.extend_from_slice(args);
    run_in(parse(&full), dir.path()).await
}

fn clear_store_env() {
    for var in [URL_VAR, KEY_VAR, TABLE_VAR] {
        std::env::remove_var(var);
    }
}

#[test]
fn test_command_needs_store() {
    assert!(!Command::Version.needs_store());
    assert!(Command::Shell.needs_store());
    assert!(Command::List { hide_completed: false }.needs_store());
    assert!(Command::Delete { id: "1".to_string() }.needs_store());
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = parse(&["list", "--hide-completed", "--json", "-v"]);
    assert!(cli.json);
    assert!(cli.verbose);
    assert_eq!(cli.command, Command::List { hide_completed: true });
}

#[test]
fn test_parse_edit_requires_text() {
    assert!(Cli::try_parse_from(["mytodo", "edit", "1"]).is_err());
}

#[tokio::test]
async fn test_run_version() {
    let output = run_in(parse(&["version"]), Path::new(".")).await;
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert_eq!(output.stdout, vec![format!("mytodo v{}", crate::VERSION)]);
}

#[tokio::test]
async fn test_add_then_list() {
    let dir = TempDir::new().unwrap();

    let output = run_sqlite(&dir, &["add", "Buy milk"]).await;
    assert_eq!(output.exit_code, ExitCode::SUCCESS, "stderr: {:?}", output.stderr);
    assert!(output.stdout[0].contains("[ ] 1  Buy milk"));

    run_sqlite(&dir, &["add", "Walk dog"]).await;
    let output = run_sqlite(&dir, &["list"]).await;
    let text = &output.stdout[0];
    let walk = text.find("Walk dog").unwrap();
    let milk = text.find("Buy milk").unwrap();
    assert!(walk < milk, "newest task should be listed first:\n{text}");
}

#[tokio::test]
async fn test_add_rejects_short_text() {
    let dir = TempDir::new().unwrap();

    let output = run_sqlite(&dir, &["add", "  ab "]).await;
    assert_eq!(output.exit_code, ExitCode::from(1));
    assert!(output.stderr[0].contains("at least 3 characters"));

    let output = run_sqlite(&dir, &["list"]).await;
    assert!(output.stdout[0].contains("List is Empty"));
}

#[tokio::test]
async fn test_edit_replaces_text() {
    let dir = TempDir::new().unwrap();
    run_sqlite(&dir, &["add", "Buy milk"]).await;

    let output = run_sqlite(&dir, &["edit", "1", "Buy oat milk"]).await;
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert!(output.stdout[0].contains("1  Buy oat milk"));
    assert!(output.stdout[0].starts_with("Add your list"), "edit mode should end after saving");
}

#[tokio::test]
async fn test_toggle_and_hide_completed() {
    let dir = TempDir::new().unwrap();
    run_sqlite(&dir, &["add", "Buy milk"]).await;
    run_sqlite(&dir, &["add", "Walk dog"]).await;

    let output = run_sqlite(&dir, &["toggle", "1"]).await;
    assert!(output.stdout[0].contains("[x] 1  Buy milk"));

    let output = run_sqlite(&dir, &["list", "--hide-completed"]).await;
    assert!(output.stdout[0].contains("[ ] Show Finished"));
    assert!(output.stdout[0].contains("Walk dog"));
    assert!(!output.stdout[0].contains("Buy milk"));
}

#[tokio::test]
async fn test_delete_removes_task() {
    let dir = TempDir::new().unwrap();
    run_sqlite(&dir, &["add", "Buy milk"]).await;

    let output = run_sqlite(&dir, &["delete", "1"]).await;
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert!(output.stdout[0].contains("List is Empty"));
}

#[tokio::test]
async fn test_unknown_id_is_reported() {
    let dir = TempDir::new().unwrap();

    for args in [&["toggle", "9"][..], &["delete", "9"], &["edit", "9", "Anything"]] {
        let output = run_sqlite(&dir, args).await;
        assert_eq!(output.exit_code, ExitCode::from(1));
        assert_eq!(output.stderr, vec!["Task not found: 9".to_string()]);
    }
}

#[tokio::test]
async fn test_json_output() {
    let dir = TempDir::new().unwrap();
    run_sqlite(&dir, &["add", "Buy milk"]).await;

    let output = run_sqlite(&dir, &["--json", "list"]).await;
    let value: serde_json::Value = serde_json::from_str(&output.stdout[0]).unwrap();
    assert_eq!(value["submit_label"], "Save");
    assert_eq!(value["error"], serde_json::Value::Null);
    assert_eq!(value["rows"][0]["text"], "Buy milk");
    assert_eq!(value["rows"][0]["done"], false);
}

#[tokio::test]
#[serial]
async fn test_unconfigured_remote_store_reports_and_fails() {
    clear_store_env();
    let dir = TempDir::new().unwrap();

    let output = run_in(parse(&["list"]), dir.path()).await;

    assert_eq!(output.exit_code, ExitCode::from(1));
    assert!(output.stderr[0].contains("SUPABASE_URL, SUPABASE_ANON_KEY are not set"));
    assert!(output.stdout[0].contains("! task store is not configured"));
}

#[tokio::test]
#[serial]
async fn test_missing_explicit_config_file() {
    clear_store_env();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.yaml");

    let output =
        run_in(parse(&["--config", missing.to_str().unwrap(), "list"]), dir.path()).await;

    assert_eq!(output.exit_code, ExitCode::from(1));
    assert!(output.stderr[0].starts_with("Error opening task store"));
}

#[tokio::test]
#[serial]
async fn test_remote_store_from_config_file() {
    clear_store_env();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/todos"))
        .and(header("apikey", "file-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 4, "todo": "Water plants", "is_completed": false,
             "created_at": "2024-05-01T09:00:00+00:00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("mytodo.yaml"),
        format!("url: {}\nanon_key: file-key\ntable: todos\n", server.uri()),
    )
    .unwrap();

    let output = run_in(parse(&["list"]), dir.path()).await;

    assert_eq!(output.exit_code, ExitCode::SUCCESS, "stderr: {:?}", output.stderr);
    assert!(output.stderr.is_empty());
    assert!(output.stdout[0].contains("[ ] 4  Water plants"));
}
