//! Smoke tests for the weblocator CLI
//!
//! These tests run the built binary end to end against small fixtures.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the weblocator binary
fn weblocator() -> Command {
    let mut cmd = Command::cargo_bin("weblocator").expect("weblocator binary should exist");
    cmd.env_remove("WEBLOCATOR_CONFIG").env_remove("RUST_LOG");
    cmd
}

const PAGE: &str = r"
body:
  rect: { left: 0, top: 0, width: 360, height: 640 }
  children:
    - tag: a
      attrs: { id: home, class: nav, href: / }
      rect: { left: 0, top: 0, width: 60, height: 20 }
      children:
        - text: Home
          rect: { left: 2, top: 0, width: 30, height: 20 }
    - tag: a
      attrs: { class: nav, href: /about }
      rect: { left: 70, top: 0, width: 60, height: 20 }
      children:
        - text: About
          rect: { left: 72, top: 0, width: 34, height: 20 }
    - tag: input
      attrs: { name: q }
      value: ''
      rect: { left: 0, top: 40, width: 200, height: 20 }
";

fn write_page(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("page.yaml");
    fs::write(&path, PAGE).unwrap();
    path
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    weblocator()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    weblocator()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("decode"))
        .stdout(predicate::str::contains("script"));
}

#[test]
fn test_no_args_shows_help() {
    weblocator().assert().failure(); // Requires a subcommand
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_run_reports_matches_then_sentinel() {
    let dir = TempDir::new().unwrap();
    let page = write_page(&dir);

    let output = weblocator()
        .arg("run")
        .arg(&page)
        .arg(r#"className("nav", "false");"#)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("home;,Home;,"));
    assert!(lines[1].contains("href::/about"));
    assert_eq!(lines[2], "robotium-finished");
}

#[test]
fn test_run_activate_prints_only_sentinel() {
    let dir = TempDir::new().unwrap();
    let page = write_page(&dir);

    weblocator()
        .args(["run", page.to_str().unwrap(), r#"id("home", "true");"#])
        .assert()
        .success()
        .stdout("robotium-finished\n")
        .stderr(predicate::str::contains("activated: true"));
}

#[test]
fn test_run_quiet_suppresses_summary() {
    let dir = TempDir::new().unwrap();
    let page = write_page(&dir);

    weblocator()
        .args(["-q", "run", page.to_str().unwrap(), r#"id("home", "true");"#])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_run_function_with_args_as_json() {
    let dir = TempDir::new().unwrap();
    let page = write_page(&dir);

    weblocator()
        .args(["run", page.to_str().unwrap(), "-f", "enterTextByName"])
        .args(["-a", "q", "-a", "rust", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"assigned\": true"))
        .stdout(predicate::str::contains("robotium-finished"));
}

#[test]
fn test_run_rejected_path_expression_fails() {
    let dir = TempDir::new().unwrap();
    let page = write_page(&dir);

    weblocator()
        .args(["run", page.to_str().unwrap(), r#"xpath("//a[", "false");"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path expression"));
}

#[test]
fn test_run_unknown_function_fails() {
    let dir = TempDir::new().unwrap();
    let page = write_page(&dir);

    weblocator()
        .args(["run", page.to_str().unwrap(), r#"byMagic("x", "false");"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown function"));
}

#[test]
fn test_run_missing_fixture_fails() {
    weblocator()
        .args(["run", "/no/such/page.yaml", "allTexts();"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

// ============================================================================
// Decode Tests
// ============================================================================

#[test]
fn test_decode_from_stdin() {
    weblocator()
        .arg("decode")
        .write_stdin("noise\nb;,Go;,null;,;,BUTTON;,10;,10;,80;,20\nrobotium-finished\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("BUTTON"))
        .stdout(predicate::str::contains("1 element(s)"));
}

#[test]
fn test_decode_unfinished_fails() {
    weblocator()
        .arg("decode")
        .write_stdin("b;,Go;,null;,;,BUTTON;,10;,10;,80;,20\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("completion sentinel"));
}

#[test]
fn test_decode_allow_unfinished() {
    weblocator()
        .args(["decode", "--allow-unfinished", "--format", "json"])
        .write_stdin("b;,Go;,null;,;,BUTTON;,10;,10;,80;,20\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"location_x\": 50"));
}

#[test]
fn test_decode_shown_only_uses_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("weblocator.yaml");
    fs::write(&config, "harness:\n  origin_y: 0\n  view_height: 100\n").unwrap();
    let log = dir.path().join("agent.log");
    fs::write(
        &log,
        "a;,Top;,null;,;,DIV;,0;,10;,50;,20\nb;,Below;,null;,;,DIV;,0;,300;,50;,20\nrobotium-finished\n",
    )
    .unwrap();

    weblocator()
        .arg("--config")
        .arg(&config)
        .arg("decode")
        .arg(&log)
        .arg("--shown-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("Top"))
        .stdout(predicate::str::contains("Below").not());
}

#[test]
fn test_decode_round_trips_run_output() {
    let dir = TempDir::new().unwrap();
    let page = write_page(&dir);

    let output = weblocator()
        .args(["run", page.to_str().unwrap(), "allTexts();"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    weblocator()
        .arg("decode")
        .write_stdin(output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Home"))
        .stdout(predicate::str::contains("About"))
        .stdout(predicate::str::contains("2 element(s)"));
}

// ============================================================================
// Script, Functions and Config Tests
// ============================================================================

#[test]
fn test_script_quotes_arguments() {
    weblocator()
        .args(["script", "xpath", "//a[@title=\"x\"]", "false"])
        .assert()
        .success()
        .stdout("xpath(\"//a[@title=\\\"x\\\"]\", \"false\");\n");
}

#[test]
fn test_script_wrong_arity_fails() {
    weblocator()
        .args(["script", "id", "only-one"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expects 2 argument(s)"));
}

#[test]
fn test_functions_lists_exports() {
    weblocator()
        .arg("functions")
        .assert()
        .success()
        .stdout(predicate::str::contains("cssSelector(query, activate)"))
        .stdout(predicate::str::contains("enterTextByTextContent(query, text)"))
        .stdout(predicate::str::contains("allWebElements()"));
}

#[test]
fn test_config_shows_defaults() {
    weblocator()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("activation: press-release"))
        .stdout(predicate::str::contains("timeout_ms: 5000"));
}

#[test]
fn test_config_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.yaml");
    fs::write(&config, "harness:\n  poll_interval_ms: 0\n").unwrap();

    weblocator()
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_ms"));
}
