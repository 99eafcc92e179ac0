//! CLI integration tests
//!
//! These tests verify the CLI commands work correctly by running the binary.
//! Run with `--features cli`.

#![cfg(feature = "cli")]

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn bncparse(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bncparse"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn xml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn path_str(file: &NamedTempFile) -> &str {
    file.path().to_str().unwrap()
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_cli_inspect_summary() {
    let file = xml_file(r#"<root version="2"><child a="1"/><child/></root>"#);
    let output = bncparse(&["inspect", path_str(&file)]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "inspect should succeed");
    assert!(stdout.contains("Root: root"), "should show root tag");
    assert!(stdout.contains("version = \"2\""), "should show root attributes");
    assert!(stdout.contains("Children: 2"), "should show child count");
    assert!(stdout.contains("Elements: 3"), "should show element count");
    assert!(stdout.contains("Depth: 2"), "should show depth");
}

#[test]
fn test_cli_inspect_json_output() {
    let file = xml_file(r#"<root><child a="1"/></root>"#);
    let output = bncparse(&["inspect", "--json", path_str(&file)]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "inspect --json should succeed");

    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");
    assert_eq!(json["tag"], "root");
    assert_eq!(json["children"][0]["tag"], "child");
    assert_eq!(json["children"][0]["attributes"]["a"], "1");
}

#[test]
fn test_cli_inspect_malformed_file_fails() {
    let file = xml_file("<root>text & more</root>");
    let output = bncparse(&["inspect", path_str(&file)]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("parse error"), "stderr: {}", stderr);
}

#[test]
fn test_cli_strict_limits() {
    let xml = format!("{}{}", "<a>".repeat(150), "</a>".repeat(150));
    let file = xml_file(&xml);

    assert!(bncparse(&["inspect", path_str(&file)]).status.success());

    let output = bncparse(&["--strict", "inspect", path_str(&file)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("limit exceeded"));
}

#[test]
fn test_cli_limits_file() {
    let limits = xml_file(r#"{"max_xml_depth": 1}"#);
    let file = xml_file("<a><b/></a>");

    let output = bncparse(&["--limits", path_str(&limits), "inspect", path_str(&file)]);
    assert!(!output.status.success());
}

// ============================================================================
// Check Command Tests
// ============================================================================

#[test]
fn test_cli_check_reports_each_file() {
    let good = xml_file("<ok/>");
    let bad = xml_file("<a><b></a>");
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.xml");

    let output = bncparse(&["check", path_str(&good), path_str(&bad), missing.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "check should fail when a file fails");
    assert!(stdout.contains("ok "), "stdout: {}", stdout);
    assert!(stdout.contains("parse "), "stdout: {}", stdout);
    assert!(stdout.contains("io "), "stdout: {}", stdout);
    assert!(stderr.contains("2 of 3 files failed"), "stderr: {}", stderr);
}

#[test]
fn test_cli_check_all_good() {
    let a = xml_file("<a/>");
    let b = xml_file("<b><c/></b>");

    let output = bncparse(&["check", path_str(&a), path_str(&b)]);
    assert!(output.status.success());
}
