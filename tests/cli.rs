//! Integration tests for the keyql binary.
//!
//! Every run points `--config` at a fresh temp directory so the user's own
//! configuration never leaks in.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn keyql_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_keyql"))
}

/// Run keyql with the given args, returning (stdout, stderr, success)
fn run_keyql(args: &[&str], config: &Path) -> (String, String, bool) {
    // global flags go first, `compile` swallows everything after the query
    let output = Command::new(keyql_binary())
        .arg("--config")
        .arg(config)
        .arg("--no-color")
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run keyql");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn config_path(dir: &TempDir) -> PathBuf {
    dir.path().join("config.json")
}

fn compile_json(query: &[&str]) -> serde_json::Value {
    let dir = TempDir::new().unwrap();
    let mut args = vec!["compile", "--offline", "--json"];
    args.extend_from_slice(query);
    let (stdout, stderr, ok) = run_keyql(&args, &config_path(&dir));
    assert!(ok, "keyql compile failed: {stderr}");
    serde_json::from_str(&stdout).expect("compile --json must print valid JSON")
}

#[test]
fn test_compile_json_residual_and_filter() {
    let json = compile_json(&["incategory:Music", "widgets"]);
    assert_eq!(json["residual"], "widgets");
    assert_eq!(json["strategy"], "all_sites");
    assert_eq!(json["host"]["context"]["results_possible"], true);

    let should = &json["host"]["backend_filter"]["bool"]["should"];
    assert_eq!(
        should[0],
        serde_json::json!({ "match": { "category.lowercase_keyword": { "query": "Music", "operator": "and" } } })
    );
}

#[test]
fn test_compile_json_negated_keyword() {
    let json = compile_json(&["-intitle:bar", "foo"]);
    assert_eq!(json["residual"], "foo");
    assert_eq!(json["nodes"][0]["negated"], true);
    assert!(json["host"]["backend_filter"]["bool"]["must_not"].is_array());
}

#[test]
fn test_compile_json_reports_diagnostics() {
    let json = compile_json(&["filesize:huge"]);
    let diagnostics = json["host"]["context"]["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["key"], "file-numeric-not-a-number");
}

#[test]
fn test_offline_deepcat_is_not_available() {
    let json = compile_json(&["deepcat:Jazz"]);
    let diagnostics = json["host"]["context"]["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics[0]["key"], "feature-not-available");
    assert_eq!(json["host"]["context"]["results_possible"], true);
}

#[test]
fn test_compile_human_output() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr, ok) = run_keyql(
        &["compile", "--offline", "intitle:\"gold rush\"", "widgets"],
        &config_path(&dir),
    );
    assert!(ok, "keyql compile failed: {stderr}");
    assert!(stdout.contains("residual: \"\\\"gold rush\\\" widgets\""), "{stdout}");
    assert!(stdout.contains("[local]"), "{stdout}");
    assert!(stdout.contains("search type: intitle"), "{stdout}");
}

#[test]
fn test_features_lists_registration_order() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, ok) = run_keyql(&["features"], &config_path(&dir));
    assert!(ok);

    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    assert_eq!(
        names,
        vec![
            "prefix",
            "incategory",
            "deepcat",
            "hastemplate",
            "intitle",
            "insource",
            "filesize",
            "articletopic"
        ]
    );
    assert!(stdout.contains("greedy"));
}

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    let path = config_path(&dir);

    let (_, stderr, ok) = run_keyql(&["config", "--init"], &path);
    assert!(ok, "config --init failed: {stderr}");
    assert!(path.exists());

    let (stdout, _, ok) = run_keyql(&["config"], &path);
    assert!(ok);
    assert!(stdout.contains("\"max_query_length\": 2048"), "{stdout}");
}

#[test]
fn test_config_limits_are_honored() {
    let dir = TempDir::new().unwrap();
    let path = config_path(&dir);
    std::fs::write(&path, r#"{ "max_query_length": 5 }"#).unwrap();

    let (stdout, _, ok) = run_keyql(&["compile", "--offline", "--json", "far too long"], &path);
    assert!(ok);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["host"]["context"]["results_possible"], false);
    assert_eq!(json["host"]["backend_filter"], serde_json::json!({ "match_none": {} }));
}

#[test]
fn test_compile_requires_query() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, ok) = run_keyql(&["compile"], &config_path(&dir));
    assert!(!ok);
    assert!(stderr.contains("required"), "{stderr}");
}
