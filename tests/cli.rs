use std::path::PathBuf;
use std::process::{Command, Output};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(path)
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_missing-refs"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn scan_prints_log() {
    let snapshot = fixture("level/snapshot.json");
    let output = run(&["scan", "-s", snapshot.to_str().unwrap(), "--log"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("Scene: Level01\n"));
    assert!(text.contains("    - Missing script:\n"));
}

#[test]
fn scan_emits_json() {
    let snapshot = fixture("level/snapshot.json");
    let output = run(&[
        "scan",
        "-s",
        snapshot.to_str().unwrap(),
        "--json",
        "--skip-empty-events",
    ]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let root = &value["documents"][0]["root"];
    let total = root["missing_in_components"].as_u64().unwrap()
        + root["missing_in_children"].as_u64().unwrap();
    assert_eq!(total, 5);
}

#[test]
fn candidates_emit_json() {
    let snapshot = fixture("level/snapshot.json");
    let project = fixture("project");
    let output = run(&[
        "candidates",
        "Game.Health, Assembly-CSharp",
        "-s",
        snapshot.to_str().unwrap(),
        "-p",
        project.to_str().unwrap(),
        "--exclude-assembly",
        "Assembly-CSharp-*",
        "--json",
    ]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["type"]["name"], "Health2");
    assert_eq!(value[0]["asset_path"], "Assets/Scripts/Health2.cs");
}

#[test]
fn salvage_rejects_resolved_objects() {
    let snapshot = fixture("level/snapshot.json");
    let output = run(&["salvage", "-s", snapshot.to_str().unwrap(), "-o", "102"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("resolved type"));
}

#[test]
fn missing_snapshot_fails_with_context() {
    let output = run(&["missing-scripts", "-s", "/nonexistent/state.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}

#[test]
fn missing_scripts_include_hidden_objects() {
    let snapshot = fixture("level/snapshot.json");
    let output = run(&["missing-scripts", "-s", snapshot.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("2 object(s) with missing scripts"));
    assert!(text.contains("  1 Player\n"));
    assert!(text.contains("  5 EditorHelper (hidden)\n"));
}
