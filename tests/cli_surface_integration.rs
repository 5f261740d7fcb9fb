use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn copy_fixture(directory: &TempDir, name: &str) -> PathBuf {
    let target = directory.path().join(name);
    fs::copy(fixture_path(name), &target).expect("fixture copy should succeed");
    target
}

fn write_config(directory: &TempDir, name: &str, content: &str) -> PathBuf {
    let target = directory.path().join(name);
    fs::write(&target, content).expect("config write should succeed");
    target
}

fn run_modcfg(arguments: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_modcfg"));
    command.args(arguments);
    command.output().expect("failed to run modcfg binary")
}

fn run_modcfg_with_stdin(arguments: &[&str], input: &str) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_modcfg"));
    command.args(arguments);
    command.stdin(Stdio::piped());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command.spawn().expect("failed to spawn modcfg binary");
    // A BrokenPipe here means the child exited without reading stdin (e.g.
    // after rejecting its arguments); the output assertions still apply.
    if let Err(error) = child
        .stdin
        .as_mut()
        .expect("stdin should be available")
        .write_all(input.as_bytes())
    {
        assert_eq!(
            error.kind(),
            std::io::ErrorKind::BrokenPipe,
            "stdin write should succeed: {error}"
        );
    }
    child
        .wait_with_output()
        .expect("failed to read process output")
}

fn parse_stdout(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

#[test]
fn validate_accepts_each_fixture_under_its_own_dialect() {
    for fixture in ["mobconfig.json", "client.json5", "server.toml"] {
        let path = fixture_path(fixture);
        let output = run_modcfg(&["validate", path.to_str().expect("path should be utf-8")]);
        assert!(
            output.status.success(),
            "{fixture} should validate: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        assert_eq!(parse_stdout(&output)["valid"], true);
    }
}

#[test]
fn validate_reports_a_parse_failure_with_the_dialect_name() {
    let directory = tempfile::tempdir().expect("temp dir should be created");
    let config = write_config(&directory, "broken.toml", "title = \"open\n[section\n");

    let output = run_modcfg(&["validate", config.to_str().expect("path should be utf-8")]);
    assert!(!output.status.success());

    let response = parse_stdout(&output);
    assert_eq!(response["error"]["type"], "validation_failed");
    let message = response["error"]["message"]
        .as_str()
        .expect("error.message should be a string");
    assert!(message.contains("toml"), "message should name the dialect");
}

#[test]
fn diff_output_feeds_straight_into_a_json_patch_request() {
    let directory = tempfile::tempdir().expect("temp dir should be created");
    let before = write_config(
        &directory,
        "before.json",
        "{\n  \"speed\": 4,\n  \"label\": \"keep\"\n}\n",
    );
    let after = write_config(
        &directory,
        "after.json",
        "{\n  \"speed\": 9,\n  \"label\": \"keep\"\n}\n",
    );

    let diff_output = run_modcfg(&[
        "diff",
        before.to_str().expect("path should be utf-8"),
        after.to_str().expect("path should be utf-8"),
    ]);
    assert!(diff_output.status.success());

    let diff = parse_stdout(&diff_output);
    assert_eq!(diff["changes"], json!([{"path": "speed", "value": 9}]));

    let request = json!({
        "file": before.to_str().expect("path should be utf-8"),
        "changes": diff["changes"],
    })
    .to_string();
    let patch_output = run_modcfg_with_stdin(&["patch", "--json"], &request);
    assert!(
        patch_output.status.success(),
        "patch failed: {}",
        String::from_utf8_lossy(&patch_output.stdout)
    );
    assert_eq!(parse_stdout(&patch_output)["applied"], 1);

    assert_eq!(
        fs::read_to_string(&before).expect("patched file should be readable"),
        "{\n  \"speed\": 9,\n  \"label\": \"keep\"\n}\n"
    );
}

#[test]
fn diff_reports_removed_keys_as_valueless_entries() {
    let directory = tempfile::tempdir().expect("temp dir should be created");
    let before = write_config(&directory, "before.json", r#"{"keep": 1, "drop": 2}"#);
    let after = write_config(&directory, "after.json", r#"{"keep": 1}"#);

    let output = run_modcfg(&[
        "diff",
        before.to_str().expect("path should be utf-8"),
        after.to_str().expect("path should be utf-8"),
    ]);
    assert!(output.status.success());
    assert_eq!(parse_stdout(&output)["changes"], json!([{"path": "drop"}]));
}

#[test]
fn json_stdin_mode_rejects_flag_mode_arguments() {
    let output = run_modcfg_with_stdin(&["patch", "--json", "--set", "a=1"], "{}");
    assert!(!output.status.success());
    assert_eq!(parse_stdout(&output)["error"]["type"], "invalid_request");
}

#[test]
fn malformed_json_payload_is_reported_as_invalid() {
    let output = run_modcfg_with_stdin(&["patch", "--json"], "{ not json");
    assert!(!output.status.success());
    assert_eq!(parse_stdout(&output)["error"]["type"], "invalid_request");
}

#[test]
fn flag_mode_requires_a_file_and_at_least_one_change() {
    let output = run_modcfg(&["patch", "--set", "a=1"]);
    assert!(!output.status.success());
    assert_eq!(parse_stdout(&output)["error"]["type"], "invalid_request");

    let directory = tempfile::tempdir().expect("temp dir should be created");
    let config = write_config(&directory, "empty.toml", "key = 1\n");
    let output = run_modcfg(&["patch", config.to_str().expect("path should be utf-8")]);
    assert!(!output.status.success());
    assert_eq!(parse_stdout(&output)["error"]["type"], "invalid_request");
}

#[test]
fn missing_files_surface_an_io_error_envelope() {
    let output = run_modcfg(&["validate", "/nonexistent/config.toml"]);
    assert!(!output.status.success());
    assert_eq!(parse_stdout(&output)["error"]["type"], "io_error");
}

#[test]
fn backups_list_newest_first_and_stay_bounded() {
    let directory = tempfile::tempdir().expect("temp dir should be created");
    let config = copy_fixture(&directory, "server.toml");
    let config_arg = config.to_str().expect("path should be utf-8");

    let before_any = run_modcfg(&["backups", config_arg]);
    assert!(before_any.status.success());
    assert_eq!(parse_stdout(&before_any)["backups"], json!([]));

    for port in [25566, 25567, 25568, 25569, 25570, 25571, 25572] {
        let set = format!("network.port={port}");
        let output = run_modcfg(&["patch", config_arg, "--set", &set]);
        assert!(output.status.success());
    }

    let output = run_modcfg(&["backups", config_arg]);
    assert!(output.status.success());

    let backups = parse_stdout(&output)["backups"]
        .as_array()
        .expect("backups should be an array")
        .clone();
    assert_eq!(backups.len(), 5, "history should be pruned to its depth");

    let stamps: Vec<u64> = backups
        .iter()
        .map(|entry| entry["created_nanos"].as_u64().expect("stamp"))
        .collect();
    assert!(
        stamps.windows(2).all(|pair| pair[0] >= pair[1]),
        "entries should be ordered newest first"
    );

    // The newest backup holds the state just before the final patch.
    let newest = backups[0]["path"].as_str().expect("backup path");
    let content = fs::read_to_string(newest).expect("backup should be readable");
    assert!(content.contains("port = 25571"));
}
