//! Integration tests for the `blindfold` binary.
//!
//! Spawns the binary against a temporary root. Covers help, init layout
//! and the client error path when no server is listening.

use std::path::PathBuf;
use std::process::Command;

fn blindfold_bin() -> PathBuf {
    std::env::var("CARGO_BIN_EXE_blindfold")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("target/debug/blindfold"))
}

#[test]
fn help_lists_server_and_client_commands() {
    let output = Command::new(blindfold_bin())
        .arg("help")
        .output()
        .expect("blindfold help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("approve"));
    assert!(stdout.contains("--api-url"));
}

#[test]
fn init_writes_config_and_agent_files() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let root = tmp.path().join("bf");

    let output = Command::new(blindfold_bin())
        .args(["init", "--root"])
        .arg(&root)
        .output()
        .expect("blindfold init");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(root.join("blindfold.toml").is_file());
    assert!(root.join("data").is_dir());
    let agent_files = std::fs::read_dir(root.join("agents"))
        .expect("agents dir")
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
        .count();
    assert_eq!(agent_files, 16);

    let body = std::fs::read_to_string(root.join("agents/explorer-agent.md")).unwrap();
    assert!(body.starts_with("# Explorer Agent"));
}

#[test]
fn client_command_fails_cleanly_without_server() {
    let output = Command::new(blindfold_bin())
        .args(["stats", "--api-url", "http://127.0.0.1:1"])
        .output()
        .expect("blindfold stats");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not reach blindfold"), "stderr: {}", stderr);
}
