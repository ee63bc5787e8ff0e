//! CLI integration tests for the briefsmith binary.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_briefsmith(args: &[&str], working_dir: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_briefsmith"))
        .args(args)
        .current_dir(working_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    let output = run_briefsmith(&["--help"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["research", "serve", "config", "init"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    let output = run_briefsmith(&["--version"], dir.path());

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_init_writes_config_and_env_example() {
    let dir = TempDir::new().unwrap();
    let output = run_briefsmith(&["--no-color", "init"], dir.path());

    assert!(output.status.success());
    let config = fs::read_to_string(dir.path().join("briefsmith.toml")).unwrap();
    assert!(config.contains("provider = \"ollama\""));
    assert!(dir.path().join(".env.example").exists());
}

#[test]
fn test_init_keeps_existing_config_without_force() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("briefsmith.toml"), "# keep me\n").unwrap();

    let output = run_briefsmith(&["--no-color", "init"], dir.path());

    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(dir.path().join("briefsmith.toml")).unwrap(),
        "# keep me\n"
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
}

#[test]
fn test_config_shows_defaults_without_file() {
    let dir = TempDir::new().unwrap();
    let output = run_briefsmith(&["--no-color", "config"], dir.path());

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("concurrency: 3"));
    assert!(stderr.contains("deadline_secs: 120"));
}

#[test]
fn test_config_validate_reports_missing_env() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("briefsmith.toml"),
        r#"
[search]
provider = "google"
api_key_env = "BRIEFSMITH_CLI_TEST_UNSET_KEY"
cx_env = "BRIEFSMITH_CLI_TEST_UNSET_CX"
"#,
    )
    .unwrap();

    let output = run_briefsmith(&["--no-color", "config", "--validate"], dir.path());

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("BRIEFSMITH_CLI_TEST_UNSET_KEY"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("briefsmith.toml"),
        "[research]\nmax_tasks = 9\n",
    )
    .unwrap();

    let output = run_briefsmith(&["--no-color", "config"], dir.path());

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_tasks"));
}
