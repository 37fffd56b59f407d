//! Test helper utilities for CLI integration tests.

#![allow(deprecated)] // Command::cargo_bin deprecation

use assert_cmd::Command;

/// Sentinel asset amount meaning "everything withdrawn so far".
pub const SENTINEL: &str =
    "115792089237316195423570985008687907853269984665640564039457584007913129639935";

/// Create a CLI command with no snapshot or config taken from the environment.
pub fn realloc_cmd() -> Command {
    let mut cmd = Command::cargo_bin("realloc").unwrap();
    cmd.env_remove("REALLOC_SNAPSHOT")
        .env_remove("REALLOC_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// Absolute path of a fixture file.
pub fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// A `plan` command over the default snapshot and config fixtures.
pub fn plan_cmd() -> Command {
    let mut cmd = realloc_cmd();
    cmd.arg("plan")
        .args(["--snapshot", &fixture_path("snapshot.json")])
        .args(["--config", &fixture_path("config.toml")]);
    cmd
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not valid JSON")
}
