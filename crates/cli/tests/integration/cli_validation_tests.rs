//! CLI argument validation and config checking tests.

use predicates::prelude::*;

use super::helpers::{fixture_path, realloc_cmd, stdout_json};

#[test]
fn test_help_output() {
    realloc_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("realloc"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("bounds"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn test_plan_help_output() {
    realloc_cmd()
        .args(["plan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--snapshot"))
        .stdout(predicate::str::contains("--strategy"))
        .stdout(predicate::str::contains("--simulate"));
}

#[test]
fn test_invalid_command() {
    realloc_cmd()
        .arg("invalid_command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_plan_missing_snapshot() {
    realloc_cmd()
        .args(["plan", "--config", &fixture_path("config.toml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_invalid_strategy_value() {
    realloc_cmd()
        .arg("plan")
        .args(["--snapshot", &fixture_path("snapshot.json")])
        .args(["--config", &fixture_path("config.toml")])
        .args(["--strategy", "yolo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_invalid_chain_value() {
    realloc_cmd()
        .arg("plan")
        .args(["--snapshot", &fixture_path("snapshot.json")])
        .args(["--config", &fixture_path("config.toml")])
        .args(["--chain", "atlantis"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown chain"));
}

#[test]
fn test_bounds_invalid_rate_at_target() {
    realloc_cmd()
        .args(["bounds", "--min", "2", "--max", "5", "--rate-at-target", "fast"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid integer"));
}

#[test]
fn test_check_config_ok() {
    realloc_cmd()
        .args(["check-config", "--config", &fixture_path("config.toml")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config OK"))
        .stdout(predicate::str::contains("ready"));
}

#[test]
fn test_check_config_json_reports_strategies() {
    let output = realloc_cmd()
        .args(["--format", "json", "check-config"])
        .args(["--config", &fixture_path("equalize_only.toml")])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["valid"], true);
    assert_eq!(report["chains"], 0);
    assert_eq!(report["strategies"]["equalize"], "ready");
    assert!(report["strategies"]["apy-range"]
        .as_str()
        .unwrap()
        .contains("default_apy_range"));
    assert!(report["strategies"]["min-rate"]
        .as_str()
        .unwrap()
        .contains("minimum_rate"));
}

#[test]
fn test_check_config_rejects_invalid_range() {
    realloc_cmd()
        .args(["check-config", "--config", &fixture_path("invalid_config.toml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid APY range"));
}

#[test]
fn test_check_config_missing_file() {
    realloc_cmd()
        .args(["check-config", "--config", &fixture_path("missing.toml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config"));
}
