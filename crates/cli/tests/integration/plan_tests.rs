//! `plan` command tests over the snapshot fixtures.

use predicates::prelude::*;

use super::helpers::{fixture_path, plan_cmd, realloc_cmd, stdout_json, SENTINEL};

#[test]
fn test_plan_table_output() {
    plan_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Withdraw"))
        .stdout(predicate::str::contains("Supply all"))
        .stdout(predicate::str::contains("remaining"))
        .stdout(predicate::str::contains("No reallocation needed."));
}

#[test]
fn test_plan_json_output() {
    let output = plan_cmd().args(["--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let reports = stdout_json(&output);
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 2);

    // Snapshot order is kept
    let imbalanced = &reports[0];
    assert_eq!(imbalanced["chainId"], 1);
    assert!(imbalanced["vault"]
        .as_str()
        .unwrap()
        .eq_ignore_ascii_case("0xBEEF01735c132Ada46AA9aA4c54623cAA92A64CB"));

    let plan = imbalanced["plan"].as_array().unwrap();
    assert_eq!(plan.len(), 4);
    assert_eq!(plan[0]["assets"], "9375000001");
    assert_eq!(plan[1]["assets"], "3750000001");
    // Idle covers the rounding shortfall
    assert_eq!(plan[2]["marketParams"]["lltv"], "0");
    assert_eq!(plan[2]["assets"], "999999997");
    assert_eq!(plan[3]["assets"], SENTINEL);

    let balanced = &reports[1];
    assert_eq!(balanced["chainId"], 8453);
    assert!(balanced["plan"].is_null());
    assert!(balanced.get("simulation").is_none());
}

#[test]
fn test_plan_chain_filter() {
    let output = plan_cmd()
        .args(["--format", "json", "--chain", "base"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let reports = stdout_json(&output);
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["chainId"], 8453);
}

#[test]
fn test_plan_chain_filter_no_match() {
    plan_cmd()
        .args(["--chain", "arbitrum"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No vaults found."));
}

#[test]
fn test_plan_simulate_json() {
    let output = plan_cmd()
        .args(["--format", "json", "--simulate"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let reports = stdout_json(&output);
    let changes = reports[0]["simulation"].as_array().unwrap();
    assert_eq!(changes.len(), 4);

    // The hot market receives everything the others released
    assert_eq!(changes[0]["vaultAssetsBefore"], "10000000000");
    assert_eq!(changes[0]["vaultAssetsAfter"], "16875000001");
    assert_eq!(changes[3]["isIdle"], true);
    assert_eq!(changes[3]["vaultAssetsAfter"], "999999997");

    // Nothing to replay for a balanced vault
    assert!(reports[1].get("simulation").is_none());
}

#[test]
fn test_plan_simulate_table() {
    plan_cmd()
        .arg("--simulate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Utilization After"));
}

#[test]
fn test_plan_apy_range_strategy() {
    plan_cmd()
        .args(["--strategy", "apy-range", "--format", "json"])
        .assert()
        .success();
}

#[test]
fn test_plan_strategy_missing_from_config() {
    realloc_cmd()
        .arg("plan")
        .args(["--snapshot", &fixture_path("snapshot.json")])
        .args(["--config", &fixture_path("equalize_only.toml")])
        .args(["--strategy", "min-rate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("minimum_rate"));
}

#[test]
fn test_plan_rejects_stale_snapshot() {
    realloc_cmd()
        .arg("plan")
        .args(["--snapshot", &fixture_path("stale_snapshot.json")])
        .args(["--config", &fixture_path("config.toml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to plan vault"));
}

#[test]
fn test_plan_missing_snapshot_file() {
    realloc_cmd()
        .arg("plan")
        .args(["--snapshot", &fixture_path("does_not_exist.json")])
        .args(["--config", &fixture_path("config.toml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read snapshot"));
}

#[test]
fn test_plan_reads_paths_from_env() {
    realloc_cmd()
        .arg("plan")
        .env("REALLOC_SNAPSHOT", fixture_path("snapshot.json"))
        .env("REALLOC_CONFIG", fixture_path("config.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Supply all"));
}
