//! `bounds` command tests.

use predicates::prelude::*;

use super::helpers::{realloc_cmd, stdout_json};

#[test]
fn test_bounds_json_at_initial_rate() {
    let output = realloc_cmd()
        .args(["--format", "json", "bounds", "--min", "2", "--max", "5"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["rateAtTarget"], "1268391679");
    assert_eq!(report["lowerUtilization"], "294079008465271547");
    assert_eq!(report["upperUtilization"], "907325326043864720");
    assert_eq!(report["saturates"], false);
}

#[test]
fn test_bounds_saturating_range() {
    let output = realloc_cmd()
        .args(["--format", "json", "bounds", "--min", "5", "--max", "40"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["upperUtilization"], "1000000000000000000");
    assert_eq!(report["saturates"], true);
}

#[test]
fn test_bounds_table_output() {
    realloc_cmd()
        .args(["bounds", "--min", "2", "--max", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("APY range"))
        .stdout(predicate::str::contains("Rate at target"));
}

#[test]
fn test_bounds_custom_rate_at_target() {
    let output = realloc_cmd()
        .args(["--format", "json", "bounds", "--min", "2", "--max", "5"])
        .args(["--rate-at-target", "0x4b9902ff"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["rateAtTarget"], "1268318975");
}

#[test]
fn test_bounds_inverted_range() {
    realloc_cmd()
        .args(["bounds", "--min", "5", "--max", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid APY range"));
}
