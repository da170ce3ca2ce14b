//! Integration tests for the noncescope CLI

use assert_cmd::Command;
use predicates::prelude::*;

const REAL_TX_KEY: &str =
    "62958994860637178871299877498639209302063112480839791435318431648713002718353";

fn noncescope() -> Command {
    Command::cargo_bin("noncescope").unwrap()
}

fn json_output(args: &[&str], stdin: Option<&str>) -> (Option<i32>, serde_json::Value) {
    let mut cmd = noncescope();
    cmd.arg("--json").args(args);
    if let Some(input) = stdin {
        cmd.write_stdin(input);
    }
    let output = cmd.output().unwrap();
    let json = serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    (output.status.code(), json)
}

#[test]
fn test_analyze_nonce_reuse_from_file() {
    noncescope()
        .arg("analyze")
        .arg("tests/fixtures/nonce_reuse.json")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Nonce reuse"))
        .stdout(predicate::str::contains("Status: recovered"))
        .stdout(predicate::str::contains(REAL_TX_KEY));
}

#[test]
fn test_analyze_nonce_reuse_from_stdin() {
    let input = include_str!("fixtures/nonce_reuse.json");
    noncescope()
        .arg("analyze")
        .arg("-")
        .write_stdin(input)
        .assert()
        .code(1)
        .stdout(predicate::str::contains(REAL_TX_KEY));
}

#[test]
fn test_no_vulnerabilities_clean_exit() {
    let input = r#"[
      {"r": "123", "s": "456", "z": "789"},
      {"r": "999", "s": "888", "z": "777"}
    ]"#;
    noncescope()
        .arg("analyze")
        .arg("-")
        .write_stdin(input)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("No reused r values."))
        .stdout(predicate::str::contains("Status: no_reuse"));
}

#[test]
fn test_json_output_schema() {
    let (code, json) = json_output(&["analyze", "tests/fixtures/nonce_reuse.json"], None);
    assert_eq!(code, Some(1));

    assert!(json["reuse_groups"].is_array());
    assert_eq!(json["reuse_groups"][0]["indices"], serde_json::json!([0, 1]));

    let key = &json["recovered_key"];
    assert_eq!(key["status"].as_str(), Some("recovered"));
    assert_eq!(key["signatures"], serde_json::json!([0, 1]));
    assert_eq!(key["private_key"]["decimal"].as_str(), Some(REAL_TX_KEY));

    let hex = key["private_key"]["hex"].as_str().unwrap();
    assert_eq!(hex.len(), 64, "private key hex should be 64 hex chars");
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()), "should be valid hex");

    assert_eq!(json["low_s_indices"], serde_json::json!([0, 1]));
    assert_eq!(
        json["linear_dependency"]["outcome"].as_str(),
        Some("unique_solution")
    );
    assert_eq!(json["summary"]["reuse_groups_found"].as_u64(), Some(1));
    assert_eq!(json["summary"]["keys_recovered"].as_u64(), Some(1));
}

#[test]
fn test_small_modulus_csv_scenario() {
    let (code, json) = json_output(
        &["analyze", "tests/fixtures/small_field.csv", "--modulus", "17"],
        None,
    );
    assert_eq!(code, Some(1));
    assert_eq!(json["modulus"]["decimal"].as_str(), Some("17"));
    assert_eq!(json["reuse_groups"][0]["indices"], serde_json::json!([0, 1]));
    assert_eq!(json["recovered_key"]["nonce"]["decimal"].as_str(), Some("1"));
    assert_eq!(
        json["recovered_key"]["private_key"]["decimal"].as_str(),
        Some("4")
    );
    assert_eq!(json["low_s_indices"], serde_json::json!([2]));
}

#[test]
fn test_shared_unknowns_with_private_key() {
    let (_, json) = json_output(
        &[
            "analyze",
            "tests/fixtures/small_field.csv",
            "--modulus",
            "0x11",
            "--unknowns",
            "0,0,1",
            "--with-private-key",
        ],
        None,
    );
    let linear = &json["linear_dependency"];
    assert_eq!(linear["outcome"].as_str(), Some("unique_solution"));
    assert_eq!(linear["values"][2]["unknown"].as_str(), Some("d"));
    assert_eq!(linear["values"][2]["value"]["decimal"].as_str(), Some("4"));
}

#[test]
fn test_shared_unknowns_inconsistent_text() {
    noncescope()
        .args([
            "analyze",
            "tests/fixtures/small_field.csv",
            "--modulus",
            "17",
            "--unknowns",
            "0,0,1",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Inconsistent: signature 1"));
}

#[test]
fn test_relationships_text() {
    noncescope()
        .args([
            "analyze",
            "tests/fixtures/small_field.csv",
            "--modulus",
            "17",
            "--with-private-key",
        ])
        .assert()
        .stdout(predicate::str::contains("Relationships (free: d)"))
        .stdout(predicate::str::contains("k0 = 16 + 9*d"));
}

#[test]
fn test_degenerate_s_difference_reported() {
    let input = "r,s,z\n5,10,7\n5,10,9\n";
    let (code, json) = json_output(&["analyze", "-", "--modulus", "17"], Some(input));
    assert_eq!(code, Some(1));
    assert_eq!(
        json["recovered_key"]["status"].as_str(),
        Some("degenerate_s_difference")
    );
    assert!(json["recovered_key"]["private_key"].is_null());
}

#[test]
fn test_recover_from_all() {
    let input = "r,s,z\n5,10,7\n5,10,9\n8,8,1\n8,9,3\n";
    let (_, first) = json_output(&["analyze", "-", "--modulus", "17"], Some(input));
    assert_eq!(first["recovery_attempts"].as_array().unwrap().len(), 1);
    assert_eq!(first["summary"]["keys_recovered"].as_u64(), Some(0));

    let (_, all) = json_output(
        &["analyze", "-", "--modulus", "17", "--recover-from", "all"],
        Some(input),
    );
    assert_eq!(all["recovery_attempts"].as_array().unwrap().len(), 2);
    assert_eq!(all["recovered_key"]["group"].as_u64(), Some(1));
    assert_eq!(
        all["recovered_key"]["private_key"]["decimal"].as_str(),
        Some("4")
    );
}

#[test]
fn test_out_of_range_input_policy() {
    let input = r#"[{"r": "22", "s": "10", "z": "7"}]"#;
    noncescope()
        .args(["analyze", "-", "--modulus", "17"])
        .write_stdin(input)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("index 0"));

    noncescope()
        .args(["analyze", "-", "--modulus", "17", "--reduce-inputs"])
        .write_stdin(input)
        .assert()
        .code(0);
}

#[test]
fn test_composite_modulus_error_exit() {
    noncescope()
        .args(["analyze", "tests/fixtures/small_field.csv", "--modulus", "15"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not prime"));
}

#[test]
fn test_mapping_length_mismatch_is_reported() {
    let (code, json) = json_output(
        &[
            "analyze",
            "tests/fixtures/small_field.csv",
            "--modulus",
            "17",
            "--unknowns",
            "0,1",
        ],
        None,
    );
    assert_eq!(code, Some(1));
    assert_eq!(json["linear_dependency"]["outcome"], "invalid_mapping");
    assert_eq!(json["linear_dependency"]["entries"], 2);
    assert_eq!(json["linear_dependency"]["signatures"], 3);
    assert_eq!(json["recovered_key"]["status"], "recovered");
    assert_eq!(json["low_s_indices"], serde_json::json!([2]));
}

#[test]
fn test_mapping_length_mismatch_text() {
    noncescope()
        .args([
            "analyze",
            "tests/fixtures/small_field.csv",
            "--modulus",
            "17",
            "--unknowns",
            "0,1",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Invalid mapping: 2 unknown ids for 3 signatures",
        ))
        .stdout(predicate::str::contains("Status: recovered"));
}

#[test]
fn test_unknown_recovery_policy_error_exit() {
    noncescope()
        .args(["analyze", "tests/fixtures/nonce_reuse.json", "--recover-from", "some"])
        .assert()
        .code(2);
}

#[test]
fn test_invalid_input_error_exit() {
    noncescope()
        .arg("analyze")
        .arg("-")
        .write_stdin("not valid json")
        .assert()
        .code(2);
}
