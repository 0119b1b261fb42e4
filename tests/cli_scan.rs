use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const FIXTURE_ROOT: &str = "tests/fixtures/kotest_repo";

fn scan_json(extra: &[&str]) -> Value {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["scan", "--no-server", "--path", FIXTURE_ROOT, "--format", "json"]);
    cmd.args(extra);

    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json output")
}

fn spec<'a>(value: &'a Value, fqn: &str) -> &'a Value {
    value["files"]
        .as_array()
        .expect("files array")
        .iter()
        .flat_map(|file| file["specs"].as_array().expect("specs array").iter())
        .find(|spec| spec["fqn"] == fqn)
        .unwrap_or_else(|| panic!("spec {fqn} not reported"))
}

#[test]
fn cli_scan_reports_every_spec_in_fixture_repo() {
    let value = scan_json(&[]);

    assert_eq!(value["version"], "1.0.0");
    assert_eq!(value["summary"]["files_scanned"], 5);
    assert_eq!(value["summary"]["specs"], 4);
    assert_eq!(value["summary"]["tests"], 17);
    assert_eq!(value["summary"]["disabled_tests"], 4);

    let files = value["files"].as_array().expect("files array");
    assert_eq!(files.len(), 4, "Helpers.kt declares no spec");
    assert!(files
        .iter()
        .all(|file| !file["path"].as_str().unwrap().ends_with("Helpers.kt")));
}

#[test]
fn cli_scan_builds_feature_paths_and_enablement() {
    let value = scan_json(&[]);
    let login = spec(&value, "com.example.auth.LoginFeatureSpec");

    assert_eq!(login["style"], "feature");
    assert_eq!(login["style_label"], "Feature Spec");

    let features = login["tests"].as_array().expect("tests array");
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["name"], "Feature: Login");

    let scenarios = features[0]["children"].as_array().expect("children");
    assert_eq!(
        scenarios[0]["path"],
        "Feature: Login Scenario: accepts valid credentials"
    );
    assert_eq!(scenarios[0]["range"]["start_line"], 18);
    assert_eq!(scenarios[2]["enabled"], false);

    let logout = features[1]["children"].as_array().expect("children");
    assert_eq!(logout[0]["name"], "Scenario: clears the session");
    assert_eq!(logout[0]["enabled"], false);

    let callbacks = login["callbacks"].as_array().expect("callbacks");
    assert_eq!(callbacks[0]["kind"], "beforeTest");
    assert_eq!(callbacks[1]["kind"], "afterSpec");

    let includes = login["includes"].as_array().expect("includes");
    assert_eq!(includes[0]["name"], "passwordRules");
    assert_eq!(includes[0]["kind"], "function");
}

#[test]
fn cli_scan_handles_behavior_and_string_styles() {
    let value = scan_json(&[]);

    let account = spec(&value, "com.example.account.AccountBehaviorSpec");
    let given = &account["tests"][0];
    assert_eq!(given["name"], "Given: an account with funds");
    assert_eq!(
        given["children"][0]["children"][0]["path"],
        "Given: an account with funds When: withdrawing less than the balance Then: the balance decreases"
    );
    assert_eq!(
        given["children"][1]["name"],
        "When: withdrawing more than the balance"
    );

    let math = spec(&value, "com.example.math.MathStringSpec");
    let tests = math["tests"].as_array().expect("tests array");
    assert_eq!(tests[0]["name"], "addition is commutative");
    assert_eq!(tests[1]["name"], "division by zero throws");
    assert_eq!(tests[1]["enabled"], false);
}

#[test]
fn cli_scan_reads_tests_from_init_blocks() {
    let value = scan_json(&[]);
    let cart = spec(&value, "com.example.cart.CartFunSpec");

    let tests = cart["tests"].as_array().expect("tests array");
    assert_eq!(tests.len(), 2);
    assert_eq!(tests[0]["children"][1]["path"], "an empty cart has a zero total");
    assert_eq!(tests[1]["name"], "!applies coupons");
    assert_eq!(tests[1]["enabled"], false);
    assert_eq!(cart["callbacks"][0]["kind"], "beforeSpec");
}

#[test]
fn cli_scan_hide_flags_drop_callbacks_and_includes() {
    let value = scan_json(&["--hide-callbacks", "--hide-includes"]);
    let login = spec(&value, "com.example.auth.LoginFeatureSpec");

    assert!(login["callbacks"].as_array().unwrap().is_empty());
    assert!(login["includes"].as_array().unwrap().is_empty());
    assert_eq!(value["summary"]["tests"], 17);
}

#[test]
fn cli_scan_respects_include_and_exclude_globs() {
    let value = scan_json(&["--glob", "**/*Spec.kt", "--exclude", "**/Math*"]);

    assert_eq!(value["summary"]["files_scanned"], 3);
    assert_eq!(value["summary"]["specs"], 3);
}

#[test]
fn cli_scan_text_output_lists_tests_and_summary() {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["scan", "--no-server", "--path", FIXTURE_ROOT]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "com.example.auth.LoginFeatureSpec [Feature Spec]",
        ))
        .stdout(predicate::str::contains(
            "Scenario: locks the account after three failures (disabled)",
        ))
        .stdout(predicate::str::contains(
            "4 specs, 17 tests (4 disabled) in 5 files",
        ));
}

#[test]
fn cli_scan_table_output_has_header() {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["scan", "--no-server", "--path", FIXTURE_ROOT, "--format", "table"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("FILE"))
        .stdout(predicate::str::contains("ENABLED"));
}

#[test]
fn cli_scan_marks_duplicate_names() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("DupSpec.kt"),
        "class DupSpec : ShouldSpec({\n    should(\"work\") { }\n    should(\"work\") { }\n})\n",
    )
    .expect("write spec");

    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["scan", "--no-server", "--format", "json", "--path"]);
    cmd.arg(tmp.path());

    let assert = cmd.assert().success();
    let value: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json");
    let tests = value["files"][0]["specs"][0]["tests"].as_array().unwrap();
    assert_eq!(tests.len(), 2);
    assert_eq!(tests[0]["unique"], false);
    assert_eq!(tests[1]["unique"], false);
}

#[test]
fn cli_scan_fails_for_missing_path() {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["scan", "--no-server", "--path", "definitely/not/here"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("path does not exist"));
}

#[test]
fn cli_schema_version_flag_prints_version() {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.arg("--schema-version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1.0.0"));
}
