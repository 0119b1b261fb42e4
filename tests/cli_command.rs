use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;

const LOGIN_SPEC: &str = "tests/fixtures/kotest_repo/LoginFeatureSpec.kt";
const ACCOUNT_SPEC: &str = "tests/fixtures/kotest_repo/AccountBehaviorSpec.kt";

fn run_json(args: &[&str]) -> Value {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(args);
    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json output")
}

#[test]
fn cli_test_at_resolves_enclosing_test() {
    // Line 20 sits inside the body of "accepts valid credentials".
    let value = run_json(&[
        "test-at", "--no-server", "--file", LOGIN_SPEC, "--line", "20", "--column", "13",
        "--format", "json",
    ]);

    assert_eq!(value["spec"], "com.example.auth.LoginFeatureSpec");
    assert_eq!(value["style"], "feature");
    assert_eq!(
        value["test"]["path"],
        "Feature: Login Scenario: accepts valid credentials"
    );
    assert_eq!(value["test"]["enabled"], true);
}

#[test]
fn cli_test_at_leaf_requires_introducing_token() {
    // Column 9 of line 23 is the `x` of `xscenario`.
    let value = run_json(&[
        "test-at", "--no-server", "--file", LOGIN_SPEC, "--line", "23", "--column", "9",
        "--leaf", "--format", "json",
    ]);
    assert_eq!(value["test"]["name"], "Scenario: locks the account after three failures");
    assert_eq!(value["test"]["enabled"], false);

    // Inside a test body but not on its keyword: no leaf test.
    let value = run_json(&[
        "test-at", "--no-server", "--file", LOGIN_SPEC, "--line", "20", "--column", "13",
        "--leaf", "--format", "json",
    ]);
    assert!(value.get("test").is_none());
}

#[test]
fn cli_test_at_text_output() {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args([
        "test-at", "--no-server", "--file", ACCOUNT_SPEC, "--line", "8", "--column", "13",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "spec    : com.example.account.AccountBehaviorSpec (behavior)",
        ))
        .stdout(predicate::str::contains("test    : Then: the balance decreases"))
        .stdout(predicate::str::contains("enabled : true"));
}

#[test]
fn cli_command_prints_spec_and_testpath_arguments() {
    let value = run_json(&[
        "command", "--file", LOGIN_SPEC, "--line", "22", "--column", "9", "--format", "json",
    ]);

    assert_eq!(value["main_class"], "io.kotest.runner.console.LauncherKt");
    assert_eq!(
        value["args"],
        serde_json::json!([
            "--spec",
            "com.example.auth.LoginFeatureSpec",
            "--testpath",
            "Feature: Login Scenario: rejects a wrong password"
        ])
    );
}

#[test]
fn cli_command_without_position_selects_spec() {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["command", "--file", LOGIN_SPEC]);

    cmd.assert().success().stdout(predicate::str::diff(
        "io.kotest.runner.console.LauncherKt --spec com.example.auth.LoginFeatureSpec\n",
    ));
}

#[test]
fn cli_command_for_package() {
    let value = run_json(&["command", "--package", "com.example", "--format", "json"]);
    assert_eq!(value["args"], serde_json::json!(["--package", "com.example"]));
}

#[test]
fn cli_command_requires_file_or_package() {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.arg("command");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("either a spec file or a package"));
}

#[test]
fn cli_skeleton_uses_style_template() {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["skeleton", "--style", "FeatureSpec", "--name", "checkout"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("feature(\"checkout\") { }\n"));

    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["skeleton", "--style", "string", "--name", "adds numbers"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("\"adds numbers\" { }\n"));
}

#[test]
fn cli_skeleton_rejects_unknown_style() {
    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["skeleton", "--style", "WordSpec", "--name", "x"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown spec style"));
}

#[test]
fn cli_styles_lists_registry_in_order() {
    let value = run_json(&["styles", "--format", "json"]);
    let ids: Vec<&str> = value
        .as_array()
        .expect("styles array")
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["feature", "fun", "should", "describe", "behavior", "expect", "string"]
    );
}
