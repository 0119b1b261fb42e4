use assert_cmd::cargo::{cargo_bin_cmd, CommandCargoExt};
use reqwest::blocking::Client;
use serde_json::Value;
use std::net::TcpListener;
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

const FIXTURE_ROOT: &str = "tests/fixtures/kotest_repo";

struct TestDaemon {
    base_url: String,
    child: Child,
}

impl TestDaemon {
    fn spawn() -> Self {
        // Bind an ephemeral port first so we know which port to pass
        // to `specscan serve`.
        let listener =
            TcpListener::bind("127.0.0.1:0").expect("bind ephemeral TCP listener for daemon");
        let port = listener
            .local_addr()
            .expect("local_addr for daemon listener")
            .port();
        drop(listener);

        let addr_arg = format!("127.0.0.1:{port}");
        let base_url = format!("http://{addr_arg}");

        let log_dir = std::env::temp_dir();
        let stdout_file =
            std::fs::File::create(log_dir.join(format!("specscan_daemon_{port}_stdout.log")))
                .expect("create daemon stdout log file");
        let stderr_file =
            std::fs::File::create(log_dir.join(format!("specscan_daemon_{port}_stderr.log")))
                .expect("create daemon stderr log file");

        let mut cmd = Command::cargo_bin("specscan").expect("locate specscan binary");
        cmd.args(["serve", "--addr", &addr_arg])
            .stdout(stdout_file)
            .stderr(stderr_file);
        let child = cmd.spawn().expect("spawn specscan serve daemon");

        wait_for_health(&base_url);

        Self { base_url, child }
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn wait_for_health(base_url: &str) {
    let client = Client::new();
    let url = format!("{base_url}/v1/health");

    let mut last_err = None;
    for _ in 0..150 {
        match client.get(&url).send() {
            Ok(resp) if resp.status().is_success() => return,
            Err(e) => {
                last_err = Some(format!("HTTP error: {e}"));
                thread::sleep(Duration::from_millis(100));
            }
            Ok(resp) => {
                last_err = Some(format!("unexpected status: {}", resp.status()));
                thread::sleep(Duration::from_millis(100));
            }
        }
    }

    panic!(
        "specscan HTTP daemon did not become healthy in time. Last error: {}",
        last_err.unwrap_or_else(|| "unknown".to_string())
    );
}

fn json_stdout(cmd: &mut assert_cmd::Command) -> Value {
    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json output")
}

#[test]
fn cli_scan_via_server_matches_local_scan() {
    let daemon = TestDaemon::spawn();

    let mut local_cmd = cargo_bin_cmd!("specscan");
    local_cmd.args(["scan", "--no-server", "--path", FIXTURE_ROOT, "--format", "json"]);
    let local_value = json_stdout(&mut local_cmd);

    let mut server_cmd = cargo_bin_cmd!("specscan");
    server_cmd.args([
        "scan",
        "--path",
        FIXTURE_ROOT,
        "--format",
        "json",
        "--server",
        &daemon.base_url,
    ]);
    let server_value = json_stdout(&mut server_cmd);

    assert_eq!(
        local_value, server_value,
        "daemon-backed scan should match local CLI scan"
    );
}

#[test]
fn cli_scan_uses_server_url_from_env() {
    let daemon = TestDaemon::spawn();

    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.env("SPECSCAN_SERVER_URL", &daemon.base_url);
    cmd.args(["scan", "--path", FIXTURE_ROOT, "--format", "json"]);

    let value = json_stdout(&mut cmd);
    assert_eq!(value["summary"]["specs"], 4);
}

#[test]
fn cli_test_at_via_server_matches_local_lookup() {
    let daemon = TestDaemon::spawn();
    let file = format!("{FIXTURE_ROOT}/MathStringSpec.kt");
    let args = [
        "test-at", "--file", &file, "--line", "10", "--column", "30", "--leaf", "--format", "json",
    ];

    let mut local_cmd = cargo_bin_cmd!("specscan");
    local_cmd.args(args).arg("--no-server");
    let local_value = json_stdout(&mut local_cmd);

    let mut server_cmd = cargo_bin_cmd!("specscan");
    server_cmd.args(args).args(["--server", &daemon.base_url]);
    let server_value = json_stdout(&mut server_cmd);

    assert_eq!(local_value, server_value);
    assert_eq!(local_value["test"]["name"], "division by zero throws");
}

#[test]
fn cli_serve_health_endpoint_reports_ok_status() {
    let daemon = TestDaemon::spawn();
    let client = Client::new();

    let resp = client
        .get(format!("{}/v1/health", daemon.base_url))
        .send()
        .expect("health response");
    assert!(resp.status().is_success());

    let value: Value = resp.json().expect("valid health JSON body");
    assert_eq!(value["status"], "ok");
}

#[test]
fn cli_serve_lists_styles() {
    let daemon = TestDaemon::spawn();
    let client = Client::new();

    let value: Value = client
        .get(format!("{}/v1/styles", daemon.base_url))
        .send()
        .expect("styles response")
        .json()
        .expect("valid styles JSON body");

    let styles = value.as_array().expect("styles array");
    assert_eq!(styles.len(), 7);
    assert_eq!(styles[4]["fqn"], "io.kotest.core.spec.style.BehaviorSpec");
}

#[test]
fn cli_serve_reports_errors_as_json() {
    let daemon = TestDaemon::spawn();
    let client = Client::new();

    let resp = client
        .post(format!("{}/v1/scan", daemon.base_url))
        .json(&serde_json::json!({ "paths": ["definitely/not/here"] }))
        .send()
        .expect("scan response");
    assert_eq!(resp.status().as_u16(), 400);

    let value: Value = resp.json().expect("valid error JSON body");
    assert!(value["error"]
        .as_str()
        .unwrap()
        .contains("path does not exist"));
}

#[test]
fn cli_index_info_via_server_reports_missing_index() {
    let daemon = TestDaemon::spawn();
    let tmp = tempdir().expect("tempdir");
    let db_path = tmp.path().join("absent.sqlite");

    let mut cmd = cargo_bin_cmd!("specscan");
    cmd.args(["index-info", "--server", &daemon.base_url, "--index-path"]);
    cmd.arg(&db_path);

    cmd.assert().failure();
}
