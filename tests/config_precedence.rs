mod common;

use std::path::Path;

use common::{StubResponse, StubServer, crashtest_cmd, make_temp_dir, run, stderr_of, stdout_of};

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdirs");
    }
    std::fs::write(path, bytes).expect("write");
}

#[test]
fn config_file_in_working_dir_is_picked_up() {
    let dir = make_temp_dir("config-default-file");
    let server = StubServer::start(vec![StubResponse::started("abc123")]);
    write_file(
        &dir.join("crashtest.toml"),
        format!(
            r#"
[api]
endpoint = "{}"

[scan]
pull_report = false
"#,
            server.endpoint
        )
        .as_bytes(),
    );

    let out = run(&dir, &["--webhook", "hook-1"]);
    assert!(out.status.success(), "stderr={}", stderr_of(&out));
    assert_eq!(server.requests(), vec!["POST /webhook/hook-1"]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cli_flag_overrides_config_file_pull_report() {
    let dir = make_temp_dir("config-cli-over-file");
    let server = StubServer::start(vec![
        StubResponse::started("abc123"),
        StubResponse::status(200),
        StubResponse::xml(b"<testsuite/>"),
    ]);
    write_file(
        &dir.join("ci/crashtest.toml"),
        format!(
            "[api]\nendpoint = \"{}\"\n\n[scan]\npull_report = \"false\"\nreport_path = \"junit.xml\"\n",
            server.endpoint
        )
        .as_bytes(),
    );

    let out = crashtest_cmd(&dir)
        .env("CRASHTEST_CONFIG", "ci/crashtest.toml")
        .args(["--webhook", "hook-1", "--pull-report", "true"])
        .output()
        .expect("run crashtest");
    assert!(out.status.success(), "stderr={}", stderr_of(&out));
    assert_eq!(server.requests().len(), 3);
    assert_eq!(
        std::fs::read(dir.join("junit.xml")).expect("read report"),
        b"<testsuite/>"
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn action_input_overrides_env_pull_report() {
    let dir = make_temp_dir("config-input-over-env");
    let server = StubServer::start(vec![StubResponse::started("abc123")]);

    let out = crashtest_cmd(&dir)
        .env("CRASHTEST_WEBHOOK", "hook-env")
        .env("CRASHTEST_PULL_REPORT", "true")
        .env("CRASHTEST_API_ENDPOINT", &server.endpoint)
        .env("INPUT_CRASHTEST-WEBHOOK", "hook-input")
        .env("INPUT_PULL-REPORT", "false")
        .output()
        .expect("run crashtest");
    assert!(out.status.success(), "stderr={}", stderr_of(&out));
    assert_eq!(server.requests(), vec!["POST /webhook/hook-input"]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn malformed_pull_report_still_pulls() {
    let dir = make_temp_dir("config-permissive-flag");
    let server = StubServer::start(vec![
        StubResponse::started("abc123"),
        StubResponse::status(200),
        StubResponse::xml(b"<testsuite/>"),
    ]);

    let out = run(
        &dir,
        &[
            "--webhook",
            "hook-1",
            "--endpoint",
            &server.endpoint,
            "--pull-report",
            "False",
        ],
    );
    assert!(out.status.success(), "stderr={}", stderr_of(&out));
    assert_eq!(server.requests().len(), 3);
    assert!(dir.join("report.xml").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn show_config_emits_effective_config() {
    let dir = make_temp_dir("config-show");
    write_file(
        &dir.join("crashtest.toml"),
        b"[scan]\npoll_interval_secs = 15\n",
    );

    let out = crashtest_cmd(&dir)
        .env_remove("CRASHTEST_POLL_INTERVAL_SECS")
        .args(["--show-config", "--max-wait", "300"])
        .output()
        .expect("run crashtest");
    assert!(out.status.success(), "stderr={}", stderr_of(&out));
    let stdout = stdout_of(&out);
    assert!(stdout.contains("poll_interval_secs = 15"), "stdout={stdout}");
    assert!(stdout.contains("max_wait_secs = 300"), "stdout={stdout}");
    assert!(stdout.contains("config_path"), "stdout={stdout}");

    let out = crashtest_cmd(&dir)
        .env_remove("CRASHTEST_POLL_INTERVAL_SECS")
        .args(["--show-config", "--json"])
        .output()
        .expect("run crashtest");
    assert!(out.status.success(), "stderr={}", stderr_of(&out));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(
        v.get("scan")
            .and_then(|s| s.get("poll_interval_secs"))
            .and_then(|n| n.as_u64()),
        Some(15)
    );
    assert_eq!(
        v.get("api")
            .and_then(|a| a.get("endpoint"))
            .and_then(|e| e.as_str()),
        Some("https://api.crashtest.cloud/webhook")
    );
    let _ = std::fs::remove_dir_all(&dir);
}
