// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::{Command, Output};

fn run_gateway(env: &[(&str, &str)]) -> Output {
    // Empty working directory so no stray .env file is picked up.
    let dir = tempfile::tempdir().expect("tempdir");
    Command::new(env!("CARGO_BIN_EXE_enclave-gateway"))
        .env_clear()
        .envs(env.iter().copied())
        .current_dir(dir.path())
        .output()
        .expect("gateway binary runs")
}

#[test]
fn missing_enclave_name_exits_non_zero() {
    let output = run_gateway(&[
        ("API_BASE_URL", "https://api.example.com"),
        ("SERVICE_USERNAME", "svc"),
        ("SERVICE_PASSWORD", "hunter2"),
        ("REDIS_URL", "127.0.0.1:6379"),
        ("WORKFLOW_EVENTS_CHANNEL", "workflow.events"),
        ("COOKIE_SIGNATURE_SECRET", "cookie-secret"),
    ]);

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let logs = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(logs.contains("ENCLAVE_NAME"), "logs were: {logs}");
    assert!(!logs.contains("hunter2"));
}

#[test]
fn empty_environment_reports_every_missing_variable() {
    let output = run_gateway(&[]);
    assert_eq!(output.status.code(), Some(1));

    let logs = String::from_utf8_lossy(&output.stdout);
    for name in [
        "ENCLAVE_NAME",
        "API_BASE_URL",
        "SERVICE_USERNAME",
        "SERVICE_PASSWORD",
        "REDIS_URL",
        "NATS_URL",
        "WORKFLOW_EVENTS_CHANNEL",
        "COOKIE_SIGNATURE_SECRET",
    ] {
        assert!(logs.contains(name), "{name} missing from: {logs}");
    }
}
