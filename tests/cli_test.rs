#![allow(deprecated)]

/// Command-line tests for the bridge binary
///
/// These exercise argument parsing and configuration validation only;
/// nothing here needs a cluster or a NATS server.
use assert_cmd::Command;
use predicates::prelude::*;
mod common;

fn bridge() -> Command {
    let mut cmd = Command::cargo_bin("kube-nats-bridge").unwrap();
    for var in [
        "BRIDGE_TOPIC_PREFIX",
        "BRIDGE_CLUSTER",
        "BRIDGE_NATS_URL",
        "BRIDGE_LOG_LEVEL",
        "BRIDGE_NATS_PASSWORD",
        "NATS_PASSWORD",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_commands() {
    bridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("tail"));
}

#[test]
fn test_run_help_lists_overrides() {
    bridge()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--kubeconfig"))
        .stdout(predicate::str::contains("--nats"))
        .stdout(predicate::str::contains("--topic-prefix"))
        .stdout(predicate::str::contains("--cluster"));
}

#[test]
fn test_version() {
    bridge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kube-nats-bridge"));
}

#[test]
fn test_invalid_topic_prefix_is_rejected() {
    bridge()
        .args(["run", "--topic-prefix", "bad prefix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid topic prefix"));
}

#[test]
fn test_malformed_config_file_is_rejected() {
    let (_temp_dir, config_path) = common::temp_config_file("bridge: [not, a, map\n");

    bridge()
        .arg("--config")
        .arg(config_path)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_invalid_log_level_in_config_is_rejected() {
    let (_temp_dir, config_path) = common::temp_config_file("logging:\n  level: chatty\n");

    bridge()
        .arg("--config")
        .arg(config_path)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_tail_fails_without_server() {
    bridge()
        .args(["tail", "--nats", "nats://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect"));
}
