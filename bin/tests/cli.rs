use std::process::{Command, Output};

fn exporter(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kea-exporter"))
        .args(args)
        .env_remove("TARGETS")
        .env("EXPORTER_LOG", "debug")
        .output()
        .expect("failed to run kea-exporter")
}

#[test]
fn missing_targets_is_a_usage_error() {
    let out = exporter(&[]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("TARGETS"));
}

#[test]
fn invalid_interval_rejected() {
    let out = exporter(&["--interval", "0", "/run/kea/kea4-ctrl-socket"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("interval"));
}

#[test]
fn client_cert_requires_key() {
    let out = exporter(&["--client-cert", "/etc/kea/cert.pem", "https://kea:8000/"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("client-key"));
}

#[test]
fn no_usable_target_is_fatal() {
    let out = exporter(&["--port", "0", "/nonexistent/kea4-ctrl-socket", ""]);
    assert!(!out.status.success());
    let logs = String::from_utf8_lossy(&out.stdout);
    assert!(logs.contains("skipping target"), "{logs}");
}
