//! Smoke tests for the serial-loopback binary.

mod common;

use common::PtyPair;
use std::path::Path;
use std::process::{Command, Output};

fn run_loopback(workdir: &Path, args: &[&str]) -> Output {
    run_loopback_with_env(workdir, args, &[])
}

fn run_loopback_with_env(workdir: &Path, args: &[&str], vars: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_serial-loopback"))
        .args(args)
        .current_dir(workdir)
        .env_remove("TEST_PORT")
        .env_remove("TEST_BAUD")
        .env_remove("TEST_TIMEOUT")
        .env_remove("LINUX_SERIAL_PORT_PATH")
        .env_remove("LINUX_SERIAL_LINE_BAUD")
        .env_remove("LINUX_SERIAL_LINE_VMIN")
        .env_remove("LINUX_SERIAL_LINE_VTIME")
        .env_remove("LINUX_SERIAL_SELFTEST_TIMEOUT_MS")
        .env_remove("LINUX_SERIAL_LOG_LEVEL")
        .env_remove("RUST_LOG")
        .env("LINUX_SERIAL_CONFIG", workdir.join("absent.toml"))
        .env("XDG_CONFIG_HOME", workdir)
        .envs(vars.iter().copied())
        .output()
        .expect("failed to start binary")
}

#[test]
fn missing_port_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_loopback(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No serial port given"), "Got: {stderr}");
}

#[test]
fn nonexistent_port_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_loopback(dir.path(), &["/dev/nonexistent_port_12345"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "Got: {stderr}");
}

#[test]
fn unsupported_baud_is_rejected_by_the_parser() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_loopback(dir.path(), &["--baud", "12345", "/dev/ttyS0"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported baud rate"), "Got: {stderr}");
}

#[test]
fn port_taken_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("linux-serial.toml");
    std::fs::write(&config, "[port]\npath = \"/dev/nonexistent_port_67890\"\n").unwrap();

    let output = run_loopback(dir.path(), &["--config", config.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nonexistent_port_67890"), "Got: {stderr}");
}

#[test]
fn pty_loopback_passes() {
    let mut pty = PtyPair::open().unwrap();
    let echo = pty.spawn_echo();
    let dir = tempfile::tempdir().unwrap();

    let output = run_loopback(
        dir.path(),
        &["--timeout-ms", "5000", "--baud", "115200", &pty.slave_path],
    );

    pty.release_slave();
    echo.join().unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(0), "Got: {stderr}");
    assert!(stderr.contains("loopback test passed"), "Got: {stderr}");
}

#[test]
fn silent_line_times_out() {
    let pty = PtyPair::open().unwrap();
    let dir = tempfile::tempdir().unwrap();

    // Without VMIN 0 the first read would block past the deadline.
    let output = run_loopback_with_env(
        dir.path(),
        &["--timeout-ms", "300", &pty.slave_path],
        &[("LINUX_SERIAL_LINE_VMIN", "0"), ("LINUX_SERIAL_LINE_VTIME", "1")],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("timed out"), "Got: {stderr}");
}

#[test]
fn timeout_applies_with_default_line_timing() {
    let pty = PtyPair::open().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let output = run_loopback(dir.path(), &["--timeout-ms", "300", &pty.slave_path]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("timed out"), "Got: {stderr}");
}
