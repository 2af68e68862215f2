#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the pulse-surveys binary

use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pulse-surveys"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute pulse-surveys")
}

const SECRET: &str = "smoke-test-respondent-secret";

fn write_config(dir: &TempDir) -> String {
    let db = dir.path().join("pulse.db");
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        format!(
            "database:\n  dsn: \"sqlite://{}?mode=rwc\"\nlogging:\n  level: warn\npulse_surveys:\n  respondent_key_secret: \"{SECRET}\"\n",
            db.display()
        ),
    )
    .unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn help_lists_subcommands() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for needle in [
        "migrate",
        "check",
        "transition",
        "issue-invite",
        "resend-invite",
        "rate",
        "anonymize-user",
        "--config",
    ] {
        assert!(stdout.contains(needle), "help should mention {needle}");
    }
}

#[test]
fn missing_config_file_fails() {
    let output = run_cli(&["--config", "/nonexistent/pulse.yaml", "check"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn print_config_shows_effective_values() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = run_cli(&["--config", &config, "--print-config"]);
    assert!(output.status.success());

    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed["logging"]["level"], "warn");
    assert_eq!(
        printed["pulse_surveys"]["default_invitation_expiry_days"],
        7
    );
    assert!(!String::from_utf8_lossy(&output.stdout).contains(SECRET));
}

#[test]
fn migrate_then_query_unknown_survey() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = run_cli(&["--config", &config, "migrate"]);
    assert!(
        output.status.success(),
        "migrate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(dir.path().join("pulse.db").exists());

    let output = run_cli(&[
        "--config",
        &config,
        "rate",
        "--survey",
        "0190f3a8-7b1c-7c3e-9d7a-2f4b6c8e0a11",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("The requested survey does not exist."));
}

#[test]
fn company_admin_transition_needs_a_company() {
    let output = run_cli(&[
        "transition",
        "--survey",
        "0190f3a8-7b1c-7c3e-9d7a-2f4b6c8e0a11",
        "--to",
        "active",
        "--actor-role",
        "company-admin",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--actor-company"));
}
