//! CLI integration tests

use std::process::Command;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "bodysync-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Withings"), "Should describe the source");
    assert!(stdout.contains("--garmin-username"), "Should show Garmin option");
    assert!(
        stdout.contains("--trainerroad-username"),
        "Should show TrainerRoad option"
    );
    assert!(stdout.contains("--fromdate"), "Should show fromdate option");
    assert!(stdout.contains("--todate"), "Should show todate option");
    assert!(stdout.contains("--no-upload"), "Should show dry-run option");
    assert!(stdout.contains("--to-fit"), "Should show fit option");
    assert!(stdout.contains("--to-json"), "Should show json option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run_cli(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("bodysync"), "Should show binary name");
}

/// Passwords from the environment must not appear in help output
#[test]
fn test_help_hides_password_values() {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "bodysync-cli", "--", "--help"])
        .env("GARMIN_PASSWORD", "super-secret-value")
        .output()
        .expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(!stdout.contains("super-secret-value"));
}

/// Test that malformed dates are rejected by argument parsing
#[test]
fn test_invalid_date() {
    let output = run_cli(&["--fromdate", "yesterday"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Invalid date should fail");
    assert!(stderr.contains("YYYY-MM-DD"), "Should explain the date format");
}
