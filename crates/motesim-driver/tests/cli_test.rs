//! Integration tests for the motesim binary.
//!
//! These run the CLI from the workspace root so the bundled `topo/` and
//! `noise/` directories resolve, and check channel output, statistics and
//! exit status.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

use serde::Deserialize;

// ============================================================================
// JSON Deserialization Types for --stats Output
// ============================================================================

#[derive(Debug, Deserialize)]
struct RunSummary {
    scenario: String,
    session: SessionStats,
    engine: EngineStats,
}

#[derive(Debug, Deserialize)]
struct SessionStats {
    links_loaded: u64,
    boots_scheduled: u64,
    commands_sent: u64,
    steps_requested: u64,
}

#[derive(Debug, Deserialize)]
struct EngineStats {
    boots: u64,
    packets_delivered: u64,
    packets_dropped: u64,
}

// ============================================================================
// Test Helper Functions
// ============================================================================

/// Run the motesim binary from the workspace root.
fn motesim(args: &[&str]) -> Output {
    // CARGO_BIN_EXE_motesim is set by cargo when running tests for this crate
    let binary = env!("CARGO_BIN_EXE_motesim");

    Command::new(binary)
        .current_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/../.."))
        .env("RUST_LOG", "info")
        .args(args)
        .output()
        .expect("Failed to execute motesim")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "motesim failed:\nstdout: {}\nstderr: {}",
            stdout_of(output),
            stderr_of(output)
        );
    }
}

/// Extract the JSON summary printed after the channel output.
fn parse_summary(stdout: &str) -> RunSummary {
    let start = stdout
        .find("{\n")
        .expect("No JSON summary in stdout");
    serde_json::from_str(&stdout[start..]).expect("Failed to parse summary JSON")
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_ping_demo_issues_two_pings() {
    let output = motesim(&["builtin", "ping-demo", "--stats"]);
    assert_success(&output);
    let stdout = stdout_of(&output);

    for node in 1..=5 {
        assert!(
            stdout.contains(&format!("DEBUG ({}): Booted\n", node)),
            "node {} did not boot:\n{}",
            node,
            stdout
        );
    }
    assert_eq!(
        stdout.matches("DEBUG (1): Command Type: Ping\n").count(),
        2,
        "expected two pings at node 1:\n{}",
        stdout
    );

    let summary = parse_summary(&stdout);
    assert_eq!(summary.scenario, "ping-demo");
    assert_eq!(summary.session.links_loaded, 8);
    assert_eq!(summary.session.boots_scheduled, 5);
    assert_eq!(summary.session.commands_sent, 2);
    // Five run_time steps of 1, 1, 1, 1 and 10 at one tick per microsecond.
    assert_eq!(summary.session.steps_requested, 14_000);
    assert_eq!(summary.engine.boots, 5);
    assert_eq!(summary.engine.packets_delivered, 2);
}

#[test]
fn test_routing_drops_ping_after_mote_off() {
    let output = motesim(&["builtin", "routing", "--stats"]);
    assert_success(&output);
    let summary = parse_summary(&stdout_of(&output));

    assert_eq!(summary.engine.boots, 9);
    // Both pings go to node 8, which stays up.
    assert_eq!(summary.engine.packets_delivered, 2);
    assert_eq!(summary.engine.packets_dropped, 0);
}

#[test]
fn test_routing_table_dump() {
    let output = motesim(&["builtin", "routing-table"]);
    assert_success(&output);
    assert!(stdout_of(&output).contains("DEBUG (4): Command Type: Route Dump\n"));
}

#[test]
fn test_log_file_receives_channel_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_path = temp_dir.path().join("channels.log");

    let output = motesim(&[
        "builtin",
        "ping-demo",
        "--log-file",
        log_path.to_str().expect("temp path is not UTF-8"),
    ]);
    assert_success(&output);

    assert!(!stdout_of(&output).contains("DEBUG ("));
    let log = fs::read_to_string(&log_path).expect("Failed to read channel log");
    assert!(log.contains("DEBUG (1): A Command has been Issued.\n"));
}

#[test]
fn test_missing_topology_exits_without_loading_noise() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let scenario_path = temp_dir.path().join("missing.yaml");
    fs::write(
        &scenario_path,
        "steps:\n  - load_topology: does_not_exist.topo\n  - load_noise: no_noise.txt\n  - boot_all\n  - add_channel: general\n  - run_time: 1\n",
    )
    .expect("Failed to write scenario");

    let output = motesim(&[
        "run",
        scenario_path.to_str().expect("temp path is not UTF-8"),
    ]);

    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    // The scenario parsed and its first step ran before the failure.
    assert!(stderr.contains("Running scenario"), "stderr: {}", stderr);
    assert!(stderr.contains("Creating Topology!"), "stderr: {}", stderr);
    assert!(!stderr.contains("YAML parse error"), "stderr: {}", stderr);
    assert!(
        stderr.contains("Topology file topo/does_not_exist.topo not found."),
        "stderr: {}",
        stderr
    );
    assert!(!stderr.contains("Creating noise model"));
    assert!(!stderr.contains("Adding Channel"));
    let stdout = stdout_of(&output);
    assert!(!stdout.contains("Booted"));
    assert!(stdout.is_empty());
}

#[test]
fn test_noise_before_topology_warns_and_continues() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let scenario_path = temp_dir.path().join("early_noise.yaml");
    fs::write(
        &scenario_path,
        "steps:\n  - load_noise: no_noise.txt\n  - load_topology: example.topo\n  - run: 1\n",
    )
    .expect("Failed to write scenario");

    let output = motesim(&[
        "run",
        scenario_path.to_str().expect("temp path is not UTF-8"),
    ]);
    assert_success(&output);
    assert!(stderr_of(&output).contains("Create a topology first."));
}

#[test]
fn test_unknown_builtin_fails() {
    let output = motesim(&["builtin", "no-such-scenario"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("unknown built-in scenario"));
}

#[test]
fn test_list_shows_builtins() {
    let output = motesim(&["list"]);
    assert_success(&output);
    let stdout = stdout_of(&output);
    for name in ["ping-demo", "routing", "routing-table"] {
        assert!(stdout.contains(name));
    }
}
