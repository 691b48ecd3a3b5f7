// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

const VARS: &[&str] = &[
    "WAYPOINT_STATE_DIR",
    "XDG_STATE_HOME",
    "WAYPOINT_AGENT_TIMEOUT_MS",
    "WAYPOINT_AGENT_ATTEMPTS",
    "WAYPOINT_AGENT_COMMAND",
    "WAYPOINT_LOG_FILE",
];

/// Run `f` with exactly `vars` set among the engine's variables.
fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let saved: Vec<_> = VARS.iter().map(|k| (*k, std::env::var_os(k))).collect();
    for key in VARS {
        std::env::remove_var(key);
    }
    for (key, value) in vars {
        std::env::set_var(key, value);
    }
    let result = f();
    for (key, value) in saved {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    result
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    let dir = with_env(
        &[("WAYPOINT_STATE_DIR", "/srv/wp"), ("XDG_STATE_HOME", "/xdg")],
        state_dir,
    );
    assert_eq!(dir.unwrap(), PathBuf::from("/srv/wp"));
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg() {
    let dir = with_env(&[("XDG_STATE_HOME", "/xdg")], state_dir);
    assert_eq!(dir.unwrap(), PathBuf::from("/xdg/waypoint"));
}

#[test]
#[serial]
fn state_dir_falls_back_to_home() {
    let dir = with_env(&[], state_dir).unwrap();
    assert!(dir.ends_with(".local/state/waypoint"), "got {}", dir.display());
}

#[test]
#[serial]
fn empty_values_are_unset() {
    let dir = with_env(&[("WAYPOINT_STATE_DIR", "  "), ("XDG_STATE_HOME", "/xdg")], state_dir);
    assert_eq!(dir.unwrap(), PathBuf::from("/xdg/waypoint"));
}

#[test]
#[serial]
fn from_env_reads_everything() {
    let config = with_env(
        &[
            ("WAYPOINT_STATE_DIR", "/srv/wp"),
            ("WAYPOINT_AGENT_TIMEOUT_MS", "1500"),
            ("WAYPOINT_AGENT_ATTEMPTS", "3"),
            ("WAYPOINT_AGENT_COMMAND", "claude -p"),
            ("WAYPOINT_LOG_FILE", "/tmp/wp.log"),
        ],
        EngineConfig::from_env,
    )
    .unwrap();

    assert_eq!(
        config,
        EngineConfig::new("/srv/wp")
            .with_agent_timeout(Duration::from_millis(1500))
            .with_agent_attempts(3)
            .with_agent_command("claude -p")
            .with_log_file("/tmp/wp.log")
    );
}

#[test]
#[serial]
fn from_env_defaults() {
    let config = with_env(&[("WAYPOINT_STATE_DIR", "/srv/wp")], EngineConfig::from_env).unwrap();
    assert_eq!(config, EngineConfig::new("/srv/wp"));
    assert_eq!(config.orchestrator_config(), OrchestratorConfig::default());
}

#[test]
#[serial]
fn zero_timeout_disables_it() {
    let timeout = with_env(&[("WAYPOINT_AGENT_TIMEOUT_MS", "0")], agent_timeout);
    assert_eq!(timeout.unwrap(), None);
}

#[test]
#[serial]
fn invalid_numbers_are_rejected() {
    for (name, value) in [
        ("WAYPOINT_AGENT_TIMEOUT_MS", "soon"),
        ("WAYPOINT_AGENT_ATTEMPTS", "-1"),
        ("WAYPOINT_AGENT_ATTEMPTS", "0"),
    ] {
        let err = with_env(
            &[("WAYPOINT_STATE_DIR", "/srv/wp"), (name, value)],
            EngineConfig::from_env,
        )
        .unwrap_err();
        assert!(
            err.to_string().starts_with(&format!("invalid {name}=")),
            "got: {err}"
        );
    }
}

#[test]
fn attempts_are_clamped() {
    assert_eq!(EngineConfig::new("/x").with_agent_attempts(0).agent_attempts, 1);
}

#[test]
fn store_lives_under_state_dir() {
    let store = EngineConfig::new("/srv/wp").store();
    assert_eq!(store.runs_dir(), std::path::Path::new("/srv/wp/runs"));
}
