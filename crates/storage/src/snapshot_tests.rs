// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::checkpoint::FsCheckpointWriter;
use serde_json::json;
use tempfile::tempdir;
use wp_core::test_support::*;

fn sample_state() -> RunState {
    RunState::replay(&[
        run_created_event("run-1", 2),
        task_completed_event("run-1", 0, "a", "e-1", json!({ "summary": "ok" })),
    ])
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let snapshot = Snapshot::new(2, sample_state());
    snapshot.save(&FsCheckpointWriter, &path).unwrap();

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.v, CURRENT_SNAPSHOT_VERSION);
}

#[test]
fn file_has_documented_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    Snapshot::new(7, sample_state())
        .save(&FsCheckpointWriter, &path)
        .unwrap();

    let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    for key in ["v", "seq", "state", "created_at"] {
        assert!(doc.get(key).is_some(), "missing {key}");
    }
    assert_eq!(doc["state"]["current_step_index"], 1);
}

#[test]
fn missing_file_is_none() {
    let dir = tempdir().unwrap();
    assert!(Snapshot::load(&dir.path().join("state.json")).unwrap().is_none());
}

#[yare::parameterized(
    not_json   = { "{ nope" },
    wrong_type = { r#"{"v":1,"seq":"one","state":{},"created_at":"x"}"# },
)]
fn corrupt_snapshot_moved_aside(content: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, content).unwrap();

    assert!(Snapshot::load(&path).unwrap().is_none());
    assert!(!path.exists());
    assert!(dir.path().join("state.bak").exists());
}

#[test]
fn newer_snapshot_is_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut doc = serde_json::to_value(Snapshot::new(1, sample_state())).unwrap();
    doc["v"] = json!(CURRENT_SNAPSHOT_VERSION + 1);
    fs::write(&path, doc.to_string()).unwrap();

    let err = Snapshot::load(&path).unwrap_err();
    assert!(matches!(err, SnapshotError::Migration(MigrationError::TooNew(..))));
    assert!(path.exists());
}

#[test]
fn bak_rotation_keeps_three() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    for i in 0..4 {
        fs::write(&path, format!("corrupt {i}")).unwrap();
        assert!(Snapshot::load(&path).unwrap().is_none());
    }

    assert_eq!(fs::read_to_string(dir.path().join("state.bak")).unwrap(), "corrupt 3");
    assert_eq!(fs::read_to_string(dir.path().join("state.bak.2")).unwrap(), "corrupt 2");
    assert_eq!(fs::read_to_string(dir.path().join("state.bak.3")).unwrap(), "corrupt 1");
    assert!(!dir.path().join("state.bak.4").exists());
}
