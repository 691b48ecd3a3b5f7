// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `state.json`: the run state at a journal sequence number.
//!
//! Recovery loads the snapshot and replays journal entries after `seq`.

use crate::checkpoint::{write_json_atomic, CheckpointError, CheckpointWriter};
use crate::migration::{MigrationError, MigrationRegistry};
use crate::RunState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Version written into new snapshots.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Write(#[from] CheckpointError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub v: u32,
    /// Journal sequence number the state includes
    pub seq: u64,
    pub state: RunState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: RunState) -> Self {
        Self {
            v: CURRENT_SNAPSHOT_VERSION,
            seq,
            state,
            created_at: Utc::now(),
        }
    }

    /// Save atomically through `writer`.
    pub fn save(&self, writer: &dyn CheckpointWriter, path: &Path) -> Result<(), SnapshotError> {
        write_json_atomic(writer, path, self)?;
        Ok(())
    }

    /// Load the snapshot if it exists.
    ///
    /// Returns `Ok(None)` if the file doesn't exist or is corrupt. Corrupt
    /// snapshots are moved to a `.bak` file so the run can be rebuilt from
    /// the journal alone. A snapshot from a newer build is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(path)?);
        let doc: Value = match serde_json::from_reader(reader) {
            Ok(doc) => doc,
            Err(e) => return Self::quarantine(path, &e.to_string()),
        };

        let doc = MigrationRegistry::new().migrate_to(doc, CURRENT_SNAPSHOT_VERSION)?;
        match serde_json::from_value(doc) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => Self::quarantine(path, &e.to_string()),
        }
    }

    fn quarantine(path: &Path, error: &str) -> Result<Option<Self>, SnapshotError> {
        let bak_path = rotate_bak_path(path);
        warn!(
            error,
            path = %path.display(),
            bak = %bak_path.display(),
            "Corrupt snapshot, moving to .bak and rebuilding from journal",
        );
        fs::rename(path, &bak_path)?;
        Ok(None)
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
