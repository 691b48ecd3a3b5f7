// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout of runs.
//!
//! ```text
//! <state_dir>/runs/<run_id>/
//!   journal.jsonl
//!   state.json
//!   tasks/<effect_id>/input.json
//!   tasks/<effect_id>/result.json
//! ```

use crate::checkpoint::{write_json_atomic, CheckpointError, CheckpointWriter, FsCheckpointWriter};
use crate::journal::{Journal, JournalError};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::RunState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use wp_core::{EffectId, RunEvent, RunId};

const JOURNAL_FILE: &str = "journal.jsonl";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Write(#[from] CheckpointError),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("run {0} not found")]
    NotFound(RunId),
    #[error("run {0} already exists")]
    AlreadyExists(RunId),
}

/// Contents of `result.json`. Its presence marks the effect as finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskResult {
    Ok { output: Value },
    Error { kind: String, message: String },
}

/// Root of all persisted runs.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
    writer: Arc<dyn CheckpointWriter>,
}

impl RunStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self::with_writer(state_dir, Arc::new(FsCheckpointWriter))
    }

    pub fn with_writer(state_dir: impl AsRef<Path>, writer: Arc<dyn CheckpointWriter>) -> Self {
        Self {
            root: state_dir.as_ref().join("runs"),
            writer,
        }
    }

    pub fn runs_dir(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.as_str())
    }

    pub fn task_dir(&self, run_id: &RunId, effect_id: &EffectId) -> PathBuf {
        self.run_dir(run_id).join("tasks").join(effect_id.as_str())
    }

    pub fn input_path(&self, run_id: &RunId, effect_id: &EffectId) -> PathBuf {
        self.task_dir(run_id, effect_id).join("input.json")
    }

    pub fn result_path(&self, run_id: &RunId, effect_id: &EffectId) -> PathBuf {
        self.task_dir(run_id, effect_id).join("result.json")
    }

    /// Start a new run from its `run:created` event.
    pub fn create(&self, created: &RunEvent) -> Result<RunLog, StoreError> {
        let run_id = created.run_id().clone();
        let dir = self.run_dir(&run_id);
        if dir.join(JOURNAL_FILE).exists() {
            return Err(StoreError::AlreadyExists(run_id));
        }

        let journal = Journal::open(&dir.join(JOURNAL_FILE))?;
        let mut log = RunLog {
            dir,
            journal,
            state: RunState::default(),
            writer: Arc::clone(&self.writer),
        };
        log.commit(created)?;
        Ok(log)
    }

    /// Rebuild a run from its snapshot plus the journal tail.
    pub fn open(&self, run_id: &RunId) -> Result<RunLog, StoreError> {
        let dir = self.run_dir(run_id);
        let journal_path = dir.join(JOURNAL_FILE);
        if !journal_path.exists() {
            return Err(StoreError::NotFound(run_id.clone()));
        }

        let journal = Journal::open(&journal_path)?;
        let (mut state, seq) = match Snapshot::load(&dir.join(STATE_FILE))? {
            Some(snapshot) if snapshot.seq <= journal.last_seq() => (snapshot.state, snapshot.seq),
            Some(snapshot) => {
                // The journal lost entries the snapshot saw; trust the journal
                tracing::warn!(
                    run_id = %run_id,
                    snapshot_seq = snapshot.seq,
                    journal_seq = journal.last_seq(),
                    "snapshot ahead of journal, replaying from start",
                );
                (RunState::default(), 0)
            }
            None => (RunState::default(), 0),
        };

        let tail = journal.entries_after(seq)?;
        let replayed = tail.len();
        for entry in &tail {
            state.apply_event(&entry.event);
        }
        if state.run_id.as_str().is_empty() {
            return Err(StoreError::NotFound(run_id.clone()));
        }

        tracing::debug!(run_id = %run_id, seq, replayed, status = %state.status, "loaded run");
        Ok(RunLog {
            dir,
            journal,
            state,
            writer: Arc::clone(&self.writer),
        })
    }

    /// Ids of all runs with a journal, sorted.
    pub fn list_runs(&self) -> Result<Vec<RunId>, StoreError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut runs: Vec<RunId> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().join(JOURNAL_FILE).is_file())
            .filter_map(|e| e.file_name().to_str().map(RunId::from))
            .collect();
        runs.sort();
        Ok(runs)
    }

    pub fn write_input(
        &self,
        run_id: &RunId,
        effect_id: &EffectId,
        input: &Value,
    ) -> Result<PathBuf, StoreError> {
        let path = self.input_path(run_id, effect_id);
        write_json_atomic(self.writer.as_ref(), &path, input)?;
        Ok(path)
    }

    pub fn read_input(&self, run_id: &RunId, effect_id: &EffectId) -> Result<Option<Value>, StoreError> {
        read_json(&self.input_path(run_id, effect_id))
    }

    /// Write `result.json` atomically. After this returns the effect is done.
    pub fn write_result(
        &self,
        run_id: &RunId,
        effect_id: &EffectId,
        result: &TaskResult,
    ) -> Result<PathBuf, StoreError> {
        let path = self.result_path(run_id, effect_id);
        write_json_atomic(self.writer.as_ref(), &path, result)?;
        Ok(path)
    }

    pub fn read_result(
        &self,
        run_id: &RunId,
        effect_id: &EffectId,
    ) -> Result<Option<TaskResult>, StoreError> {
        read_json(&self.result_path(run_id, effect_id))
    }

    pub fn has_result(&self, run_id: &RunId, effect_id: &EffectId) -> bool {
        self.result_path(run_id, effect_id).is_file()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_owned(),
                source,
            })
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_owned(),
            source,
        })
}

/// An open run: its journal plus the state it materializes.
#[derive(Debug)]
pub struct RunLog {
    dir: PathBuf,
    journal: Journal,
    state: RunState,
    writer: Arc<dyn CheckpointWriter>,
}

impl RunLog {
    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn seq(&self) -> u64 {
        self.journal.last_seq()
    }

    /// Append `event` to the journal, apply it, then refresh `state.json`.
    ///
    /// The journal append is the durability point. A failed snapshot write
    /// is logged and repaired by replay on the next load.
    pub fn commit(&mut self, event: &RunEvent) -> Result<u64, StoreError> {
        let seq = self.journal.append(event)?;
        self.state.apply_event(event);

        let snapshot = Snapshot::new(seq, self.state.clone());
        if let Err(e) = snapshot.save(self.writer.as_ref(), &self.dir.join(STATE_FILE)) {
            tracing::warn!(
                run_id = %self.state.run_id,
                seq,
                error = %e,
                "failed to write state snapshot",
            );
        }
        tracing::trace!(run_id = %self.state.run_id, seq, event = event.name(), "committed");
        Ok(seq)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
