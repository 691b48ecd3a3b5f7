// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fault-injecting checkpoint writer.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::checkpoint::{CheckpointError, CheckpointWriter, FsCheckpointWriter};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stage of an atomic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStage {
    WriteTmp,
    FsyncFile,
    Rename,
    FsyncDir,
}

/// Recorded I/O operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoOp {
    pub stage: IoStage,
    pub path: PathBuf,
}

/// Writes through to the real filesystem, logging each operation and failing
/// on demand for files whose name matches a configured suffix.
#[derive(Debug, Clone, Default)]
pub struct FakeCheckpointWriter {
    inner: FsCheckpointWriter,
    log: Arc<Mutex<Vec<IoOp>>>,
    failures: Arc<Mutex<Vec<(IoStage, String)>>>,
}

impl FakeCheckpointWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `stage` for any path ending in `suffix` (e.g. `"result.json.tmp"`).
    pub fn fail_on(&self, stage: IoStage, suffix: impl Into<String>) {
        self.failures.lock().push((stage, suffix.into()));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    pub fn log(&self) -> Vec<IoOp> {
        self.log.lock().clone()
    }

    fn record(&self, stage: IoStage, path: &Path) -> Result<(), CheckpointError> {
        self.log.lock().push(IoOp {
            stage,
            path: path.to_path_buf(),
        });
        let text = path.to_string_lossy();
        let injected = self
            .failures
            .lock()
            .iter()
            .any(|(s, suffix)| *s == stage && text.ends_with(suffix.as_str()));
        if injected {
            return Err(CheckpointError::Io(std::io::Error::other(format!(
                "injected {stage:?} failure for {text}"
            ))));
        }
        Ok(())
    }
}

impl CheckpointWriter for FakeCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        self.record(IoStage::WriteTmp, path)?;
        self.inner.write_tmp(path, data)
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        self.record(IoStage::FsyncFile, path)?;
        self.inner.fsync_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        self.record(IoStage::Rename, to)?;
        self.inner.rename(from, to)
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        self.record(IoStage::FsyncDir, path)?;
        self.inner.fsync_dir(path)
    }
}
