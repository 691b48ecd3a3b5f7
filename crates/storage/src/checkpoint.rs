// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable atomic file writes.
//!
//! Every file the store commits (`state.json`, `input.json`, `result.json`)
//! goes through the same sequence:
//!
//! ```text
//! write <name>.tmp
//! fsync <name>.tmp
//! rename <name>.tmp → <name>
//! fsync parent directory
//! ```
//!
//! A reader therefore sees either the previous file or the complete new one,
//! never a partial write. `result.json` relies on this to act as the
//! completion marker of an effect.
//!
//! ## Testability
//!
//! The `CheckpointWriter` trait abstracts the I/O so tests can inject a
//! failure at any stage and check what is left on disk.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from atomic writes
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File operations used by [`write_atomic`].
pub trait CheckpointWriter: std::fmt::Debug + Send + Sync + 'static {
    /// Write data to a temporary file, creating parent directories.
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError>;

    /// Fsync a file to ensure data is durable.
    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError>;

    /// Atomically rename tmp file to final path.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError>;

    /// Fsync directory to make rename durable.
    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError>;
}

/// Production writer using real filesystem operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCheckpointWriter;

impl CheckpointWriter for FsCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        let file = File::open(path)?;
        file.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        let dir = File::open(path)?;
        dir.sync_all()?;
        Ok(())
    }
}

/// Temporary sibling used while writing `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `data` so that readers never observe a partial file.
pub fn write_atomic<W: CheckpointWriter + ?Sized>(
    writer: &W,
    path: &Path,
    data: &[u8],
) -> Result<(), CheckpointError> {
    let tmp = tmp_path(path);
    writer.write_tmp(&tmp, data)?;
    writer.fsync_file(&tmp)?;
    writer.rename(&tmp, path)?;
    if let Some(parent) = path.parent() {
        writer.fsync_dir(parent)?;
    }
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json_atomic<W, T>(writer: &W, path: &Path, value: &T) -> Result<(), CheckpointError>
where
    W: CheckpointWriter + ?Sized,
    T: serde::Serialize + ?Sized,
{
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(writer, path, &bytes)
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
