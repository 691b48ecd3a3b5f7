// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL event journal for one run.
//!
//! Each entry is a single line of JSON:
//! `{"seq":N,"timestamp":"2026-01-01T00:00:00Z","event":{...}}\n`
//!
//! Appends are synced before returning. A run commits at most a handful of
//! events per step, so there is no group commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use wp_core::RunEvent;

/// Errors that can occur in journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialization helper for writing entries without cloning the event.
#[derive(Serialize)]
struct EntryRef<'a> {
    seq: u64,
    timestamp: DateTime<Utc>,
    event: &'a RunEvent,
}

/// A single journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event: RunEvent,
}

/// Journal file handle positioned for appends.
#[derive(Debug)]
pub struct Journal {
    file: File,
    path: PathBuf,
    /// Sequence number of the last entry written
    last_seq: u64,
}

impl Journal {
    /// Open or create a journal.
    ///
    /// A torn or corrupt tail (from a crash mid-append) is moved aside to a
    /// `.bak` file and the journal is rewritten with the valid prefix. A
    /// complete final entry missing only its newline is kept and terminated
    /// so the next append starts on its own line.
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = open_append(path)?;
        let (valid, corrupt) = read_valid(&file)?;

        let file = if corrupt {
            drop(file);
            let bak_path = crate::snapshot::rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = valid.len(),
                "Corrupt journal detected, rotating to .bak and preserving valid entries",
            );
            std::fs::rename(path, &bak_path)?;
            {
                let mut clean = File::create(path)?;
                for (_, line) in &valid {
                    clean.write_all(line.as_bytes())?;
                    clean.write_all(b"\n")?;
                }
                clean.sync_all()?;
            }
            open_append(path)?
        } else {
            let mut file = file;
            if !ends_with_newline(&file)? {
                warn!(path = %path.display(), "Journal tail missing newline, terminating it");
                file.write_all(b"\n")?;
                file.sync_data()?;
            }
            file
        };

        let last_seq = valid.iter().map(|(e, _)| e.seq).max().unwrap_or(0);
        Ok(Self {
            file,
            path: path.to_owned(),
            last_seq,
        })
    }

    /// Append an event and sync it to disk. Returns the assigned sequence.
    pub fn append(&mut self, event: &RunEvent) -> Result<u64, JournalError> {
        let seq = self.last_seq + 1;
        let record = EntryRef {
            seq,
            timestamp: Utc::now(),
            event,
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        self.last_seq = seq;
        Ok(seq)
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries with a sequence number greater than `seq`.
    ///
    /// Used for recovery (replaying from snapshot).
    pub fn entries_after(&self, seq: u64) -> Result<Vec<JournalEntry>, JournalError> {
        let (valid, _) = read_valid(&self.file)?;
        Ok(valid
            .into_iter()
            .map(|(entry, _)| entry)
            .filter(|entry| entry.seq > seq)
            .collect())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
}

/// True for an empty file or one whose last byte is `\n`.
fn ends_with_newline(file: &File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    let mut reader = file.try_clone()?;
    reader.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    reader.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Read entries up to the first unparseable line.
///
/// Returns the entries with their raw lines, and whether corruption was hit.
fn read_valid(file: &File) -> Result<(Vec<(JournalEntry, String)>, bool), JournalError> {
    let mut reader = BufReader::new(file.try_clone()?);
    reader.seek(SeekFrom::Start(0))?;

    let mut valid = Vec::new();
    let mut line = String::new();
    let mut offset = 0u64;

    loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok((valid, true)),
            Err(e) => return Err(e.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            offset += bytes_read as u64;
            continue;
        }

        match serde_json::from_str::<JournalEntry>(trimmed) {
            Ok(entry) => valid.push((entry, trimmed.to_string())),
            Err(e) => {
                warn!(offset, error = %e, "Corrupt journal entry, stopping at corruption point");
                return Ok((valid, true));
            }
        }
        offset += bytes_read as u64;
    }

    Ok((valid, false))
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
