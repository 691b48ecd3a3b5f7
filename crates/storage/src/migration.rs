// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upgrades for persisted `state.json` documents.
//!
//! Every snapshot carries a `"v"` field. Loading chains registered steps
//! until the document reaches [`crate::CURRENT_SNAPSHOT_VERSION`]; a
//! document newer than this build is refused rather than misread.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration v{from}→v{to} failed: {reason}")]
    Failed { from: u32, to: u32, reason: String },
    #[error("no migration path from v{0} to v{1}")]
    NoPath(u32, u32),
    #[error("snapshot version {0} is newer than supported ({1})")]
    TooNew(u32, u32),
}

/// Rewrites a document from version `from` to `from + 1` in place.
pub type MigrateFn = fn(&mut Value) -> Result<(), String>;

/// Ordered set of single-version upgrade steps.
#[derive(Default)]
pub struct MigrationRegistry {
    steps: Vec<(u32, MigrateFn)>,
}

impl MigrationRegistry {
    /// Registry with every upgrade this build knows about.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the upgrade from `from` to `from + 1`.
    pub fn with_step(mut self, from: u32, step: MigrateFn) -> Self {
        self.steps.push((from, step));
        self
    }

    /// Version recorded in a document. Documents without one are v1.
    pub fn version_of(doc: &Value) -> u32 {
        doc.get("v")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(1)
    }

    pub fn migrate_to(&self, mut doc: Value, target: u32) -> Result<Value, MigrationError> {
        let mut version = Self::version_of(&doc);
        if version > target {
            return Err(MigrationError::TooNew(version, target));
        }

        while version < target {
            let (_, step) = self
                .steps
                .iter()
                .find(|(from, _)| *from == version)
                .ok_or(MigrationError::NoPath(version, target))?;
            step(&mut doc).map_err(|reason| MigrationError::Failed {
                from: version,
                to: version + 1,
                reason,
            })?;
            version += 1;
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("v".into(), version.into());
            }
            tracing::info!(version, "migrated snapshot");
        }
        Ok(doc)
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
