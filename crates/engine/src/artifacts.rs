// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact collection for completed (or paused) runs

use serde::{Deserialize, Serialize};
use wp_core::{Artifact, RunId};
use wp_storage::RunState;

/// Artifacts of a run, split by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    pub run_id: RunId,
    pub outputs: Vec<Artifact>,
    pub warnings: Vec<Artifact>,
}

impl ArtifactManifest {
    pub fn len(&self) -> usize {
        self.outputs.len() + self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only view over the artifacts a run has accumulated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactCollector;

impl ArtifactCollector {
    /// Every artifact in commit order. Never fails; a run with no artifacts
    /// yields an empty list.
    pub fn collect(state: &RunState) -> Vec<Artifact> {
        state.artifacts.clone()
    }

    pub fn manifest(state: &RunState) -> ArtifactManifest {
        let (warnings, outputs): (Vec<_>, Vec<_>) =
            state.artifacts.iter().cloned().partition(Artifact::is_warning);
        ArtifactManifest {
            run_id: state.run_id.clone(),
            outputs,
            warnings,
        }
    }
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
