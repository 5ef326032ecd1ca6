// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::workspace::WorkspacePipeline;

/// The bucket a workspace entry resolves into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStatus {
    /// Directory or definition missing
    Unresolved,
    /// Wrong branch or behind/ahead of upstream, executable
    Unsynced,
    /// Wrong branch or behind/ahead of upstream, not executable
    ReadOnly,
    /// Ready to run
    Synced,
    Completed,
    Failed,
}

/// Facts gathered about one loadable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub head_matches: bool,
    pub in_sync: bool,
    pub completed: bool,
    pub failed: bool,
}

/// Bucket for an entry whose pipeline could be loaded.
pub fn classify(executable: bool, probe: Probe) -> PipelineStatus {
    if !probe.head_matches || !probe.in_sync {
        if probe.completed {
            PipelineStatus::Completed
        } else if !executable {
            PipelineStatus::ReadOnly
        } else {
            PipelineStatus::Unsynced
        }
    } else if probe.completed {
        PipelineStatus::Completed
    } else if probe.failed {
        PipelineStatus::Failed
    } else {
        PipelineStatus::Synced
    }
}

/// Resolved entries, bucketed by status and then by group path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkspaceState {
    buckets: BTreeMap<PipelineStatus, BTreeMap<String, Vec<WorkspacePipeline>>>,
}

impl WorkspaceState {
    pub fn insert(&mut self, status: PipelineStatus, entry: WorkspacePipeline) {
        self.buckets
            .entry(status)
            .or_default()
            .entry(entry.path.clone())
            .or_default()
            .push(entry);
    }

    pub fn entries(&self, status: PipelineStatus) -> impl Iterator<Item = &WorkspacePipeline> {
        self.buckets
            .get(&status)
            .into_iter()
            .flat_map(|groups| groups.values().flatten())
    }

    pub fn names(&self, status: PipelineStatus) -> BTreeSet<String> {
        self.entries(status).map(|e| e.name.clone()).collect()
    }

    pub fn status_of(&self, name: &str) -> Option<PipelineStatus> {
        self.buckets.iter().find_map(|(status, groups)| {
            groups
                .values()
                .flatten()
                .any(|e| e.name == name)
                .then_some(*status)
        })
    }

    pub fn count(&self, status: PipelineStatus) -> usize {
        self.entries(status).count()
    }
}
