// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::actions::Surrounding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Read-only facts about the workspace every backend call can see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkspaceContext {
    pub name: String,
    /// Base URL of the source control host, e.g. `https://git.example.com`
    pub scm: Option<String>,
    pub organizations: Vec<String>,
    pub source_dir: PathBuf,
    pub working_dir: PathBuf,
    pub surrounding: Surrounding,
    /// True when the workspace wraps a single pipeline without a workspace file
    pub singular: bool,
    pub backend_settings: BTreeMap<String, Value>,
}

impl WorkspaceContext {
    pub fn new(
        name: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
        surrounding: Surrounding,
    ) -> Self {
        Self {
            name: name.into(),
            scm: None,
            organizations: Vec::new(),
            source_dir: source_dir.into(),
            working_dir: working_dir.into(),
            surrounding,
            singular: false,
            backend_settings: BTreeMap::new(),
        }
    }

    pub fn backend_settings(&self, backend: &str) -> Option<&Value> {
        self.backend_settings.get(backend)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceStats {
    pub init_time: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub pipelines_executed: u64,
}

impl Default for WorkspaceStats {
    fn default() -> Self {
        Self {
            init_time: Utc::now(),
            last_run: None,
            pipelines_executed: 0,
        }
    }
}
