// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::actions::Surrounding;
use crate::config::consts::DEFAULT_BUILD_NUMBER;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Read-only facts about one pipeline, handed to every backend call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineContext {
    pub name: String,
    pub scm: Vec<String>,
    pub version: Option<String>,
    pub build_number: String,
    pub maintainers: Vec<String>,
    /// Branch declared by the definition, if any
    pub head: Option<String>,
    pub source_dir: PathBuf,
    pub working_dir: PathBuf,
    pub surrounding: Surrounding,
    pub user: String,
    /// Per-backend settings blocks, keyed by backend name
    pub backend_settings: BTreeMap<String, Value>,
}

impl PipelineContext {
    pub fn new(
        name: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
        surrounding: Surrounding,
    ) -> Self {
        Self {
            name: name.into(),
            scm: Vec::new(),
            version: None,
            build_number: DEFAULT_BUILD_NUMBER.to_string(),
            maintainers: Vec::new(),
            head: None,
            source_dir: source_dir.into(),
            working_dir: working_dir.into(),
            surrounding,
            user: String::new(),
            backend_settings: BTreeMap::new(),
        }
    }

    pub fn backend_settings(&self, backend: &str) -> Option<&Value> {
        self.backend_settings.get(backend)
    }

    /// Store prefix for this pipeline's step state.
    pub fn store_prefix(&self) -> String {
        format!("{}.pipeline", self.name)
    }
}

/// Timing and counters persisted alongside the step pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub actions_executed: u64,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            actions_executed: 0,
        }
    }
}
