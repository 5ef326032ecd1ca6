// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::DEFAULT_HEAD;
use serde::{Deserialize, Serialize};

/// One pipeline as declared in a workspace definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePipeline {
    pub name: String,
    /// Group path relative to the workspace source dir, empty for the root group
    pub path: String,
    pub needs: Vec<String>,
    pub head: String,
    pub executable: bool,
    pub external: bool,
}

impl WorkspacePipeline {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            needs: Vec::new(),
            head: DEFAULT_HEAD.to_string(),
            executable: true,
            external: false,
        }
    }

    pub fn needing(mut self, needs: &[&str]) -> Self {
        self.needs = needs.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Runs under the scheduler: executable and not owned elsewhere.
    pub fn is_schedulable(&self) -> bool {
        self.executable && !self.external
    }
}
