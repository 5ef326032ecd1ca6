// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Structural defects in a workspace dependency graph.
///
/// These are static: they are evaluated before any pipeline runs and are
/// never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// A circular dependency was detected between pipelines
    CyclicDependency {
        /// The cycle path, first node repeated at the end
        cycle: Vec<String>,
    },
    /// A pipeline needs another that is neither scheduled nor already completed
    UnmetDependency {
        /// The pipeline declaring the need
        pipeline: String,
        /// The need that cannot be satisfied
        missing: String,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::CyclicDependency { cycle } => {
                write!(f, "Workspace contains a circular dependency: {}", cycle.join(" -> "))
            }
            GraphError::UnmetDependency { pipeline, missing } => {
                write!(f, "Unmet dependency: [{}] needs [{}]", pipeline, missing)
            }
        }
    }
}

impl std::error::Error for GraphError {}
