// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{ConfigError, GraphError, PipelineError, StoreError};
use thiserror::Error;

/// Errors raised while opening a workspace or loading its pipelines.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// No workspace entry carries this name.
    #[error("no pipeline named '{0}' in the workspace")]
    UnknownPipeline(String),

    /// A lone pipeline was requested from a workspace holding several.
    #[error("workspace '{0}' holds several pipelines, name one")]
    Ambiguous(String),

    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hard stops raised by the workspace scheduler before any unit runs.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// One or more candidates could not be resolved to a loadable pipeline.
    #[error("pipelines are unresolved: {}", .0.join(", "))]
    Unresolved(Vec<String>),

    /// The candidate graph is cyclic or has unmet needs.
    #[error("invalid dependency graph: {}", format_graph_errors(.0))]
    Graph(Vec<GraphError>),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Workspace working directory could not be prepared.
    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by source control operations during sync.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{operation} failed in {path}: {message}")]
    Command {
        operation: &'static str,
        path: String,
        message: String,
    },

    #[error("could not clone '{name}' from any organization")]
    CloneFailed { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("sync I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_graph_errors(errors: &[GraphError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
