// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::actions::ActionType;
use crate::errors::StoreError;
use std::fmt;
use thiserror::Error;

/// Lifecycle phase of a dispatched action call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Prepare,
    Execute,
    Cleanup,
}

impl fmt::Display for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionPhase::Prepare => write!(f, "prepare"),
            ActionPhase::Execute => write!(f, "execute"),
            ActionPhase::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Errors crossing the backend registry boundary.
///
/// Anything an action or backend implementation returns is wrapped here with
/// the backend and action it came from, never dropped on the floor.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No factory is registered under this backend name.
    #[error("no backend registered under '{0}'")]
    UnknownBackend(String),

    /// The backend exists but was never initialized.
    #[error("backend '{0}' is not initialized")]
    NotInitialized(String),

    /// The backend's own initialize/cleanup/authenticate hook failed.
    #[error("backend '{backend}' failed during {operation}: {source}")]
    Backend {
        backend: String,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// An action implementation returned an error.
    #[error("action [{action_type}] on backend '{backend}' failed during {phase}: {source}")]
    Action {
        backend: String,
        action_type: ActionType,
        phase: ActionPhase,
        #[source]
        source: anyhow::Error,
    },

    /// A requested attribute was never set.
    #[error("attribute '{key}' not found for backend '{backend}'")]
    MissingAttribute { backend: String, key: String },

    /// Persisting attributes failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
