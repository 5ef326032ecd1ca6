// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for backend lifecycle and action dispatch.

use crate::actions::{ActionResult, ActionType};
use crate::errors::ActionPhase;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A backend is being constructed and initialized.
///
/// # Log Level
/// `info!` - happens once per backend per process
///
/// # Example
/// ```
/// use the_conveyor::observability::messages::backend::BackendInitializing;
///
/// let msg = BackendInitializing { backend: "command" };
/// assert_eq!(msg.to_string(), "Initializing backend [command]");
/// ```
pub struct BackendInitializing<'a> {
    pub backend: &'a str,
}

impl Display for BackendInitializing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Initializing backend [{}]", self.backend)
    }
}

impl StructuredLog for BackendInitializing<'_> {
    fn log(&self) {
        tracing::info!(backend = self.backend, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("backend_initializing", span_name = name, backend = self.backend)
    }
}

/// A backend hook (initialize, authenticate, cleanup) returned an error.
///
/// # Log Level
/// `error!`
pub struct BackendHookFailed<'a> {
    pub backend: &'a str,
    pub operation: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for BackendHookFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Backend [{}] failed during {}: {}",
            self.backend, self.operation, self.error
        )
    }
}

impl StructuredLog for BackendHookFailed<'_> {
    fn log(&self) {
        tracing::error!(
            backend = self.backend,
            operation = self.operation,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "backend_hook_failed",
            span_name = name,
            backend = self.backend,
            operation = self.operation,
        )
    }
}

/// An action implementation raised an error instead of returning a result.
///
/// # Log Level
/// `error!` for prepare and execute, `warn!` for cleanup
pub struct ActionRaised<'a> {
    pub pipeline: &'a str,
    pub backend: &'a str,
    pub action_type: ActionType,
    pub phase: ActionPhase,
    pub error: &'a dyn std::error::Error,
}

impl Display for ActionRaised<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Error occurred while running {} of action [{}] from backend [{}] - [{}]",
            self.pipeline, self.phase, self.action_type, self.backend, self.error
        )
    }
}

impl StructuredLog for ActionRaised<'_> {
    fn log(&self) {
        match self.phase {
            ActionPhase::Cleanup => tracing::warn!(
                pipeline = self.pipeline,
                backend = self.backend,
                action = %self.action_type,
                phase = %self.phase,
                "{}", self
            ),
            _ => tracing::error!(
                pipeline = self.pipeline,
                backend = self.backend,
                action = %self.action_type,
                phase = %self.phase,
                "{}", self
            ),
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "action_raised",
            span_name = name,
            pipeline = self.pipeline,
            backend = self.backend,
            action = %self.action_type,
        )
    }
}

/// A backend reported FAILURE for an action; the detail lines are included.
pub struct ActionFailed<'a> {
    pub pipeline: &'a str,
    pub backend: &'a str,
    pub result: &'a ActionResult,
}

impl Display for ActionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let action = self
            .result
            .action_type
            .map(|t| t.as_str())
            .unwrap_or("unknown");
        write!(
            f,
            "[{}] Failed running action [{}] on backend [{}] with [{}]",
            self.pipeline, action, self.backend, self.result.result_code
        )?;
        for line in &self.result.result {
            match line {
                serde_json::Value::String(s) => write!(f, "\n[{}] {}", self.pipeline, s)?,
                other => write!(f, "\n[{}] {}", self.pipeline, other)?,
            }
        }
        Ok(())
    }
}

impl StructuredLog for ActionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            pipeline = self.pipeline,
            backend = self.backend,
            result_code = %self.result.result_code,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "action_failed",
            span_name = name,
            pipeline = self.pipeline,
            backend = self.backend,
        )
    }
}

/// The backend does not declare the requested action type.
pub struct ActionNotSupported<'a> {
    pub pipeline: &'a str,
    pub backend: &'a str,
    pub action_type: ActionType,
}

impl Display for ActionNotSupported<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Backend [{}] does not support action [{}]",
            self.pipeline, self.backend, self.action_type
        )
    }
}

impl StructuredLog for ActionNotSupported<'_> {
    fn log(&self) {
        tracing::warn!(
            pipeline = self.pipeline,
            backend = self.backend,
            action = %self.action_type,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "action_not_supported",
            span_name = name,
            pipeline = self.pipeline,
            backend = self.backend,
        )
    }
}
