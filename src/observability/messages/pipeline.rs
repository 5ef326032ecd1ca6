// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline execution and step pointer movement.

use crate::actions::ResultCode;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// A pipeline run is starting from a given step.
///
/// # Log Level
/// `info!`
///
/// # Example
/// ```
/// use the_conveyor::observability::messages::pipeline::PipelineStarted;
///
/// let msg = PipelineStarted { pipeline: "lib", step: 1, total_steps: 4 };
/// assert_eq!(msg.to_string(), "[lib] Running pipeline from step 2 of 4");
/// ```
pub struct PipelineStarted<'a> {
    pub pipeline: &'a str,
    pub step: usize,
    pub total_steps: usize,
}

impl Display for PipelineStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Running pipeline from step {} of {}",
            self.pipeline,
            self.step + 1,
            self.total_steps
        )
    }
}

impl StructuredLog for PipelineStarted<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            step = self.step,
            total_steps = self.total_steps,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_run",
            span_name = name,
            pipeline = self.pipeline,
            step = self.step,
            total_steps = self.total_steps,
        )
    }
}

/// One action of a pipeline is being dispatched to a backend.
pub struct ActionStarted<'a> {
    pub pipeline: &'a str,
    pub action: &'a str,
    pub backend: &'a str,
}

impl Display for ActionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Running action [{}] on backend [{}]",
            self.pipeline, self.action, self.backend
        )
    }
}

impl StructuredLog for ActionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            action = self.action,
            backend = self.backend,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_action",
            span_name = name,
            pipeline = self.pipeline,
            action = self.action,
            backend = self.backend,
        )
    }
}

/// A disabled-step filter suppressed an action call.
pub struct StepSkipped<'a> {
    pub pipeline: &'a str,
    pub action: &'a str,
    pub backend: &'a str,
    pub command: &'a str,
}

impl Display for StepSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Skipping disabled step [{}] on backend [{}] for [{}]",
            self.pipeline, self.action, self.backend, self.command
        )
    }
}

impl StructuredLog for StepSkipped<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            action = self.action,
            backend = self.backend,
            command = self.command,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "step_skipped",
            span_name = name,
            pipeline = self.pipeline,
            action = self.action,
        )
    }
}

/// The step pointer moved.
///
/// # Log Level
/// `debug!` - emitted on every advance and retreat
pub struct StepMoved<'a> {
    pub pipeline: &'a str,
    pub from: usize,
    pub to: usize,
}

impl Display for StepMoved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Step {} -> {}", self.pipeline, self.from, self.to)
    }
}

impl StructuredLog for StepMoved<'_> {
    fn log(&self) {
        tracing::debug!(pipeline = self.pipeline, from = self.from, to = self.to, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("step_moved", span_name = name, pipeline = self.pipeline)
    }
}

/// A pipeline operation finished.
pub struct PipelineFinished<'a> {
    pub pipeline: &'a str,
    pub operation: &'a str,
    pub result_code: ResultCode,
}

impl Display for PipelineFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Finished {} with [{}]",
            self.pipeline, self.operation, self.result_code
        )
    }
}

impl StructuredLog for PipelineFinished<'_> {
    fn log(&self) {
        match self.result_code {
            ResultCode::Success => tracing::info!(
                pipeline = self.pipeline,
                operation = self.operation,
                result_code = %self.result_code,
                "{}", self
            ),
            _ => tracing::warn!(
                pipeline = self.pipeline,
                operation = self.operation,
                result_code = %self.result_code,
                "{}", self
            ),
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_finished",
            span_name = name,
            pipeline = self.pipeline,
            operation = self.operation,
        )
    }
}

/// The working directory was removed by a clean.
pub struct WorkingDirRemoved<'a> {
    pub pipeline: &'a str,
    pub path: &'a Path,
}

impl Display for WorkingDirRemoved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Removed working directory {}",
            self.pipeline,
            self.path.display()
        )
    }
}
