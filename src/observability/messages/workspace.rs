// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for workspace resolution, scheduling and sync.

use crate::actions::ResultCode;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Scheduling of a set of candidates is about to begin.
///
/// # Log Level
/// `info!`
///
/// # Example
/// ```
/// use the_conveyor::observability::messages::workspace::SchedulingStarted;
///
/// let msg = SchedulingStarted { parallel_jobs: 2, candidates: 5 };
/// assert_eq!(msg.to_string(), "Scheduling 5 pipelines on 2 parallel jobs");
/// ```
pub struct SchedulingStarted {
    pub parallel_jobs: usize,
    pub candidates: usize,
}

impl Display for SchedulingStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduling {} pipelines on {} parallel jobs",
            self.candidates, self.parallel_jobs
        )
    }
}

impl StructuredLog for SchedulingStarted {
    fn log(&self) {
        tracing::info!(
            parallel_jobs = self.parallel_jobs,
            candidates = self.candidates,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "workspace_schedule",
            span_name = name,
            parallel_jobs = self.parallel_jobs,
            candidates = self.candidates,
        )
    }
}

/// A scheduled unit finished, successfully or not.
pub struct UnitFinished<'a> {
    pub pipeline: &'a str,
    pub result_code: ResultCode,
}

impl Display for UnitFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Finished with [{}]", self.pipeline, self.result_code)
    }
}

impl StructuredLog for UnitFinished<'_> {
    fn log(&self) {
        if self.result_code.is_success_like() {
            tracing::info!(pipeline = self.pipeline, result_code = %self.result_code, "{}", self);
        } else {
            tracing::error!(pipeline = self.pipeline, result_code = %self.result_code, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("unit_finished", span_name = name, pipeline = self.pipeline)
    }
}

/// One attempt of a retried operation failed.
///
/// # Log Level
/// `warn!` while attempts remain, `error!` on the last one
pub struct AttemptFailed<'a> {
    pub label: &'a str,
    pub attempt: u32,
    pub attempts: u32,
    pub error: &'a str,
}

impl Display for AttemptFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Attempt {}/{} failed: {}",
            self.label, self.attempt, self.attempts, self.error
        )
    }
}

impl StructuredLog for AttemptFailed<'_> {
    fn log(&self) {
        if self.attempt < self.attempts {
            tracing::warn!(label = self.label, attempt = self.attempt, "{}", self);
        } else {
            tracing::error!(label = self.label, attempt = self.attempt, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("attempt_failed", span_name = name, label = self.label)
    }
}

/// Summary of a scheduled run.
pub struct SchedulingFinished<'a> {
    pub completed: usize,
    pub failed: &'a [String],
    pub not_run: &'a [String],
}

impl Display for SchedulingFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} pipelines completed", self.completed)?;
        if !self.failed.is_empty() {
            write!(f, ", failed: [{}]", self.failed.join(", "))?;
        }
        if !self.not_run.is_empty() {
            write!(f, ", not run: [{}]", self.not_run.join(", "))?;
        }
        Ok(())
    }
}

impl StructuredLog for SchedulingFinished<'_> {
    fn log(&self) {
        if self.failed.is_empty() {
            tracing::info!(completed = self.completed, "{}", self);
        } else {
            tracing::error!(
                completed = self.completed,
                failed = self.failed.len(),
                not_run = self.not_run.len(),
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("scheduling_finished", span_name = name)
    }
}

/// A source control step failed for one workspace entry during sync.
pub struct SyncFailed<'a> {
    pub pipeline: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for SyncFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Sync failed: {}", self.pipeline, self.error)
    }
}

impl StructuredLog for SyncFailed<'_> {
    fn log(&self) {
        tracing::error!(pipeline = self.pipeline, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("sync_failed", span_name = name, pipeline = self.pipeline)
    }
}
