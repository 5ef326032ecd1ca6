// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency-ordered execution of pipelines across a workspace.
//!
//! Every candidate becomes one unit of work. A unit is submitted once all
//! of its needs have completed; at most `parallel_jobs` units run at once.
//! When a unit fails, no further units are submitted, but units already in
//! flight run to completion before the report is built.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::actions::ResultCode;
use crate::backends::BackendRegistry;
use crate::config::consts::default_parallelism;
use crate::errors::{PipelineError, SchedulerError};
use crate::observability::messages::workspace::{SchedulingFinished, SchedulingStarted, UnitFinished};
use crate::observability::messages::StructuredLog;
use crate::pipeline::Pipeline;
use crate::workspace::graph::validate_schedule;
use crate::workspace::retry::RetryPolicy;
use crate::workspace::selection::select_candidates;
use crate::workspace::state::PipelineStatus;
use crate::workspace::{SharedPipeline, Workspace, WorkspacePipeline};

/// What a scheduled unit does to its pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    Execute { reset_cache: bool },
    ExecuteAction { action: String },
    Clean { reset_cache: bool, rm_working_dir: bool },
    CleanAction { action: String },
}

impl UnitKind {
    pub async fn apply(&self, pipeline: &mut Pipeline, registry: &BackendRegistry) -> Result<ResultCode, PipelineError> {
        match self {
            UnitKind::Execute { reset_cache } => pipeline.run(registry, *reset_cache).await,
            UnitKind::ExecuteAction { action } => pipeline.execute_action(registry, action).await,
            UnitKind::Clean {
                reset_cache,
                rm_working_dir,
            } => pipeline.clean(registry, *reset_cache, *rm_working_dir).await,
            UnitKind::CleanAction { action } => pipeline.clean_action(registry, action).await,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            UnitKind::Execute { .. } => "execute",
            UnitKind::ExecuteAction { .. } => "execute-action",
            UnitKind::Clean { .. } => "clean",
            UnitKind::CleanAction { .. } => "clean-action",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    /// Pipeline names or group paths; empty selects everything
    pub filters: Vec<String>,
    pub parallel_jobs: usize,
    pub retry: RetryPolicy,
    /// Also select the needs of selected entries, transitively
    pub recursive: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            parallel_jobs: default_parallelism(),
            retry: RetryPolicy::scheduler_default(),
            recursive: false,
        }
    }
}

/// Outcome of a scheduled run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleReport {
    pub result: ResultCode,
    /// In completion order
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub not_run: Vec<String>,
}

impl Workspace {
    pub async fn execute_pipelines(
        &self,
        reset_cache: bool,
        options: &ScheduleOptions,
    ) -> Result<ScheduleReport, SchedulerError> {
        self.schedule(UnitKind::Execute { reset_cache }, options).await
    }

    pub async fn execute_pipelines_action(
        &self,
        action: &str,
        options: &ScheduleOptions,
    ) -> Result<ScheduleReport, SchedulerError> {
        self.schedule(UnitKind::ExecuteAction { action: action.to_string() }, options)
            .await
    }

    pub async fn clean_pipelines(
        &self,
        reset_cache: bool,
        rm_working_dir: bool,
        options: &ScheduleOptions,
    ) -> Result<ScheduleReport, SchedulerError> {
        self.schedule(
            UnitKind::Clean {
                reset_cache,
                rm_working_dir,
            },
            options,
        )
        .await
    }

    pub async fn clean_pipelines_action(
        &self,
        action: &str,
        options: &ScheduleOptions,
    ) -> Result<ScheduleReport, SchedulerError> {
        self.schedule(UnitKind::CleanAction { action: action.to_string() }, options)
            .await
    }

    /// Run `unit` over the selected candidates in dependency order.
    ///
    /// Unresolved candidates, cycles and unmet needs are rejected before
    /// anything runs.
    pub async fn schedule(&self, unit: UnitKind, options: &ScheduleOptions) -> Result<ScheduleReport, SchedulerError> {
        let parallel_jobs = options.parallel_jobs.max(1);
        let state = self.resolve(true, parallel_jobs).await;
        let candidates = select_candidates(&self.groups, &options.filters, options.recursive);

        let instances = self.pipelines.lock().await.clone();
        let unresolved: Vec<String> = candidates
            .iter()
            .filter(|c| {
                state.status_of(&c.name) == Some(PipelineStatus::Unresolved)
                    || !instances.contains_key(&c.name)
            })
            .map(|c| c.name.clone())
            .collect();
        if !unresolved.is_empty() {
            return Err(SchedulerError::Unresolved(unresolved));
        }

        let candidate_names: BTreeSet<String> = candidates.iter().map(|c| c.name.clone()).collect();
        let mut completed: BTreeSet<String> = state
            .names(PipelineStatus::Completed)
            .difference(&candidate_names)
            .cloned()
            .collect();
        validate_schedule(&candidates, &completed).map_err(SchedulerError::Graph)?;

        std::fs::create_dir_all(&self.context.working_dir)?;
        SchedulingStarted {
            parallel_jobs,
            candidates: candidates.len(),
        }
        .log();

        let semaphore = Arc::new(Semaphore::new(parallel_jobs));
        let mut pending: Vec<WorkspacePipeline> = candidates;
        let mut in_flight: JoinSet<(String, ResultCode)> = JoinSet::new();
        let mut task_names: HashMap<tokio::task::Id, String> = HashMap::new();
        let mut finished = Vec::new();
        let mut failed = Vec::new();

        loop {
            if failed.is_empty() {
                let (ready, waiting): (Vec<_>, Vec<_>) = pending
                    .into_iter()
                    .partition(|c| c.needs.iter().all(|need| completed.contains(need)));
                pending = waiting;
                for entry in ready {
                    let Some(pipeline) = instances.get(&entry.name).cloned() else {
                        failed.push(entry.name);
                        continue;
                    };
                    let handle = in_flight.spawn(run_unit(
                        entry.name.clone(),
                        pipeline,
                        self.registry.clone(),
                        unit.clone(),
                        options.retry.clone(),
                        semaphore.clone(),
                    ));
                    task_names.insert(handle.id(), entry.name);
                }
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };
            match joined {
                Ok((id, (name, code))) => {
                    task_names.remove(&id);
                    UnitFinished {
                        pipeline: &name,
                        result_code: code,
                    }
                    .log();
                    if code.is_success_like() {
                        completed.insert(name.clone());
                        finished.push(name);
                    } else {
                        failed.push(name);
                    }
                }
                Err(error) => {
                    let name = lost_unit_name(&mut task_names, &error);
                    tracing::error!(pipeline = %name, %error, "Scheduled unit was lost");
                    failed.push(name);
                }
            }
        }

        let not_run: Vec<String> = pending.into_iter().map(|c| c.name).collect();
        SchedulingFinished {
            completed: finished.len(),
            failed: &failed,
            not_run: &not_run,
        }
        .log();
        if matches!(unit, UnitKind::Execute { .. } | UnitKind::ExecuteAction { .. }) {
            if let Err(error) = self.record_run(finished.len()) {
                tracing::warn!(%error, "Could not record workspace stats");
            }
        }

        Ok(ScheduleReport {
            result: if failed.is_empty() {
                ResultCode::Success
            } else {
                ResultCode::Failure
            },
            completed: finished,
            failed,
            not_run,
        })
    }
}

/// Name of the pipeline whose unit task ended in `error`.
fn lost_unit_name(task_names: &mut HashMap<tokio::task::Id, String>, error: &tokio::task::JoinError) -> String {
    task_names
        .remove(&error.id())
        .unwrap_or_else(|| "unknown".to_string())
}

/// One unit with retries. Every attempt runs in its own task so a panic
/// counts as a failed attempt.
async fn run_unit(
    name: String,
    pipeline: SharedPipeline,
    registry: Arc<BackendRegistry>,
    unit: UnitKind,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
) -> (String, ResultCode) {
    let _permit = semaphore.acquire_owned().await.ok();
    let label = format!("{} {}", unit.verb(), name);
    let outcome = retry
        .run(&label, |_| {
            let pipeline = pipeline.clone();
            let registry = registry.clone();
            let unit = unit.clone();
            async move {
                let attempt = tokio::spawn(async move {
                    let mut pipeline = pipeline.lock().await;
                    unit.apply(&mut pipeline, &registry).await
                });
                match attempt.await {
                    Ok(Ok(code)) => Ok(code),
                    Ok(Err(error)) => Err(error.to_string()),
                    Err(error) => Err(error.to_string()),
                }
            }
        })
        .await;
    (name, outcome.unwrap_or(ResultCode::Failure))
}
