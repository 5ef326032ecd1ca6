// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use tracing::Instrument;

use crate::actions::{PipelineAction, ResultCode, Surrounding};
use crate::backends::{BackendFactory, BackendRegistry};
use crate::config::consts::STORE_DIR;
use crate::config::loader;
use crate::errors::{PipelineError, StoreError};
use crate::observability::messages::backend::{ActionFailed, BackendHookFailed};
use crate::observability::messages::pipeline::{
    ActionStarted, PipelineFinished, PipelineStarted, StepSkipped, WorkingDirRemoved,
};
use crate::observability::messages::StructuredLog;
use crate::pipeline::{DisabledStep, PipelineContext, PipelineState, PipelineStats};

/// Which operation is consulting the disabled-step filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCommand {
    Execute,
    ExecuteAction,
    ExecuteStep,
    Clean,
    CleanAction,
    CleanStep,
}

impl FilterCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterCommand::Execute => "execute",
            FilterCommand::ExecuteAction => "execute-action",
            FilterCommand::ExecuteStep => "execute-step",
            FilterCommand::Clean => "clean",
            FilterCommand::CleanAction => "clean-action",
            FilterCommand::CleanStep => "clean-step",
        }
    }
}

/// Serializable snapshot of a pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineDescription {
    pub context: PipelineContext,
    pub actions: Vec<PipelineAction>,
    pub step: usize,
    pub dirty: bool,
    pub completed: bool,
    pub disabled_steps: Vec<DisabledStep>,
    pub stats: Option<PipelineStats>,
}

/// An ordered list of actions plus the persisted state walking them.
///
/// Actions run strictly in declaration order. A FAILURE from any backend
/// stops the walk, marks the pipeline failed and leaves the step pointer on
/// the failed action, so the next run resumes there.
pub struct Pipeline {
    context: PipelineContext,
    actions: Vec<PipelineAction>,
    state: PipelineState,
    initialized: bool,
}

impl Pipeline {
    pub fn new(context: PipelineContext, actions: Vec<PipelineAction>) -> Result<Self, PipelineError> {
        let state = PipelineState::load(&context, &actions)?;
        Ok(Self {
            context,
            actions,
            state,
            initialized: false,
        })
    }

    /// Load the pipeline defined in `source_dir`.
    pub fn load(
        source_dir: &Path,
        working_dir: Option<&Path>,
        surrounding: Surrounding,
        factory: &BackendFactory,
    ) -> Result<Self, PipelineError> {
        let definition = loader::load_pipeline_definition(source_dir)?;
        let (context, actions) = definition.resolve(source_dir, working_dir, surrounding, factory)?;
        Self::new(context, actions)
    }

    pub fn name(&self) -> &str {
        &self.context.name
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn actions(&self) -> &[PipelineAction] {
        &self.actions
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Every action has run.
    pub fn is_completed(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_failed(&self) -> bool {
        self.state.is_dirty()
    }

    /// Initialize the backends of every action that runs here. Idempotent.
    pub async fn initialize(&mut self, registry: &BackendRegistry) -> Result<(), PipelineError> {
        if self.initialized {
            return Ok(());
        }
        registry
            .initialize_pipeline_backends(&self.actions, self.context.surrounding)
            .await?;
        self.initialized = true;
        Ok(())
    }

    fn prepare_working_dir(&self) -> Result<(), PipelineError> {
        let cache = self.context.working_dir.join(STORE_DIR);
        std::fs::create_dir_all(&cache).map_err(|source| PipelineError::Io {
            pipeline: self.context.name.clone(),
            path: cache,
            source,
        })
    }

    fn load_stats(&self) -> Result<PipelineStats, StoreError> {
        Ok(self.state.stats()?.unwrap_or_default())
    }

    fn skip_disabled(&self, action: &PipelineAction, backend: &str, filter: FilterCommand) -> bool {
        let command = Some(filter.as_str());
        let disabled = self
            .state
            .is_disabled(action.action_type.as_str(), Some(backend), command)
            || action
                .action_name
                .as_deref()
                .is_some_and(|name| self.state.is_disabled(name, Some(backend), command));
        if disabled {
            StepSkipped {
                pipeline: &self.context.name,
                action: &action.label(),
                backend,
                command: filter.as_str(),
            }
            .log();
        }
        disabled
    }

    /// Initialize, prepare and execute one action on one backend.
    async fn execute_backend(
        &self,
        registry: &BackendRegistry,
        backend: &str,
        action: &PipelineAction,
    ) -> ResultCode {
        let name = self.context.name.as_str();
        ActionStarted {
            pipeline: name,
            action: &action.label(),
            backend,
        }
        .log();

        if let Err(error) = registry.initialize(backend).await {
            BackendHookFailed {
                backend,
                operation: "initialize",
                error: &error,
            }
            .log();
            return ResultCode::Failure;
        }

        match registry.initialize_action(backend, action, &self.context).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(
                    pipeline = name,
                    backend,
                    action = %action.action_type,
                    "[{}] Could not prepare action [{}] on backend [{}]",
                    name,
                    action.label(),
                    backend
                );
                return ResultCode::Failure;
            }
            Err(_) => return ResultCode::Failure,
        }

        match registry.execute_action(backend, action, &self.context).await {
            Ok(result) => {
                match result.result_code {
                    ResultCode::Success => {}
                    ResultCode::PartialSuccess => tracing::warn!(
                        pipeline = name,
                        backend,
                        action = %action.action_type,
                        details = ?result.result,
                        "[{}] Action [{}] partially succeeded",
                        name,
                        action.label()
                    ),
                    _ => ActionFailed {
                        pipeline: name,
                        backend,
                        result: &result,
                    }
                    .log(),
                }
                result.result_code
            }
            Err(_) => ResultCode::Failure,
        }
    }

    /// Initialize, prepare and clean up one action on one backend. Errors are logged.
    async fn clean_backend(&self, registry: &BackendRegistry, backend: &str, action: &PipelineAction) {
        if let Err(error) = registry.initialize(backend).await {
            BackendHookFailed {
                backend,
                operation: "initialize",
                error: &error,
            }
            .log();
            return;
        }
        if let Ok(true) = registry.initialize_action(backend, action, &self.context).await {
            // Failures are logged by the registry; cleanup keeps walking.
            let _ = registry.cleanup_action(backend, action, &self.context).await;
        }
    }

    /// Mark failed, record stats and persist.
    fn fail(&mut self, stats: &mut PipelineStats, operation: &str) -> Result<ResultCode, PipelineError> {
        self.state.mark_dirty();
        stats.end_time = Some(Utc::now());
        self.state.set_stats(stats)?;
        self.state.flush()?;
        PipelineFinished {
            pipeline: &self.context.name,
            operation,
            result_code: ResultCode::Failure,
        }
        .log();
        Ok(ResultCode::Failure)
    }

    fn finish(&mut self, stats: &mut PipelineStats, operation: &str, result: ResultCode) -> Result<ResultCode, PipelineError> {
        stats.end_time = Some(Utc::now());
        self.state.set_stats(stats)?;
        self.state.flush()?;
        PipelineFinished {
            pipeline: &self.context.name,
            operation,
            result_code: result,
        }
        .log();
        Ok(result)
    }

    /// Run every remaining action from the current step.
    pub async fn run(&mut self, registry: &BackendRegistry, reset_cache: bool) -> Result<ResultCode, PipelineError> {
        if reset_cache {
            self.reset()?;
        }
        let span = {
            let started = PipelineStarted {
                pipeline: &self.context.name,
                step: self.state.step(),
                total_steps: self.actions.len(),
            };
            started.log();
            started.span("run")
        };
        self.run_from_current(registry).instrument(span).await
    }

    async fn run_from_current(&mut self, registry: &BackendRegistry) -> Result<ResultCode, PipelineError> {
        self.prepare_working_dir()?;
        let mut stats = self.load_stats()?;
        if let Err(error) = self.initialize(registry).await {
            tracing::error!(pipeline = %self.context.name, %error, "Failed to initialize pipeline");
            return self.fail(&mut stats, "run");
        }

        let mut result = ResultCode::Success;
        while !self.state.is_terminal() {
            let action = self.actions[self.state.step()].clone();
            if !action.runs_in(self.context.surrounding) {
                tracing::debug!(
                    pipeline = %self.context.name,
                    action = %action.label(),
                    "Action does not fit surrounding [{}], ignoring",
                    self.context.surrounding
                );
                self.state.advance()?;
                continue;
            }
            for backend in &action.backends {
                if self.skip_disabled(&action, backend, FilterCommand::Execute) {
                    continue;
                }
                let code = self.execute_backend(registry, backend, &action).await;
                stats.actions_executed += 1;
                match code {
                    ResultCode::Failure => return self.fail(&mut stats, "run"),
                    ResultCode::Success => {}
                    other => result = other,
                }
            }
            self.state.advance()?;
        }
        self.finish(&mut stats, "run", result)
    }

    /// Execute every action matching `type_or_name`, including on-demand ones.
    /// The step pointer does not move.
    pub async fn execute_action(
        &mut self,
        registry: &BackendRegistry,
        type_or_name: &str,
    ) -> Result<ResultCode, PipelineError> {
        self.prepare_working_dir()?;
        let mut stats = self.load_stats()?;
        let mut result = ResultCode::Success;
        let mut matched = false;
        for action in self.actions.clone() {
            if !action.runs_on_demand(self.context.surrounding) || !action.matches(type_or_name) {
                continue;
            }
            matched = true;
            for backend in &action.backends {
                if self.skip_disabled(&action, backend, FilterCommand::ExecuteAction) {
                    continue;
                }
                let code = self.execute_backend(registry, backend, &action).await;
                stats.actions_executed += 1;
                match code {
                    ResultCode::Failure => return self.fail(&mut stats, "execute-action"),
                    ResultCode::Success => {}
                    other => result = other,
                }
            }
        }
        if !matched {
            tracing::warn!(pipeline = %self.context.name, "[{}] No action matches [{}]", self.context.name, type_or_name);
        }
        self.finish(&mut stats, "execute-action", result)
    }

    /// Actions from the current step back to the first, most recent first.
    fn completed_actions_reversed(&self) -> Vec<PipelineAction> {
        if self.actions.is_empty() {
            return Vec::new();
        }
        let last = self.state.step().min(self.actions.len() - 1);
        self.actions[..=last].iter().rev().cloned().collect()
    }

    /// Clean up every action reached so far, in reverse.
    pub async fn clean(
        &mut self,
        registry: &BackendRegistry,
        reset_cache: bool,
        rm_working_dir: bool,
    ) -> Result<ResultCode, PipelineError> {
        if !self.context.working_dir.exists() {
            return Ok(ResultCode::Success);
        }
        for action in self.completed_actions_reversed() {
            if !action.runs_in(self.context.surrounding) {
                continue;
            }
            for backend in &action.backends {
                if self.skip_disabled(&action, backend, FilterCommand::Clean) {
                    continue;
                }
                self.clean_backend(registry, backend, &action).await;
            }
        }
        if rm_working_dir {
            self.remove_working_dir()?;
        }
        if reset_cache {
            self.state.reset()?;
        }
        Ok(ResultCode::Success)
    }

    fn remove_working_dir(&self) -> Result<(), PipelineError> {
        let path = &self.context.working_dir;
        match std::fs::remove_dir_all(path) {
            Ok(()) => {
                tracing::info!("{}", WorkingDirRemoved { pipeline: &self.context.name, path });
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PipelineError::Io {
                pipeline: self.context.name.clone(),
                path: path.clone(),
                source,
            }),
        }
    }

    /// Clean up every reached action matching `type_or_name`, in reverse.
    pub async fn clean_action(
        &mut self,
        registry: &BackendRegistry,
        type_or_name: &str,
    ) -> Result<ResultCode, PipelineError> {
        for action in self.completed_actions_reversed() {
            if !action.runs_on_demand(self.context.surrounding) || !action.matches(type_or_name) {
                continue;
            }
            for backend in &action.backends {
                if self.skip_disabled(&action, backend, FilterCommand::CleanAction) {
                    continue;
                }
                self.clean_backend(registry, backend, &action).await;
            }
        }
        Ok(ResultCode::Success)
    }

    /// Execute the current action without moving the pointer.
    pub async fn step_execute(&mut self, registry: &BackendRegistry) -> Result<ResultCode, PipelineError> {
        self.prepare_working_dir()?;
        let Some(idx) = self.state.current() else {
            tracing::info!(pipeline = %self.context.name, "[{}] No more actions to run", self.context.name);
            return Ok(ResultCode::Success);
        };
        let action = self.actions[idx].clone();
        let mut stats = self.load_stats()?;
        let mut result = ResultCode::Success;
        for backend in &action.backends {
            if self.skip_disabled(&action, backend, FilterCommand::ExecuteStep) {
                continue;
            }
            let code = self.execute_backend(registry, backend, &action).await;
            stats.actions_executed += 1;
            match code {
                ResultCode::Failure => return self.fail(&mut stats, "execute-step"),
                ResultCode::Success => {}
                other => result = other,
            }
        }
        self.finish(&mut stats, "execute-step", result)
    }

    /// Execute the current action and advance when it succeeded.
    pub async fn step_execute_forward(&mut self, registry: &BackendRegistry) -> Result<ResultCode, PipelineError> {
        let result = self.step_execute(registry).await?;
        if result.is_success_like() {
            self.state.advance()?;
        }
        Ok(result)
    }

    /// Clean up the current action without moving the pointer.
    pub async fn step_clean(&mut self, registry: &BackendRegistry) -> Result<ResultCode, PipelineError> {
        let Some(idx) = self.state.current() else {
            return Ok(ResultCode::Success);
        };
        let action = self.actions[idx].clone();
        for backend in &action.backends {
            if self.skip_disabled(&action, backend, FilterCommand::CleanStep) {
                continue;
            }
            self.clean_backend(registry, backend, &action).await;
        }
        Ok(ResultCode::Success)
    }

    /// Clean up the current action, then step back.
    pub async fn step_clean_backward(&mut self, registry: &BackendRegistry) -> Result<ResultCode, PipelineError> {
        let result = self.step_clean(registry).await?;
        self.state.retreat()?;
        Ok(result)
    }

    pub fn step_next(&mut self) -> Result<usize, PipelineError> {
        Ok(self.state.advance()?)
    }

    pub fn step_previous(&mut self) -> Result<usize, PipelineError> {
        Ok(self.state.retreat()?)
    }

    /// The action under the step pointer, if it runs here.
    pub fn current_step(&self) -> Option<(usize, &PipelineAction)> {
        self.state.current().map(|idx| (idx, &self.actions[idx]))
    }

    /// Back to the first action, not failed, store cleared.
    pub fn reset(&mut self) -> Result<(), PipelineError> {
        self.state.reset()?;
        Ok(())
    }

    pub fn disable_step(&mut self, action: &str, backend: Option<&str>, command: Option<&str>) -> Result<bool, PipelineError> {
        Ok(self.state.disable(action, backend, command)?)
    }

    pub fn enable_step(&mut self, action: &str, backend: Option<&str>, command: Option<&str>) -> Result<bool, PipelineError> {
        Ok(self.state.enable(action, backend, command)?)
    }

    pub fn is_step_disabled(&self, action: &str, backend: Option<&str>, command: Option<&str>) -> bool {
        self.state.is_disabled(action, backend, command)
    }

    pub fn describe(&self) -> Result<PipelineDescription, PipelineError> {
        Ok(PipelineDescription {
            context: self.context.clone(),
            actions: self.actions.clone(),
            step: self.state.step(),
            dirty: self.state.is_dirty(),
            completed: self.is_completed(),
            disabled_steps: self.state.disabled_steps().to_vec(),
            stats: self.state.stats()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionType;
    use crate::backends::stub::{scripted_factory, CallLog, ScriptedBackend};
    use crate::workspace::WorkspaceContext;
    use std::sync::Arc;
    use tempfile::TempDir;

    const LOCAL: &[Surrounding] = &[Surrounding::Local];

    fn registry(dir: &TempDir, backends: Vec<ScriptedBackend>) -> BackendRegistry {
        let workspace = WorkspaceContext::new("ws", dir.path(), dir.path().join("build"), Surrounding::Local);
        BackendRegistry::new(scripted_factory(backends), Arc::new(workspace))
    }

    fn pipeline(dir: &TempDir, actions: Vec<PipelineAction>) -> Pipeline {
        let context = PipelineContext::new("lib", dir.path(), dir.path().join("build/lib"), Surrounding::Local);
        Pipeline::new(context, actions).unwrap()
    }

    fn source_build_test() -> Vec<PipelineAction> {
        vec![
            PipelineAction::new(ActionType::Source, &["git"], LOCAL),
            PipelineAction::new(ActionType::Build, &["docker", "make"], LOCAL),
            PipelineAction::new(ActionType::UnitTests, &["make"], LOCAL),
        ]
    }

    fn standard_backends(log: &CallLog) -> Vec<ScriptedBackend> {
        vec![
            ScriptedBackend::new("git", log),
            ScriptedBackend::new("docker", log),
            ScriptedBackend::new("make", log),
        ]
    }

    #[tokio::test]
    async fn test_run_visits_actions_in_order() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let mut pipeline = pipeline(&dir, source_build_test());

        let result = pipeline.run(&registry, false).await.unwrap();
        assert_eq!(result, ResultCode::Success);
        assert_eq!(
            log.with_prefix("execute:"),
            vec![
                "execute:lib:git:source",
                "execute:lib:docker:build",
                "execute:lib:make:build",
                "execute:lib:make:unit-tests",
            ]
        );
        assert!(pipeline.is_completed());

        // Terminal step: a rerun does nothing.
        let result = pipeline.run(&registry, false).await.unwrap();
        assert_eq!(result, ResultCode::Success);
        assert_eq!(log.with_prefix("execute:").len(), 4);
    }

    #[tokio::test]
    async fn test_failure_halts_and_marks_dirty() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let backends = vec![
            ScriptedBackend::new("git", &log),
            ScriptedBackend::new("docker", &log).with_outcome(ActionType::Build, ResultCode::Failure),
            ScriptedBackend::new("make", &log),
        ];
        let registry = registry(&dir, backends);
        let mut pipeline = pipeline(&dir, source_build_test());

        let result = pipeline.run(&registry, false).await.unwrap();
        assert_eq!(result, ResultCode::Failure);
        assert!(pipeline.is_failed());
        assert_eq!(pipeline.state().step(), 1);
        assert_eq!(log.count("execute:lib:make:build"), 0);
        assert_eq!(log.count("execute:lib:make:unit-tests"), 0);

        // Failure survives a reload until reset.
        drop(pipeline);
        let mut pipeline = self::pipeline(&dir, source_build_test());
        assert!(pipeline.is_failed());
        pipeline.reset().unwrap();
        assert!(!pipeline.is_failed());
        assert_eq!(pipeline.state().step(), 0);
    }

    #[tokio::test]
    async fn test_action_error_counts_as_failure() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let backends = vec![
            ScriptedBackend::new("git", &log).raising(ActionType::Source),
            ScriptedBackend::new("docker", &log),
            ScriptedBackend::new("make", &log),
        ];
        let registry = registry(&dir, backends);
        let mut pipeline = pipeline(&dir, source_build_test());

        assert_eq!(pipeline.run(&registry, false).await.unwrap(), ResultCode::Failure);
        assert!(pipeline.is_failed());
        assert_eq!(pipeline.state().step(), 0);
    }

    #[tokio::test]
    async fn test_refused_prepare_is_failure() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let backends = vec![
            ScriptedBackend::new("git", &log).refusing(ActionType::Source),
            ScriptedBackend::new("docker", &log),
            ScriptedBackend::new("make", &log),
        ];
        let registry = registry(&dir, backends);
        let mut pipeline = pipeline(&dir, source_build_test());

        assert_eq!(pipeline.run(&registry, false).await.unwrap(), ResultCode::Failure);
        assert_eq!(log.count("execute:lib:git:source"), 0);
    }

    #[tokio::test]
    async fn test_partial_success_does_not_halt() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let backends = vec![
            ScriptedBackend::new("git", &log),
            ScriptedBackend::new("docker", &log).with_outcome(ActionType::Build, ResultCode::PartialSuccess),
            ScriptedBackend::new("make", &log),
        ];
        let registry = registry(&dir, backends);
        let mut pipeline = pipeline(&dir, source_build_test());

        assert_eq!(pipeline.run(&registry, false).await.unwrap(), ResultCode::PartialSuccess);
        assert!(pipeline.is_completed());
        assert!(!pipeline.is_failed());
        assert_eq!(log.count("execute:lib:make:unit-tests"), 1);
    }

    #[tokio::test]
    async fn test_disabled_backend_is_skipped() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let mut pipeline = pipeline(&dir, source_build_test());
        pipeline.disable_step("build", Some("docker"), None).unwrap();

        assert_eq!(pipeline.run(&registry, false).await.unwrap(), ResultCode::Success);
        assert_eq!(log.count("execute:lib:git:source"), 1);
        assert_eq!(log.count("execute:lib:docker:build"), 0);
        assert_eq!(log.count("execute:lib:make:build"), 1);
        assert_eq!(log.count("execute:lib:make:unit-tests"), 1);
        assert!(pipeline.is_completed());
    }

    #[tokio::test]
    async fn test_disable_scoped_to_command() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let mut pipeline = pipeline(&dir, source_build_test());
        pipeline.disable_step("build", None, Some("execute-step")).unwrap();

        assert_eq!(pipeline.run(&registry, false).await.unwrap(), ResultCode::Success);
        assert_eq!(log.count("execute:lib:make:build"), 1);
    }

    #[tokio::test]
    async fn test_non_matching_actions_are_skipped() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let actions = vec![
            PipelineAction::new(ActionType::Source, &["git"], LOCAL),
            PipelineAction::new(ActionType::Deploy, &["docker"], &[Surrounding::Ci]),
            PipelineAction::new(ActionType::UnitTests, &["make"], LOCAL),
        ];
        let mut pipeline = pipeline(&dir, actions);

        assert_eq!(pipeline.run(&registry, false).await.unwrap(), ResultCode::Success);
        assert_eq!(log.count("execute:lib:docker:deploy"), 0);
        assert!(!registry.is_initialized("docker"));
        assert!(pipeline.is_completed());
    }

    #[tokio::test]
    async fn test_execute_action_by_name_and_on_demand() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let actions = vec![
            PipelineAction::new(ActionType::Build, &["make"], LOCAL),
            PipelineAction::new(ActionType::Deploy, &["docker"], &[Surrounding::OnDemand]).named("publish"),
        ];
        let mut pipeline = pipeline(&dir, actions);

        assert_eq!(pipeline.execute_action(&registry, "publish").await.unwrap(), ResultCode::Success);
        assert_eq!(log.with_prefix("execute:"), vec!["execute:lib:docker:deploy"]);
        assert_eq!(pipeline.state().step(), 0);

        assert_eq!(pipeline.execute_action(&registry, "deploy").await.unwrap(), ResultCode::Success);
        assert_eq!(log.count("execute:lib:docker:deploy"), 2);
    }

    #[tokio::test]
    async fn test_clean_walks_reached_actions_in_reverse() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let mut pipeline = pipeline(&dir, source_build_test());
        pipeline.run(&registry, false).await.unwrap();

        let result = pipeline.clean(&registry, true, true).await.unwrap();
        assert_eq!(result, ResultCode::Success);
        assert_eq!(
            log.with_prefix("cleanup:"),
            vec![
                "cleanup:lib:make:unit-tests",
                "cleanup:lib:docker:build",
                "cleanup:lib:make:build",
                "cleanup:lib:git:source",
            ]
        );
        assert_eq!(pipeline.state().step(), 0);
    }

    #[tokio::test]
    async fn test_clean_stops_at_current_step() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let mut pipeline = pipeline(&dir, source_build_test());
        pipeline.step_execute_forward(&registry).await.unwrap();
        assert_eq!(pipeline.state().step(), 1);

        pipeline.clean(&registry, false, false).await.unwrap();
        assert_eq!(
            log.with_prefix("cleanup:"),
            vec!["cleanup:lib:docker:build", "cleanup:lib:make:build", "cleanup:lib:git:source"]
        );
    }

    #[tokio::test]
    async fn test_clean_without_working_dir_is_noop() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let mut pipeline = pipeline(&dir, source_build_test());

        assert_eq!(pipeline.clean(&registry, false, false).await.unwrap(), ResultCode::Success);
        assert!(log.with_prefix("cleanup:").is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_error_does_not_stop_walk() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let backends = vec![
            ScriptedBackend::new("git", &log),
            ScriptedBackend::new("docker", &log).raising(ActionType::Build),
            ScriptedBackend::new("make", &log),
        ];
        let registry = registry(&dir, backends);
        let mut pipeline = pipeline(&dir, source_build_test());
        pipeline.step_next().unwrap();
        pipeline.step_next().unwrap();
        std::fs::create_dir_all(&pipeline.context().working_dir).unwrap();

        pipeline.clean(&registry, false, false).await.unwrap();
        assert_eq!(log.count("cleanup:lib:git:source"), 1);
    }

    #[tokio::test]
    async fn test_step_forward_and_backward() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let mut pipeline = pipeline(&dir, source_build_test());

        pipeline.step_execute(&registry).await.unwrap();
        assert_eq!(pipeline.state().step(), 0);

        pipeline.step_execute_forward(&registry).await.unwrap();
        pipeline.step_execute_forward(&registry).await.unwrap();
        assert_eq!(pipeline.current_step().map(|(idx, _)| idx), Some(2));

        pipeline.step_clean_backward(&registry).await.unwrap();
        assert_eq!(log.with_prefix("cleanup:"), vec!["cleanup:lib:make:unit-tests"]);
        assert_eq!(pipeline.state().step(), 1);
    }

    #[tokio::test]
    async fn test_step_execute_forward_does_not_advance_on_failure() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let backends = vec![
            ScriptedBackend::new("git", &log).with_outcome(ActionType::Source, ResultCode::Failure),
            ScriptedBackend::new("docker", &log),
            ScriptedBackend::new("make", &log),
        ];
        let registry = registry(&dir, backends);
        let mut pipeline = pipeline(&dir, source_build_test());

        assert_eq!(pipeline.step_execute_forward(&registry).await.unwrap(), ResultCode::Failure);
        assert_eq!(pipeline.state().step(), 0);
        assert!(pipeline.is_failed());
    }

    #[tokio::test]
    async fn test_run_with_reset_cache_starts_over() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let registry = registry(&dir, standard_backends(&log));
        let mut pipeline = pipeline(&dir, source_build_test());
        pipeline.run(&registry, false).await.unwrap();

        pipeline.run(&registry, true).await.unwrap();
        assert_eq!(log.count("execute:lib:git:source"), 2);
        let stats = pipeline.describe().unwrap().stats.unwrap();
        assert_eq!(stats.actions_executed, 4);
        assert!(stats.end_time.is_some());
    }

    #[tokio::test]
    async fn test_describe_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(&dir, source_build_test());
        pipeline.step_next().unwrap();
        pipeline.disable_step("unit-tests", None, None).unwrap();

        let description = pipeline.describe().unwrap();
        assert_eq!(description.step, 1);
        assert!(!description.dirty);
        assert_eq!(description.actions.len(), 3);
        assert_eq!(description.disabled_steps.len(), 1);
        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(json["context"]["name"], "lib");
    }
}
