// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test doubles: scripted backends and a scripted source control client.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::actions::{ActionResult, ActionType, ResultCode};
use crate::backends::{BackendFactory, BackendRegistry};
use crate::errors::SyncError;
use crate::pipeline::PipelineContext;
use crate::traits::{Action, ActionContext, Backend, BackendCredentials, BackendDescription};
use crate::workspace::scm::SourceControl;
use crate::workspace::WorkspaceContext;

/// Shared, ordered record of calls made against the doubles.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }

    /// Entries starting with `prefix`, in call order.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }
}

/// A backend whose actions record every call and return scripted outcomes.
///
/// Log entries look like `execute:<pipeline>:<backend>:<action>`.
#[derive(Clone)]
pub struct ScriptedBackend {
    name: String,
    log: CallLog,
    supported: Vec<ActionType>,
    outcomes: HashMap<ActionType, ResultCode>,
    raising: HashSet<ActionType>,
    refusing: HashSet<ActionType>,
    panic_once: Option<(ActionType, Arc<AtomicBool>)>,
}

impl ScriptedBackend {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            supported: ActionType::ALL.to_vec(),
            outcomes: HashMap::new(),
            raising: HashSet::new(),
            refusing: HashSet::new(),
            panic_once: None,
        }
    }

    pub fn supporting(mut self, actions: &[ActionType]) -> Self {
        self.supported = actions.to_vec();
        self
    }

    pub fn with_outcome(mut self, action: ActionType, code: ResultCode) -> Self {
        self.outcomes.insert(action, code);
        self
    }

    /// `execute` and `cleanup` return an error for this action.
    pub fn raising(mut self, action: ActionType) -> Self {
        self.raising.insert(action);
        self
    }

    /// `prepare` returns false for this action.
    pub fn refusing(mut self, action: ActionType) -> Self {
        self.refusing.insert(action);
        self
    }

    /// The first `execute` of this action panics; later ones behave normally.
    pub fn panicking_once(mut self, action: ActionType) -> Self {
        self.panic_once = Some((action, Arc::new(AtomicBool::new(false))));
        self
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self, _registry: &BackendRegistry, _workspace: &WorkspaceContext) -> anyhow::Result<()> {
        self.log.record(format!("initialize:{}", self.name));
        Ok(())
    }

    async fn authenticate(
        &self,
        credentials: &BackendCredentials,
        _registry: &BackendRegistry,
        _workspace: &WorkspaceContext,
        _pipeline: Option<&PipelineContext>,
    ) -> anyhow::Result<ResultCode> {
        self.log.record(format!("authenticate:{}:{}", self.name, credentials.username));
        Ok(ResultCode::Success)
    }

    async fn cleanup(&self, _registry: &BackendRegistry, _workspace: &WorkspaceContext) -> anyhow::Result<()> {
        self.log.record(format!("cleanup-backend:{}", self.name));
        Ok(())
    }

    fn describe(&self) -> BackendDescription {
        self.supported
            .iter()
            .fold(BackendDescription::new(&self.name), |description, action_type| {
                description.with_action(Arc::new(ScriptedAction {
                    backend: self.name.clone(),
                    action_type: *action_type,
                    outcome: self.outcomes.get(action_type).copied().unwrap_or(ResultCode::Success),
                    raises: self.raising.contains(action_type),
                    refuses: self.refusing.contains(action_type),
                    panic_once: self
                        .panic_once
                        .as_ref()
                        .filter(|(t, _)| t == action_type)
                        .map(|(_, fired)| fired.clone()),
                    log: self.log.clone(),
                }))
            })
    }
}

struct ScriptedAction {
    backend: String,
    action_type: ActionType,
    outcome: ResultCode,
    raises: bool,
    refuses: bool,
    panic_once: Option<Arc<AtomicBool>>,
    log: CallLog,
}

impl ScriptedAction {
    fn record(&self, phase: &str, ctx: &ActionContext<'_>) {
        self.log.record(format!(
            "{}:{}:{}:{}",
            phase, ctx.pipeline.name, self.backend, self.action_type
        ));
    }
}

#[async_trait]
impl Action for ScriptedAction {
    fn action_type(&self) -> ActionType {
        self.action_type
    }

    async fn prepare(&self, ctx: &ActionContext<'_>) -> anyhow::Result<bool> {
        self.record("prepare", ctx);
        Ok(!self.refuses)
    }

    async fn execute(&self, ctx: &ActionContext<'_>) -> anyhow::Result<ActionResult> {
        if let Some(fired) = &self.panic_once {
            if !fired.swap(true, Ordering::SeqCst) {
                panic!("scripted panic in {}", self.action_type);
            }
        }
        self.record("execute", ctx);
        if self.raises {
            anyhow::bail!("scripted error in {}", self.action_type);
        }
        Ok(ActionResult::new(self.action_type, self.outcome, Vec::new()))
    }

    async fn cleanup(&self, ctx: &ActionContext<'_>) -> anyhow::Result<()> {
        self.record("cleanup", ctx);
        if self.raises {
            anyhow::bail!("scripted cleanup error in {}", self.action_type);
        }
        Ok(())
    }
}

/// Factory holding the given scripted backends.
pub fn scripted_factory(backends: Vec<ScriptedBackend>) -> BackendFactory {
    let mut factory = BackendFactory::new();
    for backend in backends {
        let name = backend.name.clone();
        factory.register(name, move || Arc::new(backend.clone()));
    }
    factory
}

/// Source control double keyed by directory name.
///
/// Log entries look like `checkout:<dir>:<branch>`, `pull:<dir>`, `clone:<url>`.
#[derive(Clone, Default)]
pub struct StubScm {
    pub log: CallLog,
    heads: Arc<Mutex<HashMap<String, String>>>,
    out_of_sync: Arc<Mutex<HashSet<String>>>,
    cloneable: Arc<Mutex<HashMap<String, String>>>,
    pull_failures: Arc<AtomicU32>,
}

impl StubScm {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            ..Self::default()
        }
    }

    pub fn with_head(self, dir_name: &str, branch: &str) -> Self {
        self.heads.lock().unwrap().insert(dir_name.to_string(), branch.to_string());
        self
    }

    pub fn out_of_sync(self, dir_name: &str) -> Self {
        self.out_of_sync.lock().unwrap().insert(dir_name.to_string());
        self
    }

    /// A clone of `url` succeeds and writes `pipeline_yaml` into the target.
    pub fn cloneable(self, url: &str, pipeline_yaml: &str) -> Self {
        self.cloneable
            .lock()
            .unwrap()
            .insert(url.to_string(), pipeline_yaml.to_string());
        self
    }

    /// The next `count` pulls fail.
    pub fn failing_pulls(self, count: u32) -> Self {
        self.pull_failures.store(count, Ordering::SeqCst);
        self
    }

    fn dir_name(dir: &Path) -> String {
        dir.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SourceControl for StubScm {
    async fn head_branch(&self, dir: &Path) -> Result<Option<String>, SyncError> {
        let heads = self.heads.lock().unwrap();
        Ok(Some(
            heads
                .get(&Self::dir_name(dir))
                .cloned()
                .unwrap_or_else(|| "master".to_string()),
        ))
    }

    async fn is_in_sync(&self, dir: &Path, _branch: &str) -> Result<bool, SyncError> {
        Ok(!self.out_of_sync.lock().unwrap().contains(&Self::dir_name(dir)))
    }

    async fn checkout(&self, dir: &Path, branch: &str) -> Result<(), SyncError> {
        self.log.record(format!("checkout:{}:{}", Self::dir_name(dir), branch));
        self.heads.lock().unwrap().insert(Self::dir_name(dir), branch.to_string());
        Ok(())
    }

    async fn pull(&self, dir: &Path, _branch: &str) -> Result<(), SyncError> {
        self.log.record(format!("pull:{}", Self::dir_name(dir)));
        let remaining = self.pull_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.pull_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::Command {
                operation: "pull",
                path: dir.display().to_string(),
                message: "scripted pull failure".to_string(),
            });
        }
        self.out_of_sync.lock().unwrap().remove(&Self::dir_name(dir));
        Ok(())
    }

    async fn clone_repo(&self, url: &str, dir: &Path, _branch: &str) -> Result<(), SyncError> {
        self.log.record(format!("clone:{}", url));
        let yaml = self.cloneable.lock().unwrap().get(url).cloned();
        match yaml {
            Some(yaml) => {
                std::fs::create_dir_all(dir)?;
                std::fs::write(dir.join("pipeline.yml"), yaml)?;
                Ok(())
            }
            None => Err(SyncError::Command {
                operation: "clone",
                path: dir.display().to_string(),
                message: format!("repository not found: {}", url),
            }),
        }
    }
}
