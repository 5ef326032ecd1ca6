// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::actions::Surrounding;
use crate::backends::{BackendFactory, BackendRegistry};
use crate::config::consts::{DEFAULT_HEAD, DEFAULT_WORKING_DIR, KEY_STATS, WORKSPACE_FILE_NAME};
use crate::config::{self, WorkspaceDefinition};
use crate::errors::{ConfigError, PipelineError, StoreError, WorkspaceError};
use crate::pipeline::Pipeline;
use crate::store::Store;
use crate::workspace::graph::DependencyGraph;
use crate::workspace::scm::SourceControl;
use crate::workspace::state::{classify, PipelineStatus, Probe, WorkspaceState};
use crate::workspace::{WorkspaceContext, WorkspacePipeline, WorkspaceStats};

/// A loaded pipeline shared between the workspace and its scheduled units.
pub type SharedPipeline = Arc<Mutex<Pipeline>>;

#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
    /// Overrides the working dir from the definition
    pub working_dir: Option<PathBuf>,
    /// Overrides environment detection
    pub surrounding: Option<Surrounding>,
}

/// Serializable snapshot of a workspace.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceDescription {
    pub context: WorkspaceContext,
    pub groups: BTreeMap<String, Vec<WorkspacePipeline>>,
    /// `None` when the declared needs are cyclic
    pub execution_order: Option<Vec<String>>,
    pub stats: WorkspaceStats,
}

/// Loads pipeline instances once and caches them by entry name.
#[derive(Clone)]
pub(super) struct PipelineLoader {
    factory: BackendFactory,
    surrounding: Surrounding,
    pipelines: Arc<Mutex<HashMap<String, SharedPipeline>>>,
}

impl PipelineLoader {
    pub(super) async fn get_or_load(
        &self,
        entry: &WorkspacePipeline,
        dir: &Path,
    ) -> Result<SharedPipeline, PipelineError> {
        let mut pipelines = self.pipelines.lock().await;
        if let Some(pipeline) = pipelines.get(&entry.name) {
            return Ok(pipeline.clone());
        }
        let pipeline = Pipeline::load(dir, None, self.surrounding, &self.factory)?;
        let shared = Arc::new(Mutex::new(pipeline));
        pipelines.insert(entry.name.clone(), shared.clone());
        Ok(shared)
    }
}

/// A set of pipelines sharing one backend registry.
pub struct Workspace {
    pub(super) context: Arc<WorkspaceContext>,
    pub(super) groups: BTreeMap<String, Vec<WorkspacePipeline>>,
    pub(super) registry: Arc<BackendRegistry>,
    pub(super) scm: Arc<dyn SourceControl>,
    pub(super) pipelines: Arc<Mutex<HashMap<String, SharedPipeline>>>,
    /// Latest resolution; also serializes resolutions
    pub(super) resolved: Mutex<WorkspaceState>,
    pub(super) sync_lock: Mutex<()>,
    pub(super) store: std::sync::Mutex<Store>,
}

impl Workspace {
    /// Open the workspace rooted at `source_dir`.
    ///
    /// Without a `workspace.yml`, a lone `pipeline.yml` is wrapped as a
    /// singular workspace.
    pub fn open(
        source_dir: &Path,
        options: WorkspaceOptions,
        factory: BackendFactory,
        scm: Arc<dyn SourceControl>,
    ) -> Result<Self, WorkspaceError> {
        if config::find_definition(source_dir, WORKSPACE_FILE_NAME).is_some() {
            let definition = config::load_workspace_definition(source_dir)?;
            Self::from_definition(source_dir, &definition, options, factory, scm)
        } else {
            Self::singular(source_dir, options, factory, scm)
        }
    }

    fn from_definition(
        source_dir: &Path,
        definition: &WorkspaceDefinition,
        options: WorkspaceOptions,
        factory: BackendFactory,
        scm: Arc<dyn SourceControl>,
    ) -> Result<Self, WorkspaceError> {
        let name = definition.name()?;
        let surrounding = options.surrounding.unwrap_or_else(|| Surrounding::detect(false));
        let working_dir = options.working_dir.unwrap_or_else(|| {
            source_dir.join(
                definition
                    .working_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKING_DIR)),
            )
        });

        let mut context = WorkspaceContext::new(name, source_dir, working_dir, surrounding);
        context.scm = definition.scm.clone();
        context.organizations = definition.organizations();
        context.backend_settings = definition.backend_settings.clone();

        let groups = definition.groups()?;
        Ok(Self::assemble(context, groups, factory, scm, HashMap::new()))
    }

    fn singular(
        source_dir: &Path,
        options: WorkspaceOptions,
        factory: BackendFactory,
        scm: Arc<dyn SourceControl>,
    ) -> Result<Self, WorkspaceError> {
        let surrounding = options.surrounding.unwrap_or_else(|| Surrounding::detect(true));
        let pipeline = Pipeline::load(source_dir, options.working_dir.as_deref(), surrounding, &factory)?;
        let pipeline_context = pipeline.context().clone();

        let mut context = WorkspaceContext::new(
            &pipeline_context.name,
            source_dir,
            &pipeline_context.working_dir,
            surrounding,
        );
        context.scm = pipeline_context.scm.first().cloned();
        context.singular = true;

        let mut entry = WorkspacePipeline::new(&pipeline_context.name, "");
        entry.head = pipeline_context.head.unwrap_or_else(|| DEFAULT_HEAD.to_string());
        let groups = BTreeMap::from([(String::new(), vec![entry])]);
        let pipelines = HashMap::from([(pipeline_context.name, Arc::new(Mutex::new(pipeline)))]);
        Ok(Self::assemble(context, groups, factory, scm, pipelines))
    }

    fn assemble(
        context: WorkspaceContext,
        groups: BTreeMap<String, Vec<WorkspacePipeline>>,
        factory: BackendFactory,
        scm: Arc<dyn SourceControl>,
        pipelines: HashMap<String, SharedPipeline>,
    ) -> Self {
        let context = Arc::new(context);
        let prefix = format!("{}.workspace", context.name);
        let mut store = Store::open(&context.working_dir, &prefix, prefix.clone());
        if !store.contains(KEY_STATS) {
            if let Err(error) = store.commit_as(KEY_STATS, &WorkspaceStats::default(), false) {
                tracing::warn!(%error, "Could not seed workspace stats");
            }
        }
        Self {
            registry: Arc::new(BackendRegistry::new(factory, context.clone())),
            context,
            groups,
            scm,
            pipelines: Arc::new(Mutex::new(pipelines)),
            resolved: Mutex::new(WorkspaceState::default()),
            sync_lock: Mutex::new(()),
            store: std::sync::Mutex::new(store),
        }
    }

    pub fn context(&self) -> &WorkspaceContext {
        &self.context
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn groups(&self) -> &BTreeMap<String, Vec<WorkspacePipeline>> {
        &self.groups
    }

    pub fn entries(&self) -> impl Iterator<Item = &WorkspacePipeline> {
        self.groups.values().flatten()
    }

    pub fn entry(&self, name: &str) -> Option<&WorkspacePipeline> {
        self.entries().find(|e| e.name == name)
    }

    /// Checkout directory of an entry.
    pub fn pipeline_dir(&self, entry: &WorkspacePipeline) -> PathBuf {
        if self.context.singular {
            self.context.source_dir.clone()
        } else {
            self.context.source_dir.join(&entry.path).join(&entry.name)
        }
    }

    pub(super) fn loader(&self) -> PipelineLoader {
        PipelineLoader {
            factory: self.registry.factory().clone(),
            surrounding: self.context.surrounding,
            pipelines: self.pipelines.clone(),
        }
    }

    /// The loaded pipeline for entry `name`.
    pub async fn pipeline(&self, name: &str) -> Result<SharedPipeline, WorkspaceError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| WorkspaceError::UnknownPipeline(name.to_string()))?;
        let dir = self.pipeline_dir(entry);
        Ok(self.loader().get_or_load(entry, &dir).await?)
    }

    /// The named pipeline, or the only one when no name is given.
    pub async fn lone_pipeline(&self, name: Option<&str>) -> Result<SharedPipeline, WorkspaceError> {
        if let Some(name) = name {
            return self.pipeline(name).await;
        }
        let mut entries = self.entries();
        match (entries.next(), entries.next()) {
            (Some(only), None) => self.pipeline(&only.name).await,
            _ => Err(WorkspaceError::Ambiguous(self.context.name.clone())),
        }
    }

    /// Drop cached instances so they are reloaded from disk on next use.
    pub(super) async fn invalidate(&self, names: &[String]) {
        let mut pipelines = self.pipelines.lock().await;
        for name in names {
            pipelines.remove(name);
        }
    }

    /// Bucket every entry by status.
    ///
    /// With `quick`, the behind/ahead check against upstream is skipped.
    pub async fn resolve(&self, quick: bool, parallel_jobs: usize) -> WorkspaceState {
        let mut resolved = self.resolved.lock().await;
        let semaphore = Arc::new(Semaphore::new(parallel_jobs.max(1)));
        let mut tasks = JoinSet::new();

        for entry in self.entries().cloned() {
            let dir = self.pipeline_dir(&entry);
            let loader = self.loader();
            let scm = self.scm.clone();
            let semaphore = semaphore.clone();
            let singular = self.context.singular;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let status = resolve_entry(&entry, &dir, quick, singular, &loader, scm.as_ref()).await;
                (status, entry)
            });
        }

        let mut state = WorkspaceState::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((status, entry)) => {
                    tracing::debug!(pipeline = %entry.name, ?status, "Resolved");
                    state.insert(status, entry);
                }
                Err(error) => tracing::error!(%error, "Resolution task failed"),
            }
        }
        *resolved = state.clone();
        state
    }

    pub fn stats(&self) -> Result<WorkspaceStats, StoreError> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(store.get_as::<WorkspaceStats>(KEY_STATS)?.unwrap_or_default())
    }

    pub(super) fn record_run(&self, pipelines_executed: usize) -> Result<(), StoreError> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats = store.get_as::<WorkspaceStats>(KEY_STATS)?.unwrap_or_default();
        stats.pipelines_executed += pipelines_executed as u64;
        stats.last_run = Some(chrono::Utc::now());
        store.commit_as(KEY_STATS, &stats, true)
    }

    pub fn describe(&self) -> Result<WorkspaceDescription, WorkspaceError> {
        let execution_order = DependencyGraph::from_entries(self.entries())
            .topological_order()
            .ok();
        Ok(WorkspaceDescription {
            context: (*self.context).clone(),
            groups: self.groups.clone(),
            execution_order,
            stats: self.stats()?,
        })
    }

    /// Names of every declared entry, sorted.
    pub fn pipeline_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries().map(|e| e.name.clone()).collect();
        names.sort();
        names
    }
}

async fn resolve_entry(
    entry: &WorkspacePipeline,
    dir: &Path,
    quick: bool,
    singular: bool,
    loader: &PipelineLoader,
    scm: &dyn SourceControl,
) -> PipelineStatus {
    if !dir.is_dir() {
        return PipelineStatus::Unresolved;
    }
    let pipeline = match loader.get_or_load(entry, dir).await {
        Ok(pipeline) => pipeline,
        Err(error) => {
            if matches!(error, PipelineError::Config(ConfigError::NotFound(_))) {
                tracing::debug!(pipeline = %entry.name, %error, "No pipeline definition");
            } else {
                tracing::warn!(pipeline = %entry.name, %error, "Could not load pipeline");
            }
            return PipelineStatus::Unresolved;
        }
    };
    let (completed, failed, declared_head) = {
        let pipeline = pipeline.lock().await;
        (pipeline.is_completed(), pipeline.is_failed(), pipeline.context().head.clone())
    };

    // A lone checkout is taken as found
    let (head_matches, in_sync) = if singular {
        (true, true)
    } else {
        let head = match scm.head_branch(dir).await {
            Ok(Some(head)) => Some(head),
            Ok(None) => declared_head,
            Err(error) => {
                tracing::warn!(pipeline = %entry.name, %error, "Could not read head branch");
                declared_head
            }
        };
        let head_matches = head.as_deref() == Some(entry.head.as_str());
        let in_sync = if quick || !head_matches {
            true
        } else {
            scm.is_in_sync(dir, &entry.head).await.unwrap_or_else(|error| {
                tracing::warn!(pipeline = %entry.name, %error, "Could not compare with upstream");
                false
            })
        };
        (head_matches, in_sync)
    };

    classify(
        entry.executable,
        Probe {
            head_matches,
            in_sync,
            completed,
            failed,
        },
    )
}
