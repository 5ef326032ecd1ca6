// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lazy backend construction, shared attributes and action dispatch.

use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

use crate::actions::{ActionResult, PipelineAction, ResultCode, Surrounding};
use crate::backends::attributes::{AttributeKey, AttributeStore};
use crate::backends::BackendFactory;
use crate::errors::{ActionPhase, DispatchError, StoreError};
use crate::observability::messages::backend::{
    ActionNotSupported, ActionRaised, BackendHookFailed, BackendInitializing,
};
use crate::observability::messages::StructuredLog;
use crate::pipeline::PipelineContext;
use crate::store::Store;
use crate::traits::{Action, ActionContext, Backend, BackendCredentials, BackendDescription};
use crate::workspace::WorkspaceContext;

type BackendCell = Arc<OnceCell<Arc<dyn Backend>>>;

/// Owns every backend instance for a workspace.
///
/// Each backend is built at most once: concurrent callers of `initialize`
/// for the same name wait on the same cell. The backend map and the
/// attribute store sit behind separate locks, and neither lock is held
/// across an `.await`.
pub struct BackendRegistry {
    factory: BackendFactory,
    workspace: Arc<WorkspaceContext>,
    backends: Mutex<HashMap<String, BackendCell>>,
    attributes: Mutex<AttributeStore>,
}

impl BackendRegistry {
    pub fn new(factory: BackendFactory, workspace: Arc<WorkspaceContext>) -> Self {
        let prefix = format!("{}.backends", workspace.name);
        let store = Store::open(&workspace.working_dir, &prefix, prefix.clone());
        Self {
            factory,
            workspace,
            backends: Mutex::new(HashMap::new()),
            attributes: Mutex::new(AttributeStore::open(store)),
        }
    }

    pub fn factory(&self) -> &BackendFactory {
        &self.factory
    }

    pub fn workspace(&self) -> &WorkspaceContext {
        &self.workspace
    }

    fn cell(&self, name: &str) -> BackendCell {
        let mut backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        backends
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Construct and initialize `name` once; later calls return the same instance.
    pub async fn initialize(&self, name: &str) -> Result<Arc<dyn Backend>, DispatchError> {
        if !self.factory.is_backend_available(name) {
            return Err(DispatchError::UnknownBackend(name.to_string()));
        }
        let cell = self.cell(name);
        let backend = cell
            .get_or_try_init(|| async {
                BackendInitializing { backend: name }.log();
                let backend = self.factory.create(name)?;
                backend
                    .initialize(self, &self.workspace)
                    .await
                    .map_err(|source| DispatchError::Backend {
                        backend: name.to_string(),
                        operation: "initialize",
                        source,
                    })?;
                Ok::<_, DispatchError>(backend)
            })
            .await?;
        Ok(backend.clone())
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        let backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        backends.get(name).is_some_and(|cell| cell.initialized())
    }

    fn initialized(&self, name: &str) -> Result<Arc<dyn Backend>, DispatchError> {
        let backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        backends
            .get(name)
            .and_then(|cell| cell.get().cloned())
            .ok_or_else(|| DispatchError::NotInitialized(name.to_string()))
    }

    /// Initialize every backend of every action declared for `surrounding`.
    /// Stops at the first backend that cannot be initialized.
    pub async fn initialize_pipeline_backends(
        &self,
        actions: &[PipelineAction],
        surrounding: Surrounding,
    ) -> Result<(), DispatchError> {
        for action in actions.iter().filter(|a| a.runs_in(surrounding)) {
            for backend in &action.backends {
                self.initialize(backend).await?;
            }
        }
        Ok(())
    }

    fn resolve_action(
        &self,
        backend_name: &str,
        action: &PipelineAction,
        pipeline: &PipelineContext,
    ) -> Result<(Arc<dyn Backend>, Option<Arc<dyn Action>>), DispatchError> {
        let backend = self.initialized(backend_name)?;
        let implementation = backend.describe().action(action.action_type).cloned();
        if implementation.is_none() {
            ActionNotSupported {
                pipeline: &pipeline.name,
                backend: backend_name,
                action_type: action.action_type,
            }
            .log();
        }
        Ok((backend, implementation))
    }

    fn action_error(
        &self,
        backend: &str,
        action: &PipelineAction,
        pipeline: &PipelineContext,
        phase: ActionPhase,
        source: anyhow::Error,
    ) -> DispatchError {
        let error = DispatchError::Action {
            backend: backend.to_string(),
            action_type: action.action_type,
            phase,
            source,
        };
        ActionRaised {
            pipeline: &pipeline.name,
            backend,
            action_type: action.action_type,
            phase,
            error: &error,
        }
        .log();
        error
    }

    /// Run the action's `prepare`. Unsupported action types yield `Ok(false)`.
    pub async fn initialize_action(
        &self,
        backend_name: &str,
        action: &PipelineAction,
        pipeline: &PipelineContext,
    ) -> Result<bool, DispatchError> {
        let (backend, implementation) = self.resolve_action(backend_name, action, pipeline)?;
        let Some(implementation) = implementation else {
            return Ok(false);
        };
        let ctx = self.action_context(backend.as_ref(), action, pipeline);
        implementation
            .prepare(&ctx)
            .await
            .map_err(|e| self.action_error(backend_name, action, pipeline, ActionPhase::Prepare, e))
    }

    /// Run the action's `execute`. Unsupported action types yield an
    /// `ACTION_DOES_NOT_EXIST` result.
    pub async fn execute_action(
        &self,
        backend_name: &str,
        action: &PipelineAction,
        pipeline: &PipelineContext,
    ) -> Result<ActionResult, DispatchError> {
        let (backend, implementation) = self.resolve_action(backend_name, action, pipeline)?;
        let Some(implementation) = implementation else {
            return Ok(ActionResult::does_not_exist(action.action_type, backend_name));
        };
        let ctx = self.action_context(backend.as_ref(), action, pipeline);
        implementation
            .execute(&ctx)
            .await
            .map_err(|e| self.action_error(backend_name, action, pipeline, ActionPhase::Execute, e))
    }

    /// Run the action's `cleanup`. Unsupported action types are a no-op.
    pub async fn cleanup_action(
        &self,
        backend_name: &str,
        action: &PipelineAction,
        pipeline: &PipelineContext,
    ) -> Result<(), DispatchError> {
        let (backend, implementation) = self.resolve_action(backend_name, action, pipeline)?;
        let Some(implementation) = implementation else {
            return Ok(());
        };
        let ctx = self.action_context(backend.as_ref(), action, pipeline);
        implementation
            .cleanup(&ctx)
            .await
            .map_err(|e| self.action_error(backend_name, action, pipeline, ActionPhase::Cleanup, e))
    }

    fn action_context<'a>(
        &'a self,
        backend: &'a dyn Backend,
        action: &'a PipelineAction,
        pipeline: &'a PipelineContext,
    ) -> ActionContext<'a> {
        ActionContext {
            backend,
            registry: self,
            pipeline,
            workspace: &self.workspace,
            action_name: action.action_name.as_deref(),
        }
    }

    /// Initialize the backend if needed, then hand it the credentials.
    pub async fn authenticate(
        &self,
        backend_name: &str,
        credentials: &BackendCredentials,
        pipeline: Option<&PipelineContext>,
    ) -> Result<ResultCode, DispatchError> {
        let backend = self.initialize(backend_name).await?;
        backend
            .authenticate(credentials, self, &self.workspace, pipeline)
            .await
            .map_err(|source| {
                let error = DispatchError::Backend {
                    backend: backend_name.to_string(),
                    operation: "authenticate",
                    source,
                };
                BackendHookFailed {
                    backend: backend_name,
                    operation: "authenticate",
                    error: &error,
                }
                .log();
                error
            })
    }

    pub async fn describe_backend(&self, backend_name: &str) -> Result<BackendDescription, DispatchError> {
        Ok(self.initialize(backend_name).await?.describe())
    }

    /// Read an attribute, initializing its backend first.
    pub async fn attribute_for(&self, backend_name: &str, key: &str) -> Result<Value, DispatchError> {
        self.initialize(backend_name).await?;
        self.attribute(&AttributeKey::new(backend_name, key))
            .ok_or_else(|| DispatchError::MissingAttribute {
                backend: backend_name.to_string(),
                key: key.to_string(),
            })
    }

    /// Run every initialized backend's `cleanup` hook. Failures are logged.
    pub async fn cleanup_backends(&self) {
        let initialized: Vec<Arc<dyn Backend>> = {
            let backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
            backends.values().filter_map(|cell| cell.get().cloned()).collect()
        };
        for backend in initialized {
            if let Err(source) = backend.cleanup(self, &self.workspace).await {
                let error = DispatchError::Backend {
                    backend: backend.name().to_string(),
                    operation: "cleanup",
                    source,
                };
                BackendHookFailed {
                    backend: backend.name(),
                    operation: "cleanup",
                    error: &error,
                }
                .log();
            }
        }
    }

    pub fn add_attribute(&self, key: AttributeKey, value: Value, exclude: bool) -> Result<(), StoreError> {
        let mut attributes = self.attributes.lock().unwrap_or_else(PoisonError::into_inner);
        attributes.insert(key, value, exclude)
    }

    pub fn attribute(&self, key: &AttributeKey) -> Option<Value> {
        let attributes = self.attributes.lock().unwrap_or_else(PoisonError::into_inner);
        attributes.get(key).cloned()
    }

    pub fn has_attribute(&self, key: &AttributeKey) -> bool {
        let attributes = self.attributes.lock().unwrap_or_else(PoisonError::into_inner);
        attributes.contains(key)
    }

    /// Store a process-local object (client, connection) for other backends.
    pub fn add_handle<T: Any + Send + Sync>(&self, key: AttributeKey, handle: Arc<T>) {
        let mut attributes = self.attributes.lock().unwrap_or_else(PoisonError::into_inner);
        attributes.insert_handle(key, handle);
    }

    pub fn handle<T: Any + Send + Sync>(&self, key: &AttributeKey) -> Option<Arc<T>> {
        let attributes = self.attributes.lock().unwrap_or_else(PoisonError::into_inner);
        attributes.handle(key).and_then(|h| h.downcast::<T>().ok())
    }
}
