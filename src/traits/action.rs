// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::actions::{ActionResult, ActionType};
use crate::backends::BackendRegistry;
use crate::pipeline::PipelineContext;
use crate::traits::Backend;
use crate::workspace::WorkspaceContext;

/// Everything an action implementation may look at while it runs.
pub struct ActionContext<'a> {
    /// The backend the action belongs to
    pub backend: &'a dyn Backend,
    /// Registry, for attributes and handles shared between backends
    pub registry: &'a BackendRegistry,
    pub pipeline: &'a PipelineContext,
    pub workspace: &'a WorkspaceContext,
    /// Name given to the action in the pipeline definition, if any
    pub action_name: Option<&'a str>,
}

/// One action a backend knows how to perform.
///
/// Errors returned from any phase are caught by the registry and reported
/// with the backend and action they came from.
#[async_trait]
pub trait Action: Send + Sync {
    fn action_type(&self) -> ActionType;

    /// Called before `execute`. Returning `false` fails the step.
    async fn prepare(&self, _ctx: &ActionContext<'_>) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn execute(&self, ctx: &ActionContext<'_>) -> anyhow::Result<ActionResult>;

    async fn cleanup(&self, _ctx: &ActionContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}
