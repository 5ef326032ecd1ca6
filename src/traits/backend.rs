// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::actions::{ActionType, ResultCode};
use crate::backends::BackendRegistry;
use crate::pipeline::PipelineContext;
use crate::traits::Action;
use crate::workspace::WorkspaceContext;

/// A named tool integration: a bundle of actions plus lifecycle hooks.
///
/// Backends are constructed lazily by the registry, at most once per process,
/// and shared between every pipeline that references them.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// One-time setup. Must not initialize this same backend again through
    /// the registry.
    async fn initialize(
        &self,
        _registry: &BackendRegistry,
        _workspace: &WorkspaceContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn authenticate(
        &self,
        credentials: &BackendCredentials,
        registry: &BackendRegistry,
        workspace: &WorkspaceContext,
        pipeline: Option<&PipelineContext>,
    ) -> anyhow::Result<ResultCode>;

    async fn cleanup(
        &self,
        _registry: &BackendRegistry,
        _workspace: &WorkspaceContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn describe(&self) -> BackendDescription;
}

/// Actions a backend supports plus a JSON description of its settings model.
#[derive(Clone)]
pub struct BackendDescription {
    pub name: String,
    pub supported_actions: HashMap<ActionType, Arc<dyn Action>>,
    pub config_model: serde_json::Value,
}

impl BackendDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supported_actions: HashMap::new(),
            config_model: serde_json::Value::Null,
        }
    }

    pub fn with_action(mut self, action: Arc<dyn Action>) -> Self {
        self.supported_actions.insert(action.action_type(), action);
        self
    }

    pub fn with_config_model(mut self, model: serde_json::Value) -> Self {
        self.config_model = model;
        self
    }

    pub fn action(&self, action_type: ActionType) -> Option<&Arc<dyn Action>> {
        self.supported_actions.get(&action_type)
    }

    pub fn summary(&self) -> BackendSummary {
        let mut actions: Vec<ActionType> = self.supported_actions.keys().copied().collect();
        actions.sort();
        BackendSummary {
            name: self.name.clone(),
            actions,
            config_model: self.config_model.clone(),
        }
    }
}

impl fmt::Debug for BackendDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescription")
            .field("name", &self.name)
            .field("supported_actions", &self.summary().actions)
            .finish()
    }
}

/// Serializable view of a [`BackendDescription`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendSummary {
    pub name: String,
    pub actions: Vec<ActionType>,
    pub config_model: serde_json::Value,
}

/// Credentials passed through to a backend's `authenticate` hook.
#[derive(Clone, Default)]
pub struct BackendCredentials {
    pub username: String,
    pub secret: String,
    pub target: Option<String>,
    pub certificate: Option<String>,
}

impl fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("username", &self.username)
            .field("secret", &"***")
            .field("target", &self.target)
            .field("certificate", &self.certificate.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = BackendCredentials {
            username: "ci".into(),
            secret: "hunter2".into(),
            target: Some("registry.local".into()),
            certificate: None,
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("ci"));
        assert!(!printed.contains("hunter2"));
    }
}
