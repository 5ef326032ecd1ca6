// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in backend that runs shell commands configured per action type.
//!
//! Commands come from the `command` block of `backend-settings`, looked up
//! first in the pipeline definition and then in the workspace definition:
//!
//! ```yaml
//! backend-settings:
//!   command:
//!     build: make all
//!     unit-tests: [make test, make coverage]
//!     clean:
//!       build: make clean
//! ```
//!
//! An action's declared name takes precedence over its type as lookup key.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::process::Command;

use crate::actions::{ActionResult, ActionType, ResultCode};
use crate::backends::attributes::AttributeKey;
use crate::backends::BackendRegistry;
use crate::pipeline::PipelineContext;
use crate::traits::{Action, ActionContext, Backend, BackendCredentials, BackendDescription};
use crate::workspace::WorkspaceContext;

const CLEAN_KEY: &str = "clean";

#[derive(Debug, Default)]
pub struct CommandBackend;

impl CommandBackend {
    pub const NAME: &'static str = "command";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for CommandBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn authenticate(
        &self,
        _credentials: &BackendCredentials,
        _registry: &BackendRegistry,
        _workspace: &WorkspaceContext,
        _pipeline: Option<&PipelineContext>,
    ) -> anyhow::Result<ResultCode> {
        // Shell commands carry their own credentials.
        Ok(ResultCode::Success)
    }

    fn describe(&self) -> BackendDescription {
        ActionType::ALL
            .iter()
            .fold(BackendDescription::new(Self::NAME), |description, action_type| {
                description.with_action(Arc::new(CommandAction {
                    action_type: *action_type,
                }))
            })
            .with_config_model(json!({
                "<action-type or action name>": "string | [string]",
                "clean": { "<action-type or action name>": "string | [string]" }
            }))
    }
}

struct CommandAction {
    action_type: ActionType,
}

impl CommandAction {
    fn lookup_keys<'a>(&self, ctx: &ActionContext<'a>) -> Vec<&'a str> {
        let mut keys = Vec::new();
        if let Some(name) = ctx.action_name {
            keys.push(name);
        }
        keys.push(self.action_type.as_str());
        keys
    }

    /// Commands for this action, from the `execute` or `clean` table.
    fn commands(&self, ctx: &ActionContext<'_>, clean: bool) -> anyhow::Result<Vec<String>> {
        let sources = [
            ctx.pipeline.backend_settings(CommandBackend::NAME),
            ctx.workspace.backend_settings(CommandBackend::NAME),
        ];
        for settings in sources.into_iter().flatten() {
            let table = if clean { settings.get(CLEAN_KEY) } else { Some(settings) };
            let Some(table) = table else { continue };
            for key in self.lookup_keys(ctx) {
                if let Some(value) = table.get(key) {
                    return parse_commands(value)
                        .ok_or_else(|| anyhow::anyhow!("command for '{}' must be a string or a list of strings", key));
                }
            }
        }
        Ok(Vec::new())
    }

    async fn run(&self, ctx: &ActionContext<'_>, command: &str) -> anyhow::Result<(i32, Vec<Value>)> {
        let pipeline = ctx.pipeline;
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&pipeline.source_dir)
            .env("PIPELINE_NAME", &pipeline.name)
            .env("PIPELINE_SOURCE_DIR", &pipeline.source_dir)
            .env("PIPELINE_WORKING_DIR", &pipeline.working_dir)
            .env("PIPELINE_ACTION", self.action_type.as_str())
            .env("BUILD_NUMBER", &pipeline.build_number)
            .kill_on_drop(true);
        if let Some(version) = &pipeline.version {
            cmd.env("PIPELINE_VERSION", version);
        }

        tracing::debug!(pipeline = %pipeline.name, command, "Running command");
        let output = cmd
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("failed to spawn '{}': {}", command, e))?;

        let lines = String::from_utf8_lossy(&output.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&output.stderr).lines())
            .map(|line| Value::String(line.to_string()))
            .collect::<Vec<_>>();
        Ok((output.status.code().unwrap_or(-1), lines))
    }
}

fn parse_commands(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(command) => Some(vec![command.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

#[async_trait]
impl Action for CommandAction {
    fn action_type(&self) -> ActionType {
        self.action_type
    }

    async fn prepare(&self, ctx: &ActionContext<'_>) -> anyhow::Result<bool> {
        // A malformed settings entry fails the step before anything runs.
        self.commands(ctx, false).map(|_| true)
    }

    async fn execute(&self, ctx: &ActionContext<'_>) -> anyhow::Result<ActionResult> {
        let commands = self.commands(ctx, false)?;
        if commands.is_empty() {
            return Ok(ActionResult::new(
                self.action_type,
                ResultCode::Success,
                vec![Value::String(format!("no command configured for {}", self.action_type))],
            ));
        }

        let mut collected = Vec::new();
        let mut exit_code = 0;
        for command in &commands {
            let (code, lines) = self.run(ctx, command).await?;
            collected.extend(lines);
            exit_code = code;
            if code != 0 {
                collected.push(Value::String(format!("'{}' exited with {}", command, code)));
                break;
            }
        }

        ctx.registry.add_attribute(
            AttributeKey::tagged(&ctx.pipeline.name, CommandBackend::NAME, "last-exit-code"),
            json!(exit_code),
            false,
        )?;

        let code = if exit_code == 0 { ResultCode::Success } else { ResultCode::Failure };
        Ok(ActionResult::new(self.action_type, code, collected))
    }

    async fn cleanup(&self, ctx: &ActionContext<'_>) -> anyhow::Result<()> {
        for command in self.commands(ctx, true)? {
            let (code, _) = self.run(ctx, &command).await?;
            if code != 0 {
                anyhow::bail!("clean command '{}' exited with {}", command, code);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{PipelineAction, Surrounding};
    use crate::backends::BackendFactory;
    use tempfile::TempDir;

    fn setup(dir: &TempDir, settings: Value) -> (BackendRegistry, PipelineContext) {
        let workspace = WorkspaceContext::new("ws", dir.path(), dir.path().join("build"), Surrounding::Local);
        let registry = BackendRegistry::new(BackendFactory::with_builtin(), Arc::new(workspace));
        let mut pipeline =
            PipelineContext::new("lib", dir.path(), dir.path().join("build/lib"), Surrounding::Local);
        pipeline.backend_settings.insert(CommandBackend::NAME.to_string(), settings);
        (registry, pipeline)
    }

    fn action(action_type: ActionType) -> PipelineAction {
        PipelineAction::new(action_type, &["command"], &[Surrounding::Local])
    }

    #[tokio::test]
    async fn test_successful_command_collects_output() {
        let dir = TempDir::new().unwrap();
        let (registry, pipeline) = setup(&dir, json!({ "build": "echo built $PIPELINE_NAME" }));
        registry.initialize("command").await.unwrap();

        let result = registry.execute_action("command", &action(ActionType::Build), &pipeline).await.unwrap();
        assert_eq!(result.result_code, ResultCode::Success);
        assert!(result.result.contains(&json!("built lib")));
        assert_eq!(
            registry.attribute(&AttributeKey::tagged("lib", "command", "last-exit-code")),
            Some(json!(0))
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let (registry, pipeline) = setup(&dir, json!({ "unit-tests": ["true", "exit 3", "echo unreachable"] }));
        registry.initialize("command").await.unwrap();

        let result = registry
            .execute_action("command", &action(ActionType::UnitTests), &pipeline)
            .await
            .unwrap();
        assert_eq!(result.result_code, ResultCode::Failure);
        assert!(!result.result.contains(&json!("unreachable")));
    }

    #[tokio::test]
    async fn test_action_name_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let (registry, pipeline) =
            setup(&dir, json!({ "build": "exit 1", "fast-build": "echo fast" }));
        registry.initialize("command").await.unwrap();
        let named = action(ActionType::Build).named("fast-build");

        let result = registry.execute_action("command", &named, &pipeline).await.unwrap();
        assert_eq!(result.result_code, ResultCode::Success);
    }

    #[tokio::test]
    async fn test_unconfigured_action_succeeds() {
        let dir = TempDir::new().unwrap();
        let (registry, pipeline) = setup(&dir, json!({}));
        registry.initialize("command").await.unwrap();

        let result = registry
            .execute_action("command", &action(ActionType::LintChecks), &pipeline)
            .await
            .unwrap();
        assert_eq!(result.result_code, ResultCode::Success);
    }

    #[tokio::test]
    async fn test_failing_clean_command_is_error() {
        let dir = TempDir::new().unwrap();
        let (registry, pipeline) = setup(&dir, json!({ "clean": { "build": "exit 2" } }));
        registry.initialize("command").await.unwrap();

        let result = registry.cleanup_action("command", &action(ActionType::Build), &pipeline).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_settings_fail_prepare() {
        let dir = TempDir::new().unwrap();
        let (registry, pipeline) = setup(&dir, json!({ "build": 42 }));
        registry.initialize("command").await.unwrap();

        let result = registry.initialize_action("command", &action(ActionType::Build), &pipeline).await;
        assert!(result.is_err());
    }
}
