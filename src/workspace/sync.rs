// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::actions::ResultCode;
use crate::config::consts::{default_parallelism, PIPELINE_FILE_NAME};
use crate::config::find_definition;
use crate::errors::{ConfigError, SyncError};
use crate::observability::messages::workspace::SyncFailed;
use crate::observability::messages::StructuredLog;
use crate::workspace::retry::RetryPolicy;
use crate::workspace::scm::{clone_url, SourceControl};
use crate::workspace::state::PipelineStatus;
use crate::workspace::{Workspace, WorkspaceContext, WorkspacePipeline};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Fix the checked out branch but do not pull
    pub no_code_sync: bool,
    pub parallel_jobs: usize,
    /// Applied to pulls
    pub retry: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            no_code_sync: false,
            parallel_jobs: default_parallelism(),
            retry: RetryPolicy::sync_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub synced: Vec<String>,
    pub failed: Vec<String>,
}

impl SyncReport {
    pub fn result(&self) -> ResultCode {
        if self.failed.is_empty() {
            ResultCode::Success
        } else {
            ResultCode::Failure
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncKind {
    /// Missing or unloadable: clone, or check out the declared head
    Unresolved,
    /// Wrong branch or behind/ahead: check out, then pull
    Unsynced,
}

impl Workspace {
    /// Bring unresolved and unsynced entries up to date with source control.
    ///
    /// Synced entries drop their cached pipeline so the next use reloads it.
    pub async fn sync(&self, options: &SyncOptions) -> SyncReport {
        let _guard = self.sync_lock.lock().await;
        let parallel_jobs = options.parallel_jobs.max(1);
        let state = self.resolve(false, parallel_jobs).await;

        let semaphore = Arc::new(Semaphore::new(parallel_jobs));
        let mut tasks = JoinSet::new();
        let work = state
            .entries(PipelineStatus::Unresolved)
            .map(|e| (SyncKind::Unresolved, e.clone()))
            .chain(
                state
                    .entries(PipelineStatus::Unsynced)
                    .map(|e| (SyncKind::Unsynced, e.clone())),
            );
        for (kind, entry) in work {
            let dir = self.pipeline_dir(&entry);
            let context = self.context.clone();
            let scm = self.scm.clone();
            let semaphore = semaphore.clone();
            let options = options.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = match kind {
                    SyncKind::Unresolved => clone_or_checkout(&entry, &dir, &context, scm.as_ref()).await,
                    SyncKind::Unsynced => checkout_and_pull(&entry, &dir, scm.as_ref(), &options).await,
                };
                (entry.name, result)
            });
        }

        let mut report = SyncReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => report.synced.push(name),
                Ok((name, Err(error))) => {
                    SyncFailed {
                        pipeline: &name,
                        error: &error,
                    }
                    .log();
                    report.failed.push(name);
                }
                Err(error) => tracing::error!(%error, "Sync task failed"),
            }
        }
        report.synced.sort();
        report.failed.sort();

        self.invalidate(&report.synced).await;
        report
    }
}

async fn clone_or_checkout(
    entry: &WorkspacePipeline,
    dir: &Path,
    context: &WorkspaceContext,
    scm: &dyn SourceControl,
) -> Result<(), SyncError> {
    if dir.is_dir() {
        scm.checkout(dir, &entry.head).await?;
    } else {
        let base = context.scm.as_deref().ok_or_else(|| SyncError::CloneFailed {
            name: entry.name.clone(),
        })?;
        let mut cloned = false;
        for organization in &context.organizations {
            let url = clone_url(base, organization, &entry.name);
            match scm.clone_repo(&url, dir, &entry.head).await {
                Ok(()) => {
                    tracing::info!(pipeline = %entry.name, %url, "Cloned");
                    cloned = true;
                    break;
                }
                Err(error) => tracing::debug!(pipeline = %entry.name, %url, %error, "Clone attempt failed"),
            }
        }
        if !cloned {
            return Err(SyncError::CloneFailed {
                name: entry.name.clone(),
            });
        }
    }

    if !entry.external && find_definition(dir, PIPELINE_FILE_NAME).is_none() {
        return Err(ConfigError::NotFound(dir.join(PIPELINE_FILE_NAME)).into());
    }
    Ok(())
}

async fn checkout_and_pull(
    entry: &WorkspacePipeline,
    dir: &Path,
    scm: &dyn SourceControl,
    options: &SyncOptions,
) -> Result<(), SyncError> {
    scm.checkout(dir, &entry.head).await?;
    if options.no_code_sync {
        return Ok(());
    }
    let label = format!("pull {}", entry.name);
    let head = entry.head.as_str();
    options.retry.run(&label, move |_| scm.pull(dir, head)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Surrounding;
    use crate::backends::stub::{scripted_factory, CallLog, ScriptedBackend, StubScm};
    use crate::workspace::WorkspaceOptions;
    use tempfile::TempDir;

    const PIPELINE_YAML: &str =
        "name: api\npipeline:\n  - build:\n      backend: fake\n      surroundings: [workspace]\n";

    fn workspace(root: &Path, scm: StubScm, log: &CallLog) -> Workspace {
        std::fs::write(
            root.join("workspace.yml"),
            "name: ws\nscm: https://git.example.com\norganizations: [missing, platform]\nworkspace:\n  - lib\n  - api:\n      needs: [lib]\n",
        )
        .unwrap();
        std::fs::create_dir_all(root.join("lib")).unwrap();
        std::fs::write(root.join("lib/pipeline.yml"), PIPELINE_YAML.replace("api", "lib")).unwrap();
        let options = WorkspaceOptions {
            working_dir: None,
            surrounding: Some(Surrounding::Workspace),
        };
        let factory = scripted_factory(vec![ScriptedBackend::new("fake", log)]);
        Workspace::open(root, options, factory, Arc::new(scm)).unwrap()
    }

    fn immediate() -> SyncOptions {
        SyncOptions {
            retry: RetryPolicy::immediate(2),
            parallel_jobs: 2,
            ..SyncOptions::default()
        }
    }

    #[tokio::test]
    async fn test_sync_clones_from_first_matching_organization() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let scm = StubScm::new(&log).cloneable("git@git.example.com:platform/api", PIPELINE_YAML);
        let workspace = workspace(dir.path(), scm, &log);

        assert_eq!(
            workspace.resolve(false, 2).await.status_of("api"),
            Some(PipelineStatus::Unresolved)
        );

        let report = workspace.sync(&immediate()).await;

        assert_eq!(report.synced, vec!["api"]);
        assert_eq!(report.result(), ResultCode::Success);
        assert_eq!(
            log.with_prefix("clone:"),
            vec![
                "clone:git@git.example.com:missing/api",
                "clone:git@git.example.com:platform/api"
            ]
        );
        assert_eq!(
            workspace.resolve(false, 2).await.status_of("api"),
            Some(PipelineStatus::Synced)
        );
    }

    #[tokio::test]
    async fn test_sync_reports_uncloneable_entry() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let workspace = workspace(dir.path(), StubScm::new(&log), &log);

        let report = workspace.sync(&immediate()).await;

        assert_eq!(report.failed, vec!["api"]);
        assert_eq!(report.result(), ResultCode::Failure);
    }

    #[tokio::test]
    async fn test_sync_fixes_branch_and_pulls_with_retry() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let scm = StubScm::new(&log)
            .cloneable("git@git.example.com:platform/api", PIPELINE_YAML)
            .with_head("lib", "develop")
            .failing_pulls(1);
        let workspace = workspace(dir.path(), scm, &log);

        assert_eq!(
            workspace.resolve(true, 2).await.status_of("lib"),
            Some(PipelineStatus::Unsynced)
        );

        let report = workspace.sync(&immediate()).await;

        assert!(report.failed.is_empty(), "failed: {:?}", report.failed);
        assert_eq!(log.count("checkout:lib:master"), 1);
        assert_eq!(log.count("pull:lib"), 2);
        assert_eq!(
            workspace.resolve(false, 2).await.status_of("lib"),
            Some(PipelineStatus::Synced)
        );
    }

    #[tokio::test]
    async fn test_no_code_sync_skips_pull() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let scm = StubScm::new(&log)
            .cloneable("git@git.example.com:platform/api", PIPELINE_YAML)
            .out_of_sync("lib");
        let workspace = workspace(dir.path(), scm, &log);

        let options = SyncOptions {
            no_code_sync: true,
            ..immediate()
        };
        workspace.sync(&options).await;

        assert_eq!(log.count("checkout:lib:master"), 1);
        assert!(log.with_prefix("pull:").is_empty());
    }
}
