// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Source control seam used by workspace resolution and sync.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::errors::SyncError;

/// Git-like operations on a pipeline checkout.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Branch currently checked out, if it can be determined.
    async fn head_branch(&self, dir: &Path) -> Result<Option<String>, SyncError>;

    /// True when `branch` is neither behind nor ahead of its upstream.
    async fn is_in_sync(&self, dir: &Path, branch: &str) -> Result<bool, SyncError>;

    async fn checkout(&self, dir: &Path, branch: &str) -> Result<(), SyncError>;

    async fn pull(&self, dir: &Path, branch: &str) -> Result<(), SyncError>;

    /// Clone `url` into `dir` with `branch` checked out.
    async fn clone_repo(&self, url: &str, dir: &Path, branch: &str) -> Result<(), SyncError>;
}

/// SSH clone URL for a repository under an organization.
///
/// ```
/// use the_conveyor::workspace::scm::clone_url;
///
/// assert_eq!(
///     clone_url("https://git.example.com", "platform", "lib"),
///     "git@git.example.com:platform/lib"
/// );
/// ```
pub fn clone_url(scm: &str, organization: &str, name: &str) -> String {
    let host = scm
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("git@{}:{}/{}", host, organization, name)
}

/// `git` on the PATH.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    async fn git(&self, dir: &Path, operation: &'static str, args: &[&str]) -> Result<String, SyncError> {
        tracing::debug!(path = %dir.display(), ?args, "git");
        let output = Command::new("git").args(args).current_dir(dir).output().await?;
        if !output.status.success() {
            return Err(SyncError::Command {
                operation,
                path: dir.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn head_branch(&self, dir: &Path) -> Result<Option<String>, SyncError> {
        let branch = self
            .git(dir, "rev-parse", &["rev-parse", "--abbrev-ref", "HEAD"])
            .await
            .ok()
            .filter(|b| !b.is_empty() && b != "HEAD");
        // Detached checkouts on CI servers expose the branch through the environment
        Ok(branch.or_else(|| std::env::var("BRANCH_NAME").ok()))
    }

    async fn is_in_sync(&self, dir: &Path, branch: &str) -> Result<bool, SyncError> {
        self.git(dir, "fetch", &["fetch", "origin", branch]).await?;
        let upstream = format!("origin/{}", branch);
        let behind = self
            .git(dir, "rev-list", &["rev-list", "--count", &format!("{}..{}", branch, upstream)])
            .await?;
        let ahead = self
            .git(dir, "rev-list", &["rev-list", "--count", &format!("{}..{}", upstream, branch)])
            .await?;
        Ok(behind == "0" && ahead == "0")
    }

    async fn checkout(&self, dir: &Path, branch: &str) -> Result<(), SyncError> {
        self.git(dir, "checkout", &["checkout", branch]).await.map(|_| ())
    }

    async fn pull(&self, dir: &Path, branch: &str) -> Result<(), SyncError> {
        self.git(dir, "pull", &["pull", "origin", branch]).await.map(|_| ())
    }

    async fn clone_repo(&self, url: &str, dir: &Path, branch: &str) -> Result<(), SyncError> {
        let parent = dir.parent().unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(parent).await?;
        let target = dir.display().to_string();
        self.git(parent, "clone", &["clone", "--branch", branch, url, &target])
            .await
            .map(|_| ())
    }
}
