// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;
pub mod pipeline;
pub mod workspace;

use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use the_conveyor::backends::BackendFactory;
use the_conveyor::workspace::{GitCli, Workspace, WorkspaceOptions};

/// Where the command operates.
pub struct Target {
    pub source_dir: PathBuf,
    pub working_dir: Option<PathBuf>,
}

impl Target {
    pub fn open_workspace(&self) -> anyhow::Result<Workspace> {
        let options = WorkspaceOptions {
            working_dir: self.working_dir.clone(),
            surrounding: None,
        };
        Workspace::open(&self.source_dir, options, BackendFactory::with_builtin(), Arc::new(GitCli))
            .with_context(|| format!("could not open {}", self.source_dir.display()))
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
