// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod dispatch;
mod graph;
mod pipeline;
mod store;
mod workspace;

pub use config::ConfigError;
pub use dispatch::{ActionPhase, DispatchError};
pub use graph::GraphError;
pub use pipeline::PipelineError;
pub use store::StoreError;
pub use workspace::{SchedulerError, SyncError, WorkspaceError};
