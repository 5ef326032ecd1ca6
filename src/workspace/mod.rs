// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Multi-pipeline workspaces.
//!
//! A workspace groups pipeline checkouts under one source dir and runs them
//! in dependency order.
//!
//! # Flow
//!
//! ```text
//! resolve (bucket every entry) → select candidates → gate (unresolved, cycle, unmet)
//!     → schedule ready units on a bounded pool → report completed / failed / not run
//! ```
//!
//! * [`Workspace`] - opened from `workspace.yml`, or wrapped around a lone `pipeline.yml`
//! * [`graph`] - dependency graph with cycle detection and topological order
//! * [`scheduler`] - bounded-parallel execution of per-pipeline units
//! * [`sync`] - clone, checkout and pull through a [`scm::SourceControl`] client
//! * [`retry`] - the retry policy shared by scheduling and sync

mod context;
mod entry;
pub mod graph;
pub mod retry;
mod runtime;
pub mod scheduler;
pub mod scm;
pub mod selection;
mod state;
pub mod sync;

pub use context::{WorkspaceContext, WorkspaceStats};
pub use entry::WorkspacePipeline;
pub use graph::{validate_schedule, DependencyGraph};
pub use retry::{Backoff, RetryPolicy};
pub use runtime::{SharedPipeline, Workspace, WorkspaceDescription, WorkspaceOptions};
pub use scheduler::{ScheduleOptions, ScheduleReport, UnitKind};
pub use scm::{GitCli, SourceControl};
pub use state::{classify, PipelineStatus, Probe, WorkspaceState};
pub use sync::{SyncOptions, SyncReport};
