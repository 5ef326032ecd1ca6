// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-pipeline step state machine.
//!
//! A [`Pipeline`] walks its declared actions in order, dispatching each one
//! to every backend it names through the
//! [`BackendRegistry`](crate::backends::BackendRegistry). Progress lives in a
//! [`PipelineState`] backed by the durable store, so a run interrupted at any
//! point resumes at the first action that did not complete.

mod context;
mod runner;
mod state;

pub use context::{PipelineContext, PipelineStats};
pub use runner::{FilterCommand, Pipeline, PipelineDescription};
pub use state::{DisabledStep, PipelineState};
