// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging throughout the conveyor. Message types follow a struct-based pattern
//! with `Display` trait implementation to:
//!
//! * Keep log wording out of the orchestration code
//! * Provide consistent, structured logging output
//! * Attach machine-readable fields to every event
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::store` - durable store load, quarantine and flush events
//! * `messages::backend` - backend lifecycle and action dispatch events
//! * `messages::pipeline` - step pointer movement and pipeline execution events
//! * `messages::workspace` - resolution, scheduling and sync events
//!
//! # Usage
//!
//! ```rust
//! use the_conveyor::observability::messages::pipeline::PipelineStarted;
//! use the_conveyor::observability::messages::StructuredLog;
//!
//! let msg = PipelineStarted {
//!     pipeline: "lib",
//!     step: 0,
//!     total_steps: 3,
//! };
//!
//! msg.log();
//! ```

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects between `info` and `debug`.
/// Calling this twice is harmless, the second install is ignored.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
