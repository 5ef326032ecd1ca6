// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line, and most
//! implement [`StructuredLog`] so the event carries its fields as structured
//! `tracing` data at the right level.
//!
//! # Organization
//!
//! * `store` - durable store events
//! * `backend` - backend lifecycle and action dispatch
//! * `pipeline` - step pointer and pipeline execution
//! * `workspace` - resolution, scheduling and sync
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_conveyor::observability::messages::workspace::SchedulingStarted;
//!
//! let msg = SchedulingStarted {
//!     parallel_jobs: 4,
//!     candidates: 12,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

pub mod backend;
pub mod pipeline;
pub mod store;
pub mod workspace;

use tracing::Span;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog {
    /// Emit the message at its level with structured fields attached.
    fn log(&self);

    /// Build a span carrying the same fields, for wrapping longer operations.
    fn span(&self, name: &str) -> Span;
}
