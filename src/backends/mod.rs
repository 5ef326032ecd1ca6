// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Backend registration, construction and dispatch.
//!
//! A backend is a named tool integration that exposes a set of actions
//! (`prepare` / `execute` / `cleanup`) per [`ActionType`](crate::actions::ActionType).
//!
//! # Architecture
//!
//! ```text
//! BackendFactory (name -> constructor) → BackendRegistry (lazy, once) → Action dispatch
//! ```
//!
//! * [`BackendFactory`] - explicit registration table; [`BackendFactory::with_builtin`]
//!   registers the backends shipped with the crate
//! * [`BackendRegistry`] - constructs each backend at most once, owns the shared
//!   attribute store, and routes action calls, wrapping every error in a
//!   [`DispatchError`](crate::errors::DispatchError)
//! * [`command`] - built-in backend running configured shell commands
//!
//! ## Stub Backend (Test-Only)
//! `stub` provides scripted backends and a scripted source control client
//! for unit tests. It is not compiled into release builds.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use the_conveyor::actions::Surrounding;
//! use the_conveyor::backends::{BackendFactory, BackendRegistry};
//! use the_conveyor::workspace::WorkspaceContext;
//!
//! # async fn demo() -> Result<(), the_conveyor::errors::DispatchError> {
//! let workspace = WorkspaceContext::new("ws", ".", "build", Surrounding::Local);
//! let registry = BackendRegistry::new(BackendFactory::with_builtin(), Arc::new(workspace));
//! let description = registry.describe_backend("command").await?;
//! println!("{:?}", description.summary());
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod command;
pub mod factory;
pub mod registry;
#[cfg(test)]
pub mod stub;

pub use attributes::AttributeKey;
pub use factory::BackendFactory;
pub use registry::BackendRegistry;
