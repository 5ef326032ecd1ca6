// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod actions;    // action types, results, surroundings
pub mod backends;   // backend registry, dispatch, built-in backends
pub mod config;     // definitions + loaders
pub mod errors;     // error handling
pub mod observability;
pub mod pipeline;   // per-pipeline step state machine
pub mod store;      // durable key-value store
pub mod traits;     // backend + action abstractions
pub mod workspace;  // multi-pipeline scheduler
