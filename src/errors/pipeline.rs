// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{ConfigError, DispatchError, StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a pipeline operation outright.
///
/// Action outcomes (FAILURE, PARTIAL_SUCCESS, ...) are not errors; they come
/// back as a `ResultCode`. These variants cover the machinery around them.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The pipeline definition could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Working directory could not be created or removed.
    #[error("pipeline [{pipeline}] I/O error on {path}: {source}")]
    Io {
        pipeline: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
