// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating or parsing pipeline and workspace definitions.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("definition not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path} is missing required key '{key}'")]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("pipeline '{pipeline}' declares unknown action '{action}'")]
    UnknownActionType { pipeline: String, action: String },

    #[error("pipeline '{pipeline}' action '{action}' must name at least one backend")]
    NoBackends { pipeline: String, action: String },

    #[error("pipeline '{pipeline}' action '{action}' must declare at least one surrounding")]
    NoSurroundings { pipeline: String, action: String },

    #[error("pipeline '{pipeline}' references unknown backend '{backend}'")]
    UnknownBackend { pipeline: String, backend: String },

    #[error("invalid definition in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
