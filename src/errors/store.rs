// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the durable store.
///
/// Decoding problems on reload are not errors: the store quarantines the file
/// and starts empty. These variants cover writes and typed reads.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure on the store file or its directory.
    #[error("store [{tag}] I/O error on {path}: {source}")]
    Io {
        tag: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory map could not be encoded.
    #[error("store [{tag}] could not encode contents: {source}")]
    Encode {
        tag: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value did not match the requested type.
    #[error("store [{tag}] value under '{key}' has an unexpected shape: {source}")]
    Decode {
        tag: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
