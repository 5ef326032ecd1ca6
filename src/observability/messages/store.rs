// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for durable store events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// A store file existed but could not be decoded.
///
/// # Log Level
/// `warn!` - state was lost, execution continues from empty
///
/// # Example
/// ```
/// use the_conveyor::observability::messages::store::StoreLoadFailed;
/// use std::path::Path;
///
/// let error = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad bytes");
/// let msg = StoreLoadFailed {
///     tag: "lib.pipeline",
///     path: Path::new("build/.cache/.lib.db"),
///     error: &error,
///     quarantined_to: None,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct StoreLoadFailed<'a> {
    pub tag: &'a str,
    pub path: &'a Path,
    pub error: &'a dyn std::error::Error,
    pub quarantined_to: Option<&'a Path>,
}

impl Display for StoreLoadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "[{}] Could not load store file {}: {}",
            self.tag,
            self.path.display(),
            self.error
        )?;
        match self.quarantined_to {
            Some(moved) => write!(f, " (moved to {}, starting empty)", moved.display()),
            None => write!(f, " (starting empty)"),
        }
    }
}

impl StructuredLog for StoreLoadFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            tag = self.tag,
            path = %self.path.display(),
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "store_load_failed",
            span_name = name,
            tag = self.tag,
            path = %self.path.display(),
        )
    }
}

/// Store contents were wiped.
pub struct StoreReset<'a> {
    pub tag: &'a str,
}

impl Display for StoreReset<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Resetting store", self.tag)
    }
}

impl StructuredLog for StoreReset<'_> {
    fn log(&self) {
        tracing::info!(tag = self.tag, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("store_reset", span_name = name, tag = self.tag)
    }
}

/// A dirty store could not be written while being dropped.
///
/// # Log Level
/// `error!` - progress made since the last flush is lost
pub struct StoreFlushFailed<'a> {
    pub tag: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for StoreFlushFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] Failed to flush store: {}", self.tag, self.error)
    }
}

impl StructuredLog for StoreFlushFailed<'_> {
    fn log(&self) {
        tracing::error!(tag = self.tag, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "store_flush_failed",
            span_name = name,
            tag = self.tag,
            error = %self.error,
        )
    }
}
