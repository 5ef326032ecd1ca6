// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Durable key-value store.
//!
//! One JSON document per owner, kept at `<base_dir>/.cache/.<prefix>.db`.
//! Writes land in memory first and reach disk on `flush`, on a `commit`
//! with `flush = true`, or when a dirty store is dropped. Disk writes go
//! through a temp file in the same directory and are renamed into place, so a
//! crash never leaves a half-written document behind.
//!
//! A document that fails to decode is moved aside to `<file>.corrupt` and the
//! store starts empty.

use crate::config::consts::{STORE_DIR, STORE_QUARANTINE_EXTENSION};
use crate::errors::StoreError;
use crate::observability::messages::store::{StoreFlushFailed, StoreLoadFailed, StoreReset};
use crate::observability::messages::StructuredLog;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    tag: String,
    data: BTreeMap<String, Value>,
    dirty: bool,
}

impl Store {
    /// Open the store for `prefix` below `base_dir`, loading any existing document.
    pub fn open(base_dir: &Path, prefix: &str, tag: impl Into<String>) -> Self {
        let path = base_dir.join(STORE_DIR).join(format!(".{}.db", prefix));
        let mut store = Self {
            path,
            tag: tag.into(),
            data: BTreeMap::new(),
            dirty: false,
        };
        store.reload();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Typed read. `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.data.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    tag: self.tag.clone(),
                    key: key.to_string(),
                    source,
                }),
        }
    }

    /// In-memory write. Leaves the dirty flag alone, so it is not persisted on drop.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Write a value, mark the store dirty and optionally flush right away.
    pub fn commit(&mut self, key: impl Into<String>, value: Value, flush: bool) -> Result<(), StoreError> {
        self.set(key, value);
        self.dirty = true;
        if flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Serialize `value` and commit it.
    pub fn commit_as<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
        flush: bool,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Encode {
            tag: self.tag.clone(),
            source,
        })?;
        self.commit(key, value, flush)
    }

    /// Persist the whole map atomically and clear the dirty flag.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(&self.data).map_err(|source| StoreError::Encode {
            tag: self.tag.clone(),
            source,
        })?;
        self.atomic_write(&encoded)?;
        self.dirty = false;
        Ok(())
    }

    /// Delete the file and clear memory. The store stays dirty, so the next
    /// flush (or drop) writes an empty document.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        StoreReset { tag: &self.tag }.log();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Io {
                    tag: self.tag.clone(),
                    path: self.path.clone(),
                    source,
                })
            }
        }
        self.data.clear();
        self.dirty = true;
        Ok(())
    }

    /// Replace memory with what is on disk. Unreadable or undecodable
    /// documents are quarantined and the store starts empty.
    pub fn reload(&mut self) {
        self.data.clear();
        self.dirty = false;
        if !self.path.exists() {
            return;
        }

        let loaded = std::fs::read(&self.path)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            .and_then(|bytes| {
                serde_json::from_slice::<BTreeMap<String, Value>>(&bytes)
                    .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            });

        match loaded {
            Ok(data) => self.data = data,
            Err(error) => {
                let quarantine = self.quarantine_path();
                let moved = std::fs::rename(&self.path, &quarantine).is_ok();
                StoreLoadFailed {
                    tag: &self.tag,
                    path: &self.path,
                    error: error.as_ref(),
                    quarantined_to: moved.then_some(quarantine.as_path()),
                }
                .log();
            }
        }
    }

    fn quarantine_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(STORE_QUARANTINE_EXTENSION);
        PathBuf::from(name)
    }

    fn atomic_write(&self, data: &[u8]) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            tag: self.tag.clone(),
            path: self.path.clone(),
            source,
        };
        let dir = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(data).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if !self.dirty {
            return;
        }
        if let Err(error) = self.flush() {
            StoreFlushFailed {
                tag: &self.tag,
                error: &error,
            }
            .log();
        }
    }
}
