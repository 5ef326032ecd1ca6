// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::config::consts::KEY_ATTRIBUTES;
use crate::errors::StoreError;
use crate::observability::messages::store::StoreLoadFailed;
use crate::observability::messages::StructuredLog;
use crate::store::Store;

/// Composite key of a backend attribute: optional tag (usually a pipeline
/// name), owning backend, and the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub backend: String,
    pub key: String,
}

impl AttributeKey {
    pub fn new(backend: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            tag: None,
            backend: backend.into(),
            key: key.into(),
        }
    }

    pub fn tagged(tag: impl Into<String>, backend: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            backend: backend.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            write!(f, "{}.", tag)?;
        }
        write!(f, "{}.{}", self.backend, self.key)
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedAttribute {
    #[serde(flatten)]
    key: AttributeKey,
    value: Value,
}

/// Values backends share with each other, persisted unless excluded.
///
/// Handles are process-local objects (clients, connections) that are never
/// written to disk.
pub struct AttributeStore {
    values: BTreeMap<AttributeKey, Value>,
    excluded: BTreeSet<AttributeKey>,
    handles: HashMap<AttributeKey, Arc<dyn Any + Send + Sync>>,
    store: Store,
}

impl AttributeStore {
    pub fn open(store: Store) -> Self {
        let values = match store.get_as::<Vec<PersistedAttribute>>(KEY_ATTRIBUTES) {
            Ok(persisted) => persisted
                .unwrap_or_default()
                .into_iter()
                .map(|attr| (attr.key, attr.value))
                .collect(),
            Err(error) => {
                StoreLoadFailed {
                    tag: store.tag(),
                    path: store.path(),
                    error: &error,
                    quarantined_to: None,
                }
                .log();
                BTreeMap::new()
            }
        };
        Self {
            values,
            excluded: BTreeSet::new(),
            handles: HashMap::new(),
            store,
        }
    }

    /// Set a value. Unless `exclude` is set, every persisted attribute is
    /// written back to the store and flushed.
    pub fn insert(&mut self, key: AttributeKey, value: Value, exclude: bool) -> Result<(), StoreError> {
        self.values.insert(key.clone(), value);
        if exclude {
            self.excluded.insert(key);
            Ok(())
        } else {
            self.excluded.remove(&key);
            self.persist()
        }
    }

    pub fn get(&self, key: &AttributeKey) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &AttributeKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert_handle(&mut self, key: AttributeKey, handle: Arc<dyn Any + Send + Sync>) {
        self.handles.insert(key, handle);
    }

    pub fn handle(&self, key: &AttributeKey) -> Option<Arc<dyn Any + Send + Sync>> {
        self.handles.get(key).cloned()
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let persisted: Vec<PersistedAttribute> = self
            .values
            .iter()
            .filter(|(key, _)| !self.excluded.contains(*key))
            .map(|(key, value)| PersistedAttribute {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        self.store.commit_as(KEY_ATTRIBUTES, &persisted, true)
    }
}
