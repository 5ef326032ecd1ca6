// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::actions::PipelineAction;
use crate::config::consts::{KEY_DIRTY, KEY_DISABLED_STEPS, KEY_STATS, KEY_STEP};
use crate::errors::StoreError;
use crate::observability::messages::pipeline::StepMoved;
use crate::observability::messages::StructuredLog;
use crate::pipeline::{PipelineContext, PipelineStats};
use crate::store::Store;

/// A persisted filter suppressing an action for some backend or command.
///
/// `backend` and `command` are wildcards when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledStep {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl DisabledStep {
    /// Backend and command only constrain when both sides carry one.
    pub fn matches(&self, action: &str, backend: Option<&str>, command: Option<&str>) -> bool {
        fn scoped(entry: Option<&str>, query: Option<&str>) -> bool {
            match (entry, query) {
                (Some(entry), Some(query)) => entry == query,
                _ => true,
            }
        }
        self.action == action
            && scoped(self.backend.as_deref(), backend)
            && scoped(self.command.as_deref(), command)
    }
}

/// Step pointer, failed flag and disabled steps of one pipeline.
///
/// `step` ranges over `0..=len`; `len` is terminal. Every pointer move is
/// flushed to disk so an interrupted run resumes at the first action that
/// did not complete.
#[derive(Debug)]
pub struct PipelineState {
    name: String,
    store: Store,
    matching: Vec<bool>,
    step: usize,
    dirty: bool,
    disabled: Vec<DisabledStep>,
}

impl PipelineState {
    pub fn load(context: &PipelineContext, actions: &[PipelineAction]) -> Result<Self, StoreError> {
        let store = Store::open(&context.working_dir, &context.store_prefix(), context.name.clone());
        let matching = actions
            .iter()
            .map(|action| action.runs_in(context.surrounding))
            .collect();
        Self::from_store(context.name.clone(), store, matching)
    }

    fn from_store(name: String, store: Store, matching: Vec<bool>) -> Result<Self, StoreError> {
        let len = matching.len();
        let mut state = Self {
            name,
            step: store.get_as::<usize>(KEY_STEP)?.unwrap_or(0).min(len),
            dirty: store.get_as::<bool>(KEY_DIRTY)?.unwrap_or(false),
            disabled: store.get_as(KEY_DISABLED_STEPS)?.unwrap_or_default(),
            store,
            matching,
        };
        if !state.store.contains(KEY_DIRTY) {
            state.skip_to_first_match();
        }
        Ok(state)
    }

    /// A state that was never run starts on its first matching action.
    fn skip_to_first_match(&mut self) {
        while self.step + 1 < self.len() && !self.matching[self.step] {
            self.step += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.matching.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matching.is_empty()
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_terminal(&self) -> bool {
        self.step >= self.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Index of the current action, if it runs in this surrounding.
    pub fn current(&self) -> Option<usize> {
        (self.step < self.len() && self.matching[self.step]).then_some(self.step)
    }

    /// Move forward past actions that do not run here, and persist.
    pub fn advance(&mut self) -> Result<usize, StoreError> {
        let from = self.step;
        if self.step < self.len() {
            self.step += 1;
            while self.step < self.len() && !self.matching[self.step] {
                self.step += 1;
            }
        }
        self.persist_step(from)
    }

    /// Move backward past actions that do not run here, clamped at 0, and persist.
    pub fn retreat(&mut self) -> Result<usize, StoreError> {
        let from = self.step;
        if self.step > 0 {
            self.step -= 1;
            while self.step > 0 && !self.matching[self.step] {
                self.step -= 1;
            }
        }
        self.persist_step(from)
    }

    fn persist_step(&mut self, from: usize) -> Result<usize, StoreError> {
        StepMoved {
            pipeline: &self.name,
            from,
            to: self.step,
        }
        .log();
        self.store.commit(KEY_STEP, json!(self.step), true)?;
        Ok(self.step)
    }

    /// Mark failed. Not flushed; callers flush once they stop.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        if let Err(error) = self.store.commit(KEY_DIRTY, json!(true), false) {
            tracing::warn!(pipeline = %self.name, error = %error, "could not record failure");
        }
    }

    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.store.flush()
    }

    /// Wipe everything: pointer back to the start, not failed, no disabled steps.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.store.reset()?;
        self.step = 0;
        self.dirty = false;
        self.disabled.clear();
        self.skip_to_first_match();
        Ok(())
    }

    pub fn disabled_steps(&self) -> &[DisabledStep] {
        &self.disabled
    }

    pub fn is_disabled(&self, action: &str, backend: Option<&str>, command: Option<&str>) -> bool {
        self.disabled
            .iter()
            .any(|step| step.matches(action, backend, command))
    }

    /// Add a filter unless the same one is already present. Returns whether one was added.
    pub fn disable(
        &mut self,
        action: &str,
        backend: Option<&str>,
        command: Option<&str>,
    ) -> Result<bool, StoreError> {
        let present = self.disabled.iter().any(|step| {
            step.action == action
                && step.backend.as_deref() == backend
                && step.command.as_deref() == command
        });
        if present {
            return Ok(false);
        }
        self.disabled.push(DisabledStep {
            action: action.to_string(),
            backend: backend.map(str::to_string),
            command: command.map(str::to_string),
        });
        self.store.commit_as(KEY_DISABLED_STEPS, &self.disabled, true)?;
        Ok(true)
    }

    /// Remove the first matching filter. Returns whether one was removed.
    pub fn enable(
        &mut self,
        action: &str,
        backend: Option<&str>,
        command: Option<&str>,
    ) -> Result<bool, StoreError> {
        let Some(position) = self
            .disabled
            .iter()
            .position(|step| step.matches(action, backend, command))
        else {
            return Ok(false);
        };
        self.disabled.remove(position);
        self.store.commit_as(KEY_DISABLED_STEPS, &self.disabled, true)?;
        Ok(true)
    }

    pub fn stats(&self) -> Result<Option<PipelineStats>, StoreError> {
        self.store.get_as(KEY_STATS)
    }

    pub fn set_stats(&mut self, stats: &PipelineStats) -> Result<(), StoreError> {
        self.store.commit_as(KEY_STATS, stats, false)
    }
}
