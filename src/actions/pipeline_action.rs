// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::actions::{ActionType, Surrounding};
use serde::{Deserialize, Serialize};

/// One declared step of a pipeline. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineAction {
    pub action_type: ActionType,
    pub backends: Vec<String>,
    pub surroundings: Vec<Surrounding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
}

impl PipelineAction {
    pub fn new(action_type: ActionType, backends: &[&str], surroundings: &[Surrounding]) -> Self {
        Self {
            action_type,
            backends: backends.iter().map(|b| b.to_string()).collect(),
            surroundings: surroundings.to_vec(),
            action_name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.action_name = Some(name.into());
        self
    }

    /// True when the action is declared for `surrounding`.
    pub fn runs_in(&self, surrounding: Surrounding) -> bool {
        self.surroundings.contains(&surrounding)
    }

    /// Targeted runs also accept actions reserved for on-demand use.
    pub fn runs_on_demand(&self, surrounding: Surrounding) -> bool {
        self.runs_in(surrounding) || self.runs_in(Surrounding::OnDemand)
    }

    /// Match by action type string or declared action name.
    pub fn matches(&self, type_or_name: &str) -> bool {
        self.action_type.as_str() == type_or_name
            || self.action_name.as_deref() == Some(type_or_name)
    }

    /// Human-readable label, `type` or `type (name)`.
    pub fn label(&self) -> String {
        match &self.action_name {
            Some(name) => format!("{} ({})", self.action_type, name),
            None => self.action_type.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_type_or_name() {
        let action = PipelineAction::new(ActionType::Build, &["make"], &[Surrounding::Local])
            .named("release-build");
        assert!(action.matches("build"));
        assert!(action.matches("release-build"));
        assert!(!action.matches("deploy"));
    }

    #[test]
    fn test_on_demand_widens_surroundings() {
        let action = PipelineAction::new(ActionType::Deploy, &["ansible"], &[Surrounding::OnDemand]);
        assert!(!action.runs_in(Surrounding::Local));
        assert!(action.runs_on_demand(Surrounding::Local));
    }
}
