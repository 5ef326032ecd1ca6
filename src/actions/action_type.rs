// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of work a pipeline action performs.
///
/// Serialized in kebab-case, which is also the spelling used in pipeline
/// definitions and in disabled-step filters (`unit-tests`, `iac-checks`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Source,
    Build,
    UnitTests,
    IntegrationTests,
    E2e,
    LintChecks,
    CodeChecks,
    SecurityChecks,
    IacChecks,
    Package,
    Deploy,
    Destroy,
    Consume,
    Install,
    Download,
    Upload,
    Extract,
    Patch,
    Execute,
    Verify,
    Detect,
    Mirror,
    Activate,
    Play,
    Layer,
}

impl ActionType {
    /// Every action type, in declaration order.
    pub const ALL: [ActionType; 25] = [
        ActionType::Source,
        ActionType::Build,
        ActionType::UnitTests,
        ActionType::IntegrationTests,
        ActionType::E2e,
        ActionType::LintChecks,
        ActionType::CodeChecks,
        ActionType::SecurityChecks,
        ActionType::IacChecks,
        ActionType::Package,
        ActionType::Deploy,
        ActionType::Destroy,
        ActionType::Consume,
        ActionType::Install,
        ActionType::Download,
        ActionType::Upload,
        ActionType::Extract,
        ActionType::Patch,
        ActionType::Execute,
        ActionType::Verify,
        ActionType::Detect,
        ActionType::Mirror,
        ActionType::Activate,
        ActionType::Play,
        ActionType::Layer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Source => "source",
            ActionType::Build => "build",
            ActionType::UnitTests => "unit-tests",
            ActionType::IntegrationTests => "integration-tests",
            ActionType::E2e => "e2e",
            ActionType::LintChecks => "lint-checks",
            ActionType::CodeChecks => "code-checks",
            ActionType::SecurityChecks => "security-checks",
            ActionType::IacChecks => "iac-checks",
            ActionType::Package => "package",
            ActionType::Deploy => "deploy",
            ActionType::Destroy => "destroy",
            ActionType::Consume => "consume",
            ActionType::Install => "install",
            ActionType::Download => "download",
            ActionType::Upload => "upload",
            ActionType::Extract => "extract",
            ActionType::Patch => "patch",
            ActionType::Execute => "execute",
            ActionType::Verify => "verify",
            ActionType::Detect => "detect",
            ActionType::Mirror => "mirror",
            ActionType::Activate => "activate",
            ActionType::Play => "play",
            ActionType::Layer => "layer",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown action type: '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_form_matches_serde() {
        for action_type in ActionType::ALL {
            let json = serde_json::to_string(&action_type).unwrap();
            assert_eq!(json, format!("\"{}\"", action_type.as_str()));
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("unit-tests".parse::<ActionType>(), Ok(ActionType::UnitTests));
        assert_eq!("e2e".parse::<ActionType>(), Ok(ActionType::E2e));
        assert!("compile".parse::<ActionType>().is_err());
    }
}
