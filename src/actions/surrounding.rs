// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution environment an action may run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Surrounding {
    /// A CI server
    #[serde(alias = "jenkins")]
    Ci,
    /// An interactive developer machine
    Local,
    /// Only when explicitly asked for by action type or name
    OnDemand,
    /// Driven by a workspace run
    Workspace,
}

impl Surrounding {
    /// Detect the surrounding from the process environment.
    ///
    /// A CI server wins; otherwise a lone pipeline runs `Local` and a
    /// workspace-driven one runs `Workspace`.
    pub fn detect(singular: bool) -> Self {
        let on_jenkins = std::env::var_os("JENKINS_HOME").is_some()
            && std::env::var_os("JENKINS_URL").is_some();
        let on_ci = std::env::var("CI").map(|v| v == "true" || v == "1").unwrap_or(false);
        if on_jenkins || on_ci {
            Surrounding::Ci
        } else if singular {
            Surrounding::Local
        } else {
            Surrounding::Workspace
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Surrounding::Ci => "ci",
            Surrounding::Local => "local",
            Surrounding::OnDemand => "on-demand",
            Surrounding::Workspace => "workspace",
        }
    }
}

impl fmt::Display for Surrounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
