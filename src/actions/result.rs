// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::actions::ActionType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Outcome of an action, a pipeline, or a whole scheduled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Success,
    Failure,
    PartialSuccess,
    ActionDoesNotExist,
}

impl ResultCode {
    /// Stable numeric value of the code.
    pub fn code(&self) -> u8 {
        match self {
            ResultCode::Success => 0,
            ResultCode::Failure => 1,
            ResultCode::PartialSuccess => 2,
            ResultCode::ActionDoesNotExist => 3,
        }
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            ResultCode::Success => 0,
            ResultCode::Failure | ResultCode::ActionDoesNotExist => 1,
            ResultCode::PartialSuccess => 2,
        }
    }

    /// `SUCCESS` and `PARTIAL_SUCCESS` both let dependents proceed.
    pub fn is_success_like(&self) -> bool {
        matches!(self, ResultCode::Success | ResultCode::PartialSuccess)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultCode::Success => "SUCCESS",
            ResultCode::Failure => "FAILURE",
            ResultCode::PartialSuccess => "PARTIAL_SUCCESS",
            ResultCode::ActionDoesNotExist => "ACTION_DOES_NOT_EXIST",
        };
        f.write_str(name)
    }
}

/// What a backend reports after executing an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_type: Option<ActionType>,
    pub result: Vec<Value>,
    pub result_code: ResultCode,
}

impl ActionResult {
    pub fn new(action_type: ActionType, result_code: ResultCode, result: Vec<Value>) -> Self {
        Self {
            action_type: Some(action_type),
            result,
            result_code,
        }
    }

    pub fn success(action_type: ActionType) -> Self {
        Self::new(action_type, ResultCode::Success, Vec::new())
    }

    pub fn failure(action_type: ActionType, message: impl Into<String>) -> Self {
        Self::new(
            action_type,
            ResultCode::Failure,
            vec![Value::String(message.into())],
        )
    }

    /// Synthesized when a backend does not declare the requested action type.
    pub fn does_not_exist(action_type: ActionType, backend: &str) -> Self {
        Self::new(
            action_type,
            ResultCode::ActionDoesNotExist,
            vec![Value::String(format!("Action does not exist for {}", backend))],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let cases = [
            (ResultCode::Success, 0),
            (ResultCode::Failure, 1),
            (ResultCode::PartialSuccess, 2),
            (ResultCode::ActionDoesNotExist, 1),
        ];
        for (code, expected) in cases {
            assert_eq!(code.exit_code(), expected, "exit code for {}", code);
        }
    }

    #[test]
    fn test_does_not_exist_message() {
        let result = ActionResult::does_not_exist(ActionType::Deploy, "docker");
        assert_eq!(result.result_code, ResultCode::ActionDoesNotExist);
        assert_eq!(result.result, vec![Value::String("Action does not exist for docker".into())]);
    }
}
