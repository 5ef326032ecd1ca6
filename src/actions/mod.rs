// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed vocabulary shared by pipelines, backends and the scheduler.
//!
//! * [`ActionType`] - what kind of work an action performs
//! * [`Surrounding`] - the environment an action is allowed to run in
//! * [`PipelineAction`] - one declared step of a pipeline
//! * [`ActionResult`] / [`ResultCode`] - what a backend reports back

mod action_type;
mod pipeline_action;
mod result;
mod surrounding;

pub use action_type::ActionType;
pub use pipeline_action::PipelineAction;
pub use result::{ActionResult, ResultCode};
pub use surrounding::Surrounding;
