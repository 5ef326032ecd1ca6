// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod consts;
pub mod loader;

pub use loader::{
    find_definition, load_pipeline_definition, load_workspace_definition, PipelineDefinition,
    WorkspaceDefinition,
};
