// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use clap::Subcommand;
use the_conveyor::actions::ResultCode;
use the_conveyor::backends::BackendFactory;

use super::{print_json, Target};

#[derive(Subcommand)]
pub enum BackendsSubcommand {
    /// List registered backend names
    List,
    /// Show a backend's supported actions and config model
    Describe { backend: String },
}

pub async fn run(target: &Target, subcmd: BackendsSubcommand) -> anyhow::Result<ResultCode> {
    match subcmd {
        BackendsSubcommand::List => {
            for name in BackendFactory::with_builtin().list_available_backends() {
                println!("{}", name);
            }
            Ok(ResultCode::Success)
        }
        BackendsSubcommand::Describe { backend } => {
            let workspace = target.open_workspace()?;
            let description = workspace.registry().describe_backend(&backend).await?;
            print_json(&description.summary())?;
            workspace.registry().cleanup_backends().await;
            Ok(ResultCode::Success)
        }
    }
}
