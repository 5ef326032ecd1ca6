// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use clap::Subcommand;
use the_conveyor::actions::ResultCode;
use the_conveyor::traits::BackendCredentials;

use super::{print_json, Target};

#[derive(Subcommand)]
pub enum PipelineSubcommand {
    /// Run the pipeline from its current step
    Execute {
        /// Forget persisted progress first
        #[arg(long)]
        reset_cache: bool,
    },
    /// Clean up every action reached so far
    Clean {
        #[arg(long)]
        reset_cache: bool,
        #[arg(long)]
        rm_working_dir: bool,
    },
    /// Run the actions matching a type or name, including on-demand ones
    ExecuteAction { action: String },
    /// Clean up the actions matching a type or name
    CleanAction { action: String },
    /// Move or run the step pointer
    Step {
        #[command(subcommand)]
        subcommand: StepSubcommand,
    },
    /// Skip an action (optionally for one backend or command) in later runs
    DisableStep {
        action: String,
        #[arg(long)]
        backend: Option<String>,
        #[arg(long = "cmd")]
        command: Option<String>,
    },
    /// Undo a matching disable-step
    EnableStep {
        action: String,
        #[arg(long)]
        backend: Option<String>,
        #[arg(long = "cmd")]
        command: Option<String>,
    },
    /// Print context, actions and persisted state as JSON
    Describe,
    /// Print the declared actions, one per line
    DescribeActions,
    /// Hand credentials to a backend
    Authenticate {
        #[arg(long)]
        backend: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "CONVEYOR_SECRET", hide_env_values = true)]
        secret: String,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        certificate: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum StepSubcommand {
    Next,
    Previous,
    Current,
    Execute,
    ExecuteForward,
    Clean,
    CleanBackward,
    Reset,
}

pub async fn run(target: &Target, name: Option<&str>, subcmd: PipelineSubcommand) -> anyhow::Result<ResultCode> {
    let workspace = target.open_workspace()?;
    let registry = workspace.registry().clone();
    let shared = workspace.lone_pipeline(name).await?;
    let mut pipeline = shared.lock().await;

    let code = match subcmd {
        PipelineSubcommand::Execute { reset_cache } => pipeline.run(&registry, reset_cache).await?,
        PipelineSubcommand::Clean {
            reset_cache,
            rm_working_dir,
        } => pipeline.clean(&registry, reset_cache, rm_working_dir).await?,
        PipelineSubcommand::ExecuteAction { action } => pipeline.execute_action(&registry, &action).await?,
        PipelineSubcommand::CleanAction { action } => pipeline.clean_action(&registry, &action).await?,
        PipelineSubcommand::Step { subcommand } => match subcommand {
            StepSubcommand::Next => {
                println!("{}", pipeline.step_next()?);
                ResultCode::Success
            }
            StepSubcommand::Previous => {
                println!("{}", pipeline.step_previous()?);
                ResultCode::Success
            }
            StepSubcommand::Current => {
                match pipeline.current_step() {
                    Some((idx, action)) => println!("{} {}", idx, action.label()),
                    None => println!("done"),
                }
                ResultCode::Success
            }
            StepSubcommand::Execute => pipeline.step_execute(&registry).await?,
            StepSubcommand::ExecuteForward => pipeline.step_execute_forward(&registry).await?,
            StepSubcommand::Clean => pipeline.step_clean(&registry).await?,
            StepSubcommand::CleanBackward => pipeline.step_clean_backward(&registry).await?,
            StepSubcommand::Reset => {
                pipeline.reset()?;
                ResultCode::Success
            }
        },
        PipelineSubcommand::DisableStep {
            action,
            backend,
            command,
        } => {
            if !pipeline.disable_step(&action, backend.as_deref(), command.as_deref())? {
                tracing::info!("[{}] already disabled", action);
            }
            ResultCode::Success
        }
        PipelineSubcommand::EnableStep {
            action,
            backend,
            command,
        } => {
            if !pipeline.enable_step(&action, backend.as_deref(), command.as_deref())? {
                tracing::warn!("[{}] was not disabled", action);
            }
            ResultCode::Success
        }
        PipelineSubcommand::Describe => {
            print_json(&pipeline.describe()?)?;
            ResultCode::Success
        }
        PipelineSubcommand::DescribeActions => {
            for (idx, action) in pipeline.actions().iter().enumerate() {
                let surroundings: Vec<&str> = action.surroundings.iter().map(|s| s.as_str()).collect();
                println!(
                    "{:>3} {} [{}] ({})",
                    idx,
                    action.label(),
                    action.backends.join(", "),
                    surroundings.join(", ")
                );
            }
            ResultCode::Success
        }
        PipelineSubcommand::Authenticate {
            backend,
            username,
            secret,
            target,
            certificate,
        } => {
            let credentials = BackendCredentials {
                username,
                secret,
                target,
                certificate,
            };
            registry
                .authenticate(&backend, &credentials, Some(pipeline.context()))
                .await?
        }
    };

    drop(pipeline);
    registry.cleanup_backends().await;
    Ok(code)
}
