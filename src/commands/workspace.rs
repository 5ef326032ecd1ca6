// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use clap::{Args, Subcommand};
use std::collections::BTreeMap;
use the_conveyor::actions::ResultCode;
use the_conveyor::config::consts::{default_parallelism, DEFAULT_RETRY_COUNT};
use the_conveyor::workspace::{
    PipelineStatus, RetryPolicy, ScheduleOptions, ScheduleReport, SyncOptions, WorkspaceState,
};

use super::{print_json, Target};

/// Selection and pool options shared by the scheduling commands.
#[derive(Args)]
pub struct ScheduleArgs {
    /// Pipeline names or group paths; all pipelines when omitted
    filters: Vec<String>,
    /// Parallel jobs
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
    /// Also select the needs of selected pipelines
    #[arg(short, long)]
    recursive: bool,
    /// Attempts per pipeline
    #[arg(long, default_value_t = DEFAULT_RETRY_COUNT)]
    retries: u32,
}

impl ScheduleArgs {
    fn options(self) -> ScheduleOptions {
        ScheduleOptions {
            filters: self.filters,
            parallel_jobs: self.jobs.unwrap_or_else(default_parallelism),
            retry: RetryPolicy::immediate(self.retries),
            recursive: self.recursive,
        }
    }
}

#[derive(Subcommand)]
pub enum WorkspaceSubcommand {
    /// Run pipelines in dependency order
    Execute {
        #[command(flatten)]
        schedule: ScheduleArgs,
        #[arg(long)]
        reset_cache: bool,
    },
    /// Clean pipelines
    Clean {
        #[command(flatten)]
        schedule: ScheduleArgs,
        #[arg(long)]
        reset_cache: bool,
        #[arg(long)]
        rm_working_dir: bool,
    },
    /// Run one action type or name across pipelines
    ExecuteAction {
        action: String,
        #[command(flatten)]
        schedule: ScheduleArgs,
    },
    /// Clean one action type or name across pipelines
    CleanAction {
        action: String,
        #[command(flatten)]
        schedule: ScheduleArgs,
    },
    /// Show the status of every pipeline
    State {
        /// Skip the upstream comparison
        #[arg(long)]
        quick: bool,
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
    },
    /// Clone, check out and pull pipelines
    Sync {
        /// Fix branches without pulling
        #[arg(long)]
        no_code_sync: bool,
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
    },
    /// Print groups, execution order and stats as JSON
    Describe,
}

pub async fn run(target: &Target, subcmd: WorkspaceSubcommand) -> anyhow::Result<ResultCode> {
    let workspace = target.open_workspace()?;

    let code = match subcmd {
        WorkspaceSubcommand::Execute { schedule, reset_cache } => {
            report(workspace.execute_pipelines(reset_cache, &schedule.options()).await?)
        }
        WorkspaceSubcommand::Clean {
            schedule,
            reset_cache,
            rm_working_dir,
        } => report(
            workspace
                .clean_pipelines(reset_cache, rm_working_dir, &schedule.options())
                .await?,
        ),
        WorkspaceSubcommand::ExecuteAction { action, schedule } => {
            report(workspace.execute_pipelines_action(&action, &schedule.options()).await?)
        }
        WorkspaceSubcommand::CleanAction { action, schedule } => {
            report(workspace.clean_pipelines_action(&action, &schedule.options()).await?)
        }
        WorkspaceSubcommand::State { quick, jobs } => {
            let state = workspace.resolve(quick, jobs.unwrap_or_else(default_parallelism)).await;
            print_state(&state);
            ResultCode::Success
        }
        WorkspaceSubcommand::Sync { no_code_sync, jobs } => {
            let options = SyncOptions {
                no_code_sync,
                parallel_jobs: jobs.unwrap_or_else(default_parallelism),
                ..SyncOptions::default()
            };
            let report = workspace.sync(&options).await;
            if !report.failed.is_empty() {
                eprintln!("failed to sync: {}", report.failed.join(", "));
            }
            report.result()
        }
        WorkspaceSubcommand::Describe => {
            print_json(&workspace.describe()?)?;
            ResultCode::Success
        }
    };

    workspace.registry().cleanup_backends().await;
    Ok(code)
}

fn report(report: ScheduleReport) -> ResultCode {
    if !report.failed.is_empty() {
        eprintln!("failed: {}", report.failed.join(", "));
    }
    if !report.not_run.is_empty() {
        eprintln!("not run: {}", report.not_run.join(", "));
    }
    report.result
}

fn print_state(state: &WorkspaceState) {
    let statuses = [
        PipelineStatus::Synced,
        PipelineStatus::Completed,
        PipelineStatus::Failed,
        PipelineStatus::Unsynced,
        PipelineStatus::ReadOnly,
        PipelineStatus::Unresolved,
    ];
    for status in statuses {
        let mut by_group: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for entry in state.entries(status) {
            by_group.entry(entry.path.as_str()).or_default().push(entry.name.as_str());
        }
        if by_group.is_empty() {
            continue;
        }
        println!("{:?}:", status);
        for (group, names) in by_group {
            let group = if group.is_empty() { "." } else { group };
            println!("  {}: {}", group, names.join(", "));
        }
    }
}
