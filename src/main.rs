// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod commands;

use clap::{Parser, Subcommand};
use commands::{backends::BackendsSubcommand, pipeline::PipelineSubcommand, workspace::WorkspaceSubcommand};
use std::path::PathBuf;
use the_conveyor::observability::init_tracing;

#[derive(Parser)]
#[command(
    name = "conveyor",
    about = "Run build and release pipelines, alone or as a dependency-ordered workspace",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory holding pipeline.yml or workspace.yml
    #[arg(long, global = true, env = "CONVEYOR_SOURCE_DIR", default_value = ".")]
    source_dir: PathBuf,

    /// Override the working directory from the definition
    #[arg(long, global = true, env = "CONVEYOR_WORKING_DIR")]
    working_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Operate on one pipeline
    Pipeline {
        /// Pipeline to operate on when the workspace holds several
        #[arg(long, global = true)]
        name: Option<String>,

        #[command(subcommand)]
        subcommand: PipelineSubcommand,
    },

    /// Operate on every pipeline of a workspace
    Workspace {
        #[command(subcommand)]
        subcommand: WorkspaceSubcommand,
    },

    /// Inspect registered backends
    Backends {
        #[command(subcommand)]
        subcommand: BackendsSubcommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let target = commands::Target {
        source_dir: cli.source_dir,
        working_dir: cli.working_dir,
    };
    let result = match cli.command {
        Commands::Pipeline { name, subcommand } => commands::pipeline::run(&target, name.as_deref(), subcommand).await,
        Commands::Workspace { subcommand } => commands::workspace::run(&target, subcommand).await,
        Commands::Backends { subcommand } => commands::backends::run(&target, subcommand).await,
    };

    match result {
        Ok(code) => std::process::exit(i32::from(code.exit_code())),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
