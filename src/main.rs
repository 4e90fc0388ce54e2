// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! stagehand - CI Pipeline Descriptor Toolkit
//!
//! Validate pipeline descriptors and preview the job graph they expand to.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagehand::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagehand=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { name, template } => {
            stagehand::cli::init::run(name, template, cli.verbose).await
        }
        Commands::Validate { descriptor } => {
            stagehand::cli::validate::run(descriptor, cli.verbose).await
        }
        Commands::Plan {
            descriptor,
            reference,
            reason,
            default_branch,
            target_branch,
            variables,
            format,
        } => {
            stagehand::cli::plan::run(
                descriptor,
                reference,
                reason,
                default_branch,
                target_branch,
                variables,
                format,
                cli.verbose,
            )
            .await
        }
        Commands::Graph { descriptor, format } => {
            stagehand::cli::graph::run(descriptor, format, cli.verbose).await
        }
    }
}
