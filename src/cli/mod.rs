// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for stagehand.

pub mod graph;
pub mod init;
pub mod plan;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::trigger::BuildReason;

/// CI pipeline descriptor toolkit
///
/// Validate pipeline descriptors and preview the job graph they expand to.
#[derive(Parser, Debug)]
#[clap(
    name = "stagehand",
    version,
    about = "CI pipeline descriptor toolkit: trigger resolution, matrix expansion, release gating",
    long_about = None,
    after_help = "Examples:\n\
        stagehand init                              Initialize a descriptor\n\
        stagehand validate                          Check the descriptor\n\
        stagehand plan --ref refs/tags/v1.0.0       Preview the job graph for a tag push\n\
        stagehand graph --format mermaid            Show the stage DAG\n\n\
        See 'stagehand <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new descriptor
    Init {
        /// Pipeline name (defaults to current directory name)
        name: Option<String>,

        /// Use a template (matrix, full)
        #[clap(short, long)]
        template: Option<String>,
    },

    /// Validate the descriptor
    Validate {
        /// Descriptor file to validate
        #[clap(default_value = ".stagehand.yaml")]
        descriptor: PathBuf,
    },

    /// Preview the job graph for a simulated trigger event
    Plan {
        /// Descriptor file
        #[clap(short, long, default_value = ".stagehand.yaml")]
        descriptor: PathBuf,

        /// Source ref of the simulated event
        #[clap(long = "ref", default_value = "refs/heads/main", value_name = "REF")]
        reference: String,

        /// Trigger reason (push, pr, schedule, manual)
        #[clap(short, long, default_value = "push", value_parser = parse_reason)]
        reason: BuildReason,

        /// The repository's default branch
        #[clap(long, default_value = "main")]
        default_branch: String,

        /// Target branch for pull-request events
        #[clap(long)]
        target_branch: Option<String>,

        /// Extra variable bindings (KEY=VALUE), overriding descriptor variables
        #[clap(long = "var", value_name = "KEY=VALUE")]
        variables: Vec<String>,

        /// Output format
        #[clap(short, long, default_value = "text", value_parser = parse_output_format)]
        format: OutputFormat,
    },

    /// Show the stage dependency graph
    Graph {
        /// Descriptor file
        #[clap(default_value = ".stagehand.yaml")]
        descriptor: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "text", value_parser = parse_graph_format)]
        format: GraphFormat,
    },
}

fn parse_reason(s: &str) -> Result<BuildReason, String> {
    s.parse()
}

fn parse_output_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

fn parse_graph_format(s: &str) -> Result<GraphFormat, String> {
    s.parse()
}

/// Output format for the plan command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}
