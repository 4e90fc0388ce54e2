// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Plan command - preview the job graph for a simulated trigger event

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::OutputFormat;
use crate::descriptor::{DescriptorValidator, Pipeline};
use crate::plan::PlanBuilder;
use crate::trigger::{BuildEvent, BuildReason};

/// Run the plan command
#[allow(clippy::too_many_arguments)]
pub async fn run(
    descriptor_path: PathBuf,
    reference: String,
    reason: BuildReason,
    default_branch: String,
    target_branch: Option<String>,
    variables: Vec<String>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    // Check descriptor exists
    if !descriptor_path.exists() {
        return Err(miette::miette!(
            "Descriptor file not found: {}\n\n\
             Run 'stagehand init' to create one.",
            descriptor_path.display()
        ));
    }

    // Load descriptor
    let mut pipeline = Pipeline::from_file(&descriptor_path)
        .map_err(|e| miette::miette!("Failed to load descriptor: {}", e))?;

    // Validate before planning
    let validation = DescriptorValidator::validate(&pipeline)
        .map_err(|e| miette::miette!("Validation error: {}", e))?;

    if !validation.is_valid() {
        eprintln!("{}", "Descriptor validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Descriptor configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Descriptor warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    // Simulated variable overrides
    for binding in &variables {
        let Some((key, value)) = binding.split_once('=') else {
            return Err(miette::miette!(
                "Invalid variable binding '{}': expected KEY=VALUE",
                binding
            ));
        };
        pipeline
            .variables
            .insert(key.to_string(), value.to_string());
    }

    // Build the simulated event
    let mut event = BuildEvent::new(reason, reference, default_branch)?;
    if let Some(target) = target_branch {
        event = event.with_target_branch(target);
    }

    // Resolve the plan
    let plan = PlanBuilder::build(&pipeline, &event)?;

    match format {
        OutputFormat::Text => {
            println!("{}", plan.render_text());
            if plan.stages.is_empty() {
                return Ok(());
            }
            println!(
                "{}",
                format!(
                    "{} stage{}, {} job{}",
                    plan.stages.len(),
                    if plan.stages.len() == 1 { "" } else { "s" },
                    plan.job_count(),
                    if plan.job_count() == 1 { "" } else { "s" }
                )
                .bold()
            );
        }
        OutputFormat::Json => {
            println!("{}", plan.to_json()?);
        }
    }

    Ok(())
}
