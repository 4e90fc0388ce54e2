// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Validate command - check descriptor configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::descriptor::{DescriptorValidator, Pipeline};

/// Run the validate command
pub async fn run(descriptor_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating descriptor...".bold());
    println!();

    // Check descriptor exists
    if !descriptor_path.exists() {
        return Err(miette::miette!(
            "Descriptor file not found: {}\n\n\
             Run 'stagehand init' to create one.",
            descriptor_path.display()
        ));
    }

    // Load descriptor
    let pipeline = match Pipeline::from_file(&descriptor_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} Failed to parse descriptor", "✗".red());
            eprintln!();
            return Err(miette::miette!("Parse error: {}", e));
        }
    };

    println!("  {} Descriptor file is valid YAML", "✓".green());

    // Validate descriptor structure
    let validation = DescriptorValidator::validate(&pipeline)
        .map_err(|e| miette::miette!("Validation error: {}", e))?;

    let mut has_issues = false;

    if !validation.errors.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !validation.warnings.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Descriptor summary".bold());
        println!("  Name: {}", pipeline.name);
        println!("  Stages: {}", pipeline.stages.len());
        for stage in &pipeline.stages {
            let mut marker = String::new();
            if stage.cron {
                marker.push_str(" (cron)");
            }
            if stage.release {
                marker.push_str(" (release)");
            }
            let deps = if stage.depends_on.is_empty() {
                String::new()
            } else {
                format!(" [depends: {}]", stage.depends_on.join(", "))
            };
            println!("    - {}{}{}", stage.name, marker, deps.dimmed());
        }
        if !pipeline.schedules.is_empty() {
            println!("  Schedules: {}", pipeline.schedules.len());
            for schedule in &pipeline.schedules {
                let name = schedule.display_name.as_deref().unwrap_or("unnamed");
                println!("    - {} ({})", name, schedule.cron);
            }
        }
        if pipeline.pr.autocancel {
            println!("  PR autocancel: on (enforced by the orchestrator)");
        }
    }

    println!();

    if has_issues {
        if validation.is_valid() {
            println!("{}", "Descriptor is valid but has warnings.".yellow().bold());
            Ok(())
        } else {
            Err(miette::miette!("Descriptor validation failed"))
        }
    } else {
        println!("{}", "Descriptor is valid!".green().bold());
        Ok(())
    }
}
