// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Init command - create a new descriptor

use colored::Colorize;
use miette::Result;
use std::path::Path;

/// Run the init command
pub async fn run(name: Option<String>, template: Option<String>, verbose: bool) -> Result<()> {
    let pipeline_name = name.unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "my-pipeline".to_string())
    });

    println!("{}", "Initializing stagehand descriptor...".bold());
    println!();

    // Check if .stagehand.yaml already exists
    if Path::new(".stagehand.yaml").exists() {
        return Err(miette::miette!(
            ".stagehand.yaml already exists; remove it first to re-initialize."
        ));
    }

    // Generate descriptor based on template
    let descriptor_content = match template.as_deref() {
        Some("matrix") => generate_matrix_template(&pipeline_name),
        Some("full") => generate_full_template(&pipeline_name),
        Some(t) => {
            return Err(miette::miette!(
                "Unknown template: '{}'\n\nAvailable templates:\n\
                 • matrix  - A single test-matrix stage\n\
                 • full    - Two test phases, a cron stage, and release packaging",
                t
            ));
        }
        None => generate_full_template(&pipeline_name),
    };

    // Write descriptor file
    std::fs::write(".stagehand.yaml", &descriptor_content)
        .map_err(|e| miette::miette!("Failed to write .stagehand.yaml: {}", e))?;

    println!("  {} Created .stagehand.yaml", "✓".green());

    println!();
    println!("{}", "Descriptor initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your stages", ".stagehand.yaml".cyan());
    println!("  2. Run {} to check it", "stagehand validate".cyan());
    println!(
        "  3. Run {} to preview the job graph",
        "stagehand plan --ref refs/tags/v1.0.0".cyan()
    );
    println!();

    if verbose {
        println!("{}", "Generated descriptor:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", descriptor_content.dimmed());
    }

    Ok(())
}

fn generate_matrix_template(name: &str) -> String {
    format!(
        r#"# stagehand pipeline descriptor
version: "1"
name: "{name}"

trigger:
  branches:
    include: ["*"]

stages:
  - name: "tests"
    jobs:
      - template: "run-test-env"
        parameters:
          default_python: "3.11"
          coverage: "codecov"
          parallel: true
          envs:
            - linux: py311-test
            - macos: py312-test
            - windows: py310-test
"#
    )
}

fn generate_full_template(name: &str) -> String {
    format!(
        r#"# stagehand pipeline descriptor
version: "1"
name: "{name}"

trigger:
  branches:
    include: ["*"]
    exclude: ["*backport*"]
  tags:
    include: ["v*"]
    exclude: ["*dev*", "*pre*", "*post*"]

pr:
  branches:
    include: ["*"]
  autocancel: true

schedules:
  - cron: "0 7 * * 1"
    display_name: "Weekly build"
    branches:
      include: ["main"]
    always: true

stages:
  - name: "first_phase"
    display_name: "Core tests"
    jobs:
      - template: "run-test-env"
        parameters:
          default_python: "3.11"
          coverage: "codecov"
          parallel: true
          envs:
            - linux: py311-test

  - name: "second_phase"
    display_name: "Platform and docs"
    depends_on: ["first_phase"]
    jobs:
      - template: "run-test-env"
        parameters:
          default_python: "3.11"
          coverage: "codecov"
          envs:
            - macos: py312-test
            - windows: py310-test-oldestdeps
            - platform: linux
              env: py311-docs
              name: documentation
              libraries:
                apt: ["graphviz"]

  - name: "cron_tests"
    display_name: "Upstream pre-releases"
    cron: true
    jobs:
      - template: "run-test-env"
        parameters:
          default_python: "3.11"
          envs:
            - linux: py311-test-devdeps

  - name: "publish"
    display_name: "Release packaging"
    release: true
    depends_on: ["second_phase"]
    jobs:
      - template: "publish-dist"
        parameters:
          artifacts: ["wheel", "sdist"]
          credential: "pypi_token"
"#
    )
}
