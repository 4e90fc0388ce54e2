// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Graph command - visualize the stage DAG

use miette::Result;
use std::path::PathBuf;

use super::GraphFormat;
use crate::descriptor::{Pipeline, StageDag};

/// Run the graph command
pub async fn run(descriptor_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    // Check descriptor exists
    if !descriptor_path.exists() {
        return Err(miette::miette!(
            "Descriptor file not found: {}\n\n\
             Run 'stagehand init' to create one.",
            descriptor_path.display()
        ));
    }

    // Load descriptor
    let pipeline = Pipeline::from_file(&descriptor_path)
        .map_err(|e| miette::miette!("Failed to load descriptor: {}", e))?;

    // Build DAG
    let dag = StageDag::build(&pipeline).map_err(|e| miette::miette!("{}", e))?;

    // Output in requested format
    let output = match format {
        GraphFormat::Text => dag
            .to_text(&pipeline)
            .map_err(|e| miette::miette!("{}", e))?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
