// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! # stagehand - CI Pipeline Descriptor Toolkit
//!
//! `stagehand` models declarative build/test/release pipeline descriptors and
//! previews the job graph an external orchestrator would instantiate.
//!
//! ## Features
//!
//! - **Trigger resolution** - branch/tag glob filters, cron gating, release rules
//! - **Matrix expansion** - shorthand (platform, interpreter, flags) entries into concrete jobs
//! - **Release gating** - artifacts always built, uploads only for release tags
//! - **Validation** - dependency graph, condition fields, matrix shape, upload targets
//!
//! ## Quick Start
//!
//! ```bash
//! # Initialize a descriptor
//! stagehand init my-pipeline
//!
//! # Check it
//! stagehand validate
//!
//! # Preview the job graph for a tag push
//! stagehand plan --ref refs/tags/v1.0.0
//!
//! # Show the stage DAG
//! stagehand graph --format mermaid
//! ```

pub mod cli;
pub mod descriptor;
pub mod errors;
pub mod matrix;
pub mod plan;
pub mod release;
pub mod trigger;

// Re-export commonly used types
pub use descriptor::{Pipeline, Stage};
pub use errors::{StagehandError, StagehandResult};

// Re-export the planning surface
pub use plan::{BuildPlan, PlanBuilder};
pub use trigger::{BuildEvent, BuildReason};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
