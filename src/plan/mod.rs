// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Plan building: descriptor + event into the concrete job graph.

mod builder;

pub use builder::{BuildPlan, PlanBuilder, PlannedJob, PlannedStage, SkippedStage};
