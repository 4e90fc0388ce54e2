// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Plan builder
//!
//! Combines trigger resolution, matrix expansion, and release gating into the
//! concrete job graph the external orchestrator would instantiate for one
//! trigger event.

use std::collections::HashMap;

use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use crate::descriptor::{Pipeline, Stage, StageDag};
use crate::errors::StagehandError;
use crate::matrix::{MatrixExpander, TestJob};
use crate::release::{PublishPlan, ReleasePublisher};
use crate::trigger::{Activation, BuildEvent, SkipReason, TriggerResolver};

/// The concrete job graph for one trigger event
#[derive(Debug, Serialize)]
pub struct BuildPlan {
    /// Pipeline name
    pub pipeline: String,

    /// The event the plan was resolved against
    pub event: BuildEvent,

    /// Instantiated stages in topological order
    pub stages: Vec<PlannedStage>,

    /// Stages not instantiated, with the reason
    pub skipped: Vec<SkippedStage>,
}

/// One instantiated stage
#[derive(Debug, Serialize)]
pub struct PlannedStage {
    pub name: String,
    pub display_name: Option<String>,
    pub depends_on: Vec<String>,
    pub jobs: Vec<PlannedJob>,
}

/// One instantiated job
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlannedJob {
    /// A matrix test job
    Test(TestJob),

    /// The release-packaging job with its publish decision
    Release {
        template: String,
        publish: PublishPlan,
    },
}

/// A stage left out of the plan
#[derive(Debug, Serialize)]
pub struct SkippedStage {
    pub name: String,
    pub reason: String,
}

/// Builds concrete plans from a descriptor and an event
pub struct PlanBuilder;

impl PlanBuilder {
    /// Resolve, expand, and order the full plan for one event
    pub fn build(pipeline: &Pipeline, event: &BuildEvent) -> Result<BuildPlan, StagehandError> {
        let resolver = TriggerResolver::new(pipeline)?;
        let decisions = resolver.resolve(event)?;

        let dag = StageDag::build(pipeline)?;
        let order = dag.topological_order()?;

        let mut activations: HashMap<String, Activation> = decisions
            .into_iter()
            .map(|d| (d.stage, d.activation))
            .collect();

        // A stage whose required upstream stage is absent is absent too.
        // Cron stages start independently and are exempt.
        for idx in &order {
            let stage = &pipeline.stages[*idx];
            if stage.cron || !activations[&stage.name].is_active() {
                continue;
            }
            let skipped_dep = stage
                .depends_on
                .iter()
                .find(|dep| !activations.get(*dep).map_or(false, Activation::is_active));
            if let Some(dep) = skipped_dep {
                debug!(stage = %stage.name, dependency = %dep, "propagating skip");
                activations.insert(
                    stage.name.clone(),
                    Activation::Skipped(SkipReason::DependencySkipped(dep.clone())),
                );
            }
        }

        let mut stages = Vec::new();
        let mut skipped = Vec::new();

        for idx in order {
            let stage = &pipeline.stages[idx];
            match &activations[&stage.name] {
                Activation::Active => stages.push(Self::plan_stage(stage, event)?),
                Activation::Skipped(reason) => skipped.push(SkippedStage {
                    name: stage.name.clone(),
                    reason: reason.to_string(),
                }),
            }
        }

        Ok(BuildPlan {
            pipeline: pipeline.name.clone(),
            event: event.clone(),
            stages,
            skipped,
        })
    }

    fn plan_stage(stage: &Stage, event: &BuildEvent) -> Result<PlannedStage, StagehandError> {
        let jobs = if stage.release {
            let publish = ReleasePublisher::plan(stage, event);
            let template = stage
                .jobs
                .first()
                .map(|j| j.template.clone())
                .unwrap_or_else(|| "publish-dist".to_string());
            vec![PlannedJob::Release { template, publish }]
        } else {
            let mut jobs = Vec::new();
            for job in &stage.jobs {
                for test_job in MatrixExpander::expand(&stage.name, job)? {
                    jobs.push(PlannedJob::Test(test_job));
                }
            }
            jobs
        };

        Ok(PlannedStage {
            name: stage.name.clone(),
            display_name: stage.display_name.clone(),
            depends_on: stage.depends_on.clone(),
            jobs,
        })
    }
}

impl BuildPlan {
    /// Total number of instantiated jobs
    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|s| s.jobs.len()).sum()
    }

    /// The release publish decision, when the release stage is in the plan
    pub fn publish_plan(&self) -> Option<&PublishPlan> {
        self.stages.iter().flat_map(|s| s.jobs.iter()).find_map(|j| match j {
            PlannedJob::Release { publish, .. } => Some(publish),
            PlannedJob::Test(_) => None,
        })
    }

    /// Serialize the plan as pretty JSON
    pub fn to_json(&self) -> Result<String, StagehandError> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Render the plan as colored terminal text
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "{}: {} ({} on {})\n",
            "Plan".bold(),
            self.pipeline,
            self.event.reason,
            self.event.source_ref
        ));
        out.push_str(&format!("{}\n", "═".repeat(50)));

        if self.stages.is_empty() {
            out.push_str("  No stages instantiated for this event.\n");
        }

        for (i, stage) in self.stages.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, stage.name.bold()));
            if !stage.depends_on.is_empty() {
                out.push_str(
                    &format!(" [depends: {}]", stage.depends_on.join(", "))
                        .dimmed()
                        .to_string(),
                );
            }
            out.push('\n');

            for job in &stage.jobs {
                match job {
                    PlannedJob::Test(test) => {
                        let mut flags = vec![test.task.to_string()];
                        if test.pinning != crate::matrix::Pinning::Stable {
                            flags.push(test.pinning.to_string());
                        }
                        if test.parallel {
                            flags.push("parallel".to_string());
                        }
                        out.push_str(&format!(
                            "     - {} (python {}, {})\n",
                            test.name,
                            test.python,
                            flags.join(", ")
                        ));
                    }
                    PlannedJob::Release { template, publish } => {
                        let artifacts = publish
                            .artifacts
                            .iter()
                            .map(|a| a.to_string())
                            .collect::<Vec<_>>()
                            .join("+");
                        match &publish.upload {
                            Some(target) => {
                                out.push_str(&format!(
                                    "     - {}: build {}, {} {}\n",
                                    template,
                                    artifacts,
                                    "upload to".green(),
                                    target.index.green().bold()
                                ));
                            }
                            None => {
                                out.push_str(&format!(
                                    "     - {}: build {}, {}\n",
                                    template,
                                    artifacts,
                                    "no upload (ref is not a release tag)".dimmed()
                                ));
                            }
                        }
                    }
                }
            }
        }

        if !self.skipped.is_empty() {
            out.push_str(&format!("\n{}:\n", "Skipped".yellow().bold()));
            for s in &self.skipped {
                out.push_str(&format!("  - {}: {}\n", s.name, s.reason.dimmed()));
            }
        }

        out
    }
}
