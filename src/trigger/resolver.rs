// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Trigger resolution
//!
//! Decides, from event metadata, which stages of a descriptor are
//! instantiated: branch/tag filters for the standard test stages, schedule
//! gating for cron stages, and the release-stage activation rules.

use tracing::debug;

use crate::descriptor::Pipeline;
use crate::errors::StagehandError;
use crate::trigger::{BuildEvent, BuildReason, Condition, EvalContext, RefFilter};

/// Per-stage activation decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Active,
    Skipped(SkipReason),
}

impl Activation {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Why a stage was not instantiated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The event's ref did not pass the trigger filters
    RefFiltered,
    /// Cron stages are only instantiated on scheduled runs
    CronOnly,
    /// The release stage never runs for pull requests
    ReleaseOnPullRequest,
    /// Release needs a non-default branch or a scheduled/manual run
    ReleaseGate,
    /// The stage condition evaluated to false
    ConditionFalse(String),
    /// A required upstream stage was not instantiated
    DependencySkipped(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RefFiltered => write!(f, "ref did not match the trigger filters"),
            Self::CronOnly => write!(f, "cron stage outside a scheduled run"),
            Self::ReleaseOnPullRequest => {
                write!(f, "release stage never runs for pull requests")
            }
            Self::ReleaseGate => write!(
                f,
                "release stage needs a non-default branch or a scheduled/manual run"
            ),
            Self::ConditionFalse(cond) => write!(f, "condition '{}' is false", cond),
            Self::DependencySkipped(dep) => {
                write!(f, "required stage '{}' was not instantiated", dep)
            }
        }
    }
}

/// One stage's resolution outcome, in declaration order
#[derive(Debug, Clone)]
pub struct StageDecision {
    pub stage: String,
    pub activation: Activation,
}

/// Resolves trigger events against a descriptor
pub struct TriggerResolver<'a> {
    pipeline: &'a Pipeline,
    branch_filter: RefFilter,
    tag_filter: RefFilter,
    pr_filter: RefFilter,
    schedule_filters: Vec<RefFilter>,
}

impl<'a> TriggerResolver<'a> {
    /// Compile the descriptor's trigger filters
    pub fn new(pipeline: &'a Pipeline) -> Result<Self, StagehandError> {
        let branch_filter = RefFilter::compile(&pipeline.trigger.branches)?;
        let tag_filter = RefFilter::compile(&pipeline.trigger.tags)?;
        let pr_filter = RefFilter::compile(&pipeline.pr.branches)?;
        let schedule_filters = pipeline
            .schedules
            .iter()
            .map(|s| RefFilter::compile(&s.branches))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            pipeline,
            branch_filter,
            tag_filter,
            pr_filter,
            schedule_filters,
        })
    }

    /// Whether the event passes the pipeline-level trigger filters at all
    pub fn event_matches(&self, event: &BuildEvent) -> bool {
        match event.reason {
            BuildReason::Push => {
                if let Some(tag) = event.tag_name() {
                    self.tag_filter.matches(tag)
                } else if let Some(branch) = event.branch_name() {
                    self.branch_filter.matches(branch)
                } else {
                    false
                }
            }
            BuildReason::PullRequest => {
                let target = event
                    .target_branch
                    .as_deref()
                    .unwrap_or(&event.default_branch);
                self.pr_filter.matches(target)
            }
            BuildReason::Schedule => {
                let branch = event.branch_name().unwrap_or(event.short_name());
                self.schedule_filters.iter().any(|f| f.matches(branch))
            }
            // Manual runs bypass the trigger filters
            BuildReason::Manual => true,
        }
    }

    /// Resolve every stage's activation for an event, in declaration order.
    ///
    /// Dependency propagation (skipping dependents of skipped stages) is the
    /// plan builder's job; decisions here are per-stage.
    pub fn resolve(&self, event: &BuildEvent) -> Result<Vec<StageDecision>, StagehandError> {
        let matched = self.event_matches(event);
        debug!(reason = %event.reason, source_ref = %event.source_ref, matched, "resolving trigger");

        let mut decisions = Vec::with_capacity(self.pipeline.stages.len());

        for stage in &self.pipeline.stages {
            let activation = if !matched {
                Activation::Skipped(SkipReason::RefFiltered)
            } else {
                self.resolve_stage(stage, event)?
            };

            debug!(stage = %stage.name, active = activation.is_active(), "stage decision");
            decisions.push(StageDecision {
                stage: stage.name.clone(),
                activation,
            });
        }

        Ok(decisions)
    }

    fn resolve_stage(
        &self,
        stage: &crate::descriptor::Stage,
        event: &BuildEvent,
    ) -> Result<Activation, StagehandError> {
        // Cron stages are bound to the scheduled reason and nothing else
        if stage.cron && event.reason != BuildReason::Schedule {
            return Ok(Activation::Skipped(SkipReason::CronOnly));
        }

        if stage.release {
            if event.reason == BuildReason::PullRequest {
                return Ok(Activation::Skipped(SkipReason::ReleaseOnPullRequest));
            }
            let gated_open = matches!(event.reason, BuildReason::Schedule | BuildReason::Manual)
                || !event.is_default_branch();
            if !gated_open {
                return Ok(Activation::Skipped(SkipReason::ReleaseGate));
            }
        }

        if let Some(expr) = &stage.condition {
            let condition = Condition::parse(expr)?;
            let ctx = EvalContext {
                event,
                variables: &self.pipeline.variables,
            };
            if !condition.evaluate(&ctx)? {
                return Ok(Activation::Skipped(SkipReason::ConditionFalse(expr.clone())));
            }
        }

        Ok(Activation::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{RefRules, Schedule, Stage, TriggerRules};

    fn descriptor() -> Pipeline {
        Pipeline {
            version: "1".into(),
            name: "irispy".into(),
            description: None,
            trigger: TriggerRules {
                branches: RefRules {
                    include: vec!["*".into()],
                    exclude: vec!["*backport*".into()],
                },
                tags: RefRules {
                    include: vec!["v*".into()],
                    exclude: vec!["*dev*".into(), "*pre*".into(), "*post*".into()],
                },
            },
            pr: Default::default(),
            schedules: vec![Schedule {
                cron: "0 7 * * 1".into(),
                display_name: Some("Weekly".into()),
                branches: RefRules {
                    include: vec!["main".into()],
                    exclude: vec![],
                },
                always: true,
            }],
            variables: Default::default(),
            stages: vec![
                stage("first_phase", vec![], false, false),
                stage("second_phase", vec!["first_phase"], false, false),
                stage("cron_tests", vec![], true, false),
                stage("publish", vec!["second_phase"], false, true),
            ],
        }
    }

    fn stage(name: &str, deps: Vec<&str>, cron: bool, release: bool) -> Stage {
        Stage {
            name: name.into(),
            display_name: None,
            depends_on: deps.into_iter().map(String::from).collect(),
            condition: None,
            cron,
            release,
            jobs: vec![],
        }
    }

    fn decisions_for(event: &BuildEvent) -> Vec<StageDecision> {
        let pipeline = descriptor();
        let resolver = TriggerResolver::new(&pipeline).unwrap();
        resolver.resolve(event).unwrap()
    }

    fn activation<'d>(decisions: &'d [StageDecision], name: &str) -> &'d Activation {
        &decisions
            .iter()
            .find(|d| d.stage == name)
            .unwrap()
            .activation
    }

    #[test]
    fn test_backport_branches_activate_nothing() {
        let event =
            BuildEvent::new(BuildReason::Push, "refs/heads/v1.0-backport", "main").unwrap();
        let decisions = decisions_for(&event);

        assert!(decisions
            .iter()
            .all(|d| d.activation == Activation::Skipped(SkipReason::RefFiltered)));
    }

    #[test]
    fn test_release_tag_activates_test_stages() {
        let event = BuildEvent::new(BuildReason::Push, "refs/tags/v1.2.3", "main").unwrap();
        let decisions = decisions_for(&event);

        assert!(activation(&decisions, "first_phase").is_active());
        assert!(activation(&decisions, "second_phase").is_active());
        assert!(activation(&decisions, "publish").is_active());
    }

    #[test]
    fn test_dev_tag_activates_nothing() {
        let event =
            BuildEvent::new(BuildReason::Push, "refs/tags/v1.2.3.dev1", "main").unwrap();
        let decisions = decisions_for(&event);

        assert!(decisions
            .iter()
            .all(|d| d.activation == Activation::Skipped(SkipReason::RefFiltered)));
    }

    #[test]
    fn test_cron_stage_only_on_schedule() {
        let push = BuildEvent::new(BuildReason::Push, "refs/heads/main", "main").unwrap();
        let decisions = decisions_for(&push);
        assert_eq!(
            *activation(&decisions, "cron_tests"),
            Activation::Skipped(SkipReason::CronOnly)
        );

        let scheduled = BuildEvent::new(BuildReason::Schedule, "refs/heads/main", "main").unwrap();
        let decisions = decisions_for(&scheduled);
        assert!(activation(&decisions, "cron_tests").is_active());
    }

    #[test]
    fn test_release_never_on_pull_request() {
        let event = BuildEvent::new(BuildReason::PullRequest, "refs/heads/fix-thing", "main")
            .unwrap()
            .with_target_branch("main");
        let decisions = decisions_for(&event);

        assert!(activation(&decisions, "first_phase").is_active());
        assert_eq!(
            *activation(&decisions, "publish"),
            Activation::Skipped(SkipReason::ReleaseOnPullRequest)
        );
    }

    #[test]
    fn test_release_gated_on_default_branch_push() {
        let event = BuildEvent::new(BuildReason::Push, "refs/heads/main", "main").unwrap();
        let decisions = decisions_for(&event);

        assert_eq!(
            *activation(&decisions, "publish"),
            Activation::Skipped(SkipReason::ReleaseGate)
        );
    }

    #[test]
    fn test_release_active_on_manual_run() {
        let event = BuildEvent::new(BuildReason::Manual, "refs/heads/main", "main").unwrap();
        let decisions = decisions_for(&event);

        assert!(activation(&decisions, "publish").is_active());
    }

    #[test]
    fn test_stage_condition_gates_activation() {
        let mut pipeline = descriptor();
        pipeline.stages[0].condition =
            Some("eq(variables['Build.Reason'], 'Schedule')".to_string());
        let resolver = TriggerResolver::new(&pipeline).unwrap();

        let push = BuildEvent::new(BuildReason::Push, "refs/heads/main", "main").unwrap();
        let decisions = resolver.resolve(&push).unwrap();
        assert!(matches!(
            decisions[0].activation,
            Activation::Skipped(SkipReason::ConditionFalse(_))
        ));

        let scheduled = BuildEvent::new(BuildReason::Schedule, "refs/heads/main", "main").unwrap();
        let decisions = resolver.resolve(&scheduled).unwrap();
        assert!(decisions[0].activation.is_active());
    }

    #[test]
    fn test_schedule_branch_filter() {
        let event =
            BuildEvent::new(BuildReason::Schedule, "refs/heads/feature-x", "main").unwrap();
        let decisions = decisions_for(&event);

        // Weekly schedule only covers main
        assert!(decisions
            .iter()
            .all(|d| d.activation == Activation::Skipped(SkipReason::RefFiltered)));
    }
}
