// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Descriptor validation
//!
//! Static checks run before a descriptor is used for planning: dependency
//! references resolve, conditions only touch known metadata fields, the
//! matrix entries are well-formed, and at most one upload target exists.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::descriptor::{Pipeline, RefRules, Stage, StageDag};
use crate::errors::StagehandError;
use crate::matrix::MatrixExpander;
use crate::trigger::{Condition, RefFilter};

fn cron_field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9*,/-]+$").unwrap())
}

/// Descriptor validator
pub struct DescriptorValidator;

impl DescriptorValidator {
    /// Validate a descriptor
    pub fn validate(pipeline: &Pipeline) -> Result<ValidationResult, StagehandError> {
        let mut result = ValidationResult::new();

        if pipeline.stages.is_empty() {
            result.add_error("Descriptor has no stages defined");
        }

        // Duplicate stage names
        let mut seen_names = HashSet::new();
        for stage in &pipeline.stages {
            if !seen_names.insert(&stage.name) {
                result.add_error(&format!("Duplicate stage name: '{}'", stage.name));
            }
        }

        // DAG structure (cycles and unknown dependencies)
        match StageDag::build(pipeline) {
            Ok(_) => {}
            Err(StagehandError::CircularDependency { stages }) => {
                result.add_error(&format!("Circular dependency: {}", stages.join(" -> ")));
            }
            Err(StagehandError::UnknownDependency { stage, dependency }) => {
                result.add_error(&format!(
                    "Stage '{}' depends on unknown stage '{}'",
                    stage, dependency
                ));
            }
            Err(e) => {
                result.add_error(&format!("DAG validation error: {}", e));
            }
        }

        Self::validate_trigger_rules(pipeline, &mut result);
        Self::validate_schedules(pipeline, &mut result);

        let declared_variables: HashSet<&str> =
            pipeline.variables.keys().map(String::as_str).collect();

        for stage in &pipeline.stages {
            Self::validate_stage(stage, &declared_variables, &mut result);
        }

        // At most one release stage, at most one upload target
        let release_count = pipeline.stages.iter().filter(|s| s.release).count();
        if release_count > 1 {
            result.add_error(&format!(
                "Descriptor declares {} release stages; at most one is allowed",
                release_count
            ));
        }

        let upload_targets = pipeline.upload_target_count();
        if upload_targets > 1 {
            result.add_error(&format!(
                "Descriptor selects {} upload targets; at most one is allowed",
                upload_targets
            ));
        }

        for stage in &pipeline.stages {
            if !stage.release {
                for job in &stage.jobs {
                    if job.parameters.credential.is_some() {
                        result.add_warning(&format!(
                            "Stage '{}': credential on a non-release stage is never used",
                            stage.name
                        ));
                    }
                }
            }
        }

        Ok(result)
    }

    fn validate_trigger_rules(pipeline: &Pipeline, result: &mut ValidationResult) {
        let rule_sets: [(&str, &RefRules); 3] = [
            ("trigger.branches", &pipeline.trigger.branches),
            ("trigger.tags", &pipeline.trigger.tags),
            ("pr.branches", &pipeline.pr.branches),
        ];

        for (what, rules) in rule_sets {
            if let Err(e) = RefFilter::compile(rules) {
                result.add_error(&format!("{}: {}", what, e));
            }
        }
    }

    fn validate_schedules(pipeline: &Pipeline, result: &mut ValidationResult) {
        for schedule in &pipeline.schedules {
            let fields: Vec<&str> = schedule.cron.split_whitespace().collect();
            if fields.len() != 5 {
                result.add_error(&format!(
                    "Schedule cron '{}' has {} fields; expected 5",
                    schedule.cron,
                    fields.len()
                ));
                continue;
            }
            for field in fields {
                if !cron_field_re().is_match(field) {
                    result.add_error(&format!(
                        "Schedule cron '{}': invalid field '{}'",
                        schedule.cron, field
                    ));
                }
            }

            if let Err(e) = RefFilter::compile(&schedule.branches) {
                result.add_error(&format!("Schedule '{}': {}", schedule.cron, e));
            }
        }
    }

    /// Validate a single stage
    fn validate_stage(
        stage: &Stage,
        declared_variables: &HashSet<&str>,
        result: &mut ValidationResult,
    ) {
        if stage.cron && stage.release {
            result.add_error(&format!(
                "Stage '{}' cannot be both cron and release",
                stage.name
            ));
        }

        // Cron stages start independently on the schedule
        if stage.cron && !stage.depends_on.is_empty() {
            result.add_warning(&format!(
                "Stage '{}': cron stages start independently; dependencies are ignored",
                stage.name
            ));
        }

        if stage.release && stage.depends_on.is_empty() {
            result.add_warning(&format!(
                "Stage '{}': release packaging conventionally follows the final test stage",
                stage.name
            ));
        }

        if let Some(expr) = &stage.condition {
            match Condition::parse(expr) {
                Ok(condition) => {
                    if let Err(e) = condition.validate_fields(declared_variables) {
                        result.add_error(&format!("Stage '{}': {}", stage.name, e));
                    }
                }
                Err(e) => {
                    result.add_error(&format!("Stage '{}': {}", stage.name, e));
                }
            }
        }

        // Matrix shape: expanding surfaces malformed entries and env tokens
        if !stage.release {
            for job in &stage.jobs {
                if let Err(e) = MatrixExpander::expand(&stage.name, job) {
                    result.add_error(&format!("Stage '{}': {}", stage.name, e));
                }
            }
        }
    }
}

/// Result of descriptor validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Pipeline;

    fn validate(yaml: &str) -> ValidationResult {
        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        DescriptorValidator::validate(&pipeline).unwrap()
    }

    #[test]
    fn test_validate_empty_descriptor() {
        let result = validate("name: empty\nstages: []\n");
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no stages"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let result = validate(
            r#"
name: dup
stages:
  - name: tests
  - name: tests
"#,
        );
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let result = validate(
            r#"
name: t
stages:
  - name: tests
    depends_on: [nonexistent]
"#,
        );
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("unknown stage")));
    }

    #[test]
    fn test_validate_condition_fields() {
        let result = validate(
            r#"
name: t
variables:
  MY_FLAG: "on"
stages:
  - name: gated
    condition: "eq(variables['MY_FLAG'], 'on')"
  - name: broken
    condition: "eq(variables['Build.Bogus'], 'x')"
"#,
        );
        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("Build.Bogus"));
    }

    #[test]
    fn test_validate_bad_cron() {
        let result = validate(
            r#"
name: t
schedules:
  - cron: "0 7 * *"
stages:
  - name: tests
"#,
        );
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("expected 5"));
    }

    #[test]
    fn test_validate_bad_matrix_env() {
        let result = validate(
            r#"
name: t
stages:
  - name: tests
    jobs:
      - template: run-test-env
        parameters:
          default_python: "3.11"
          envs:
            - linux: py311-bench
"#,
        );
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("py311-bench"));
    }

    #[test]
    fn test_validate_multiple_upload_targets() {
        let result = validate(
            r#"
name: t
stages:
  - name: tests
  - name: publish_a
    release: true
    depends_on: [tests]
    jobs:
      - template: publish-dist
        parameters:
          credential: one
      - template: publish-dist
        parameters:
          credential: two
"#,
        );
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("2 upload targets")));
    }

    #[test]
    fn test_cron_stage_with_dependencies_warns() {
        let result = validate(
            r#"
name: t
stages:
  - name: tests
  - name: cron_tests
    cron: true
    depends_on: [tests]
"#,
        );
        assert!(result.is_valid());
        assert!(result.has_warnings());
        assert!(result.warnings[0].contains("independently"));
    }

    #[test]
    fn test_valid_descriptor_passes() {
        let result = validate(
            r#"
name: irispy
trigger:
  branches:
    include: ["*"]
    exclude: ["*backport*"]
  tags:
    include: ["v*"]
    exclude: ["*dev*", "*pre*", "*post*"]
schedules:
  - cron: "0 7 * * 1"
stages:
  - name: first_phase
    jobs:
      - template: run-test-env
        parameters:
          default_python: "3.11"
          coverage: codecov
          envs:
            - linux: py311-test
  - name: second_phase
    depends_on: [first_phase]
    jobs:
      - template: run-test-env
        parameters:
          default_python: "3.11"
          envs:
            - macos: py312-test
            - windows: py310-test-oldestdeps
  - name: cron_tests
    cron: true
    jobs:
      - template: run-test-env
        parameters:
          default_python: "3.11"
          envs:
            - linux: py311-test-devdeps
  - name: publish
    release: true
    depends_on: [second_phase]
    jobs:
      - template: publish-dist
        parameters:
          artifacts: [wheel, sdist]
          credential: pypi_token
"#,
        );
        assert!(result.is_valid(), "errors: {:?}", result.errors);
        assert!(!result.has_warnings(), "warnings: {:?}", result.warnings);
    }
}
