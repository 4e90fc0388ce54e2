// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Test matrix expansion
//!
//! Expands the shorthand `envs` list of a test-template job into individual
//! test jobs. Every job inherits the template's shared defaults; entries only
//! deviate where they explicitly override.
//!
//! Env tokens are dash-separated: an optional interpreter segment (`py311` →
//! 3.11), an optional task (`test`, `docs`), and an optional pinning variant
//! (`oldestdeps`, `devdeps`). `py311-test-oldestdeps`, `py312`, and `docs`
//! are all valid.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::descriptor::{JobTemplate, MatrixEntry, TemplateParameters};
use crate::errors::StagehandError;
use crate::matrix::{Pinning, TaskKind, TestJob};

fn python_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^py(\d)(\d{1,2})$").unwrap())
}

/// Parsed pieces of an env token
#[derive(Debug, Default)]
struct EnvSpec {
    python: Option<String>,
    task: Option<TaskKind>,
    pinning: Option<Pinning>,
}

fn parse_env_token(env: &str) -> Result<EnvSpec, StagehandError> {
    if env.is_empty() {
        return Err(StagehandError::invalid_env(env, "env token is empty"));
    }

    let mut spec = EnvSpec::default();

    for segment in env.split('-') {
        if let Some(caps) = python_segment_re().captures(segment) {
            if spec.python.is_some() {
                return Err(StagehandError::invalid_env(env, "duplicate interpreter segment"));
            }
            spec.python = Some(format!("{}.{}", &caps[1], &caps[2]));
            continue;
        }

        match segment {
            "test" | "docs" => {
                if spec.task.is_some() {
                    return Err(StagehandError::invalid_env(env, "duplicate task segment"));
                }
                spec.task = Some(if segment == "test" {
                    TaskKind::Test
                } else {
                    TaskKind::Docs
                });
            }
            "oldestdeps" | "devdeps" => {
                if spec.pinning.is_some() {
                    return Err(StagehandError::invalid_env(env, "duplicate pinning segment"));
                }
                spec.pinning = Some(if segment == "oldestdeps" {
                    Pinning::Oldest
                } else {
                    Pinning::Dev
                });
            }
            other => {
                return Err(StagehandError::invalid_env(
                    env,
                    format!("unknown segment '{}'", other),
                ));
            }
        }
    }

    Ok(spec)
}

/// Expands a test-template job's matrix into concrete test jobs
pub struct MatrixExpander;

impl MatrixExpander {
    /// Expand every entry of a test-template job.
    ///
    /// `stage_name` is only used for diagnostics.
    pub fn expand(stage_name: &str, job: &JobTemplate) -> Result<Vec<TestJob>, StagehandError> {
        let params = &job.parameters;

        if params.envs.is_empty() {
            return Err(StagehandError::EmptyMatrix {
                stage: stage_name.to_string(),
            });
        }

        let mut jobs = Vec::with_capacity(params.envs.len());
        for entry in &params.envs {
            jobs.push(Self::expand_entry(stage_name, entry, params)?);
        }

        debug!(stage = stage_name, jobs = jobs.len(), "expanded test matrix");
        Ok(jobs)
    }

    fn expand_entry(
        stage_name: &str,
        entry: &MatrixEntry,
        params: &TemplateParameters,
    ) -> Result<TestJob, StagehandError> {
        let platform = entry.platform().ok_or_else(|| StagehandError::InvalidStage {
            stage: stage_name.to_string(),
            reason: "shorthand matrix entry must name exactly one platform".to_string(),
        })?;
        let env = entry
            .env()
            .ok_or_else(|| StagehandError::InvalidStage {
                stage: stage_name.to_string(),
                reason: "shorthand matrix entry must name exactly one platform".to_string(),
            })?
            .to_string();

        let spec = parse_env_token(&env)?;

        let detailed = match entry {
            MatrixEntry::Detailed(d) => Some(d),
            MatrixEntry::Shorthand(_) => None,
        };

        // Interpreter resolution order: explicit override, env token, shared default
        let python = detailed
            .and_then(|d| d.python.clone())
            .or(spec.python)
            .or_else(|| params.default_python.clone())
            .ok_or_else(|| {
                StagehandError::invalid_env(
                    &env,
                    "no interpreter version in the token and no default_python on the job",
                )
            })?;

        let task = spec.task.unwrap_or(TaskKind::Test);

        let name = detailed
            .and_then(|d| d.name.clone())
            .unwrap_or_else(|| format!("{}-{}", platform, env));

        let libraries = match detailed {
            Some(d) => params.libraries.merged_with(&d.libraries),
            None => params.libraries.clone(),
        };

        let test_args = detailed
            .and_then(|d| d.test_args.clone())
            .or_else(|| params.test_args.clone());

        // Docs builds run no tests, so they report no coverage
        let coverage = match task {
            TaskKind::Test => params.coverage.clone(),
            TaskKind::Docs => None,
        };

        Ok(TestJob {
            name,
            env,
            platform,
            python,
            task,
            pinning: spec.pinning.unwrap_or(Pinning::Stable),
            parallel: params.parallel.unwrap_or(false),
            coverage,
            dependency_filter: params.dependency_filter.clone(),
            submodules: params.submodules.unwrap_or(true),
            libraries,
            test_args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Libraries, MatrixEntrySpec, Platform};
    use std::collections::BTreeMap;

    fn shorthand(platform: Platform, env: &str) -> MatrixEntry {
        let mut map = BTreeMap::new();
        map.insert(platform, env.to_string());
        MatrixEntry::Shorthand(map)
    }

    fn test_template(envs: Vec<MatrixEntry>) -> JobTemplate {
        JobTemplate {
            template: "run-test-env".into(),
            parameters: TemplateParameters {
                default_python: Some("3.11".into()),
                coverage: Some("codecov".into()),
                dependency_filter: Some("pinfilter".into()),
                parallel: Some(true),
                envs,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_defaults_are_inherited() {
        let job = test_template(vec![shorthand(Platform::Linux, "py310-test")]);
        let jobs = MatrixExpander::expand("tests", &job).unwrap();

        assert_eq!(jobs.len(), 1);
        let j = &jobs[0];
        assert_eq!(j.name, "linux-py310-test");
        assert_eq!(j.python, "3.10");
        assert_eq!(j.task, TaskKind::Test);
        assert_eq!(j.pinning, Pinning::Stable);
        assert!(j.parallel);
        assert!(j.submodules);
        assert_eq!(j.coverage.as_deref(), Some("codecov"));
        assert_eq!(j.dependency_filter.as_deref(), Some("pinfilter"));
    }

    #[test]
    fn test_env_without_interpreter_uses_default() {
        let job = test_template(vec![shorthand(Platform::Linux, "docs")]);
        let jobs = MatrixExpander::expand("tests", &job).unwrap();

        assert_eq!(jobs[0].python, "3.11");
        assert_eq!(jobs[0].task, TaskKind::Docs);
    }

    #[test]
    fn test_no_interpreter_anywhere_is_an_error() {
        let mut job = test_template(vec![shorthand(Platform::Linux, "docs")]);
        job.parameters.default_python = None;

        let result = MatrixExpander::expand("tests", &job);
        assert!(matches!(
            result,
            Err(StagehandError::InvalidMatrixEnv { .. })
        ));
    }

    #[test]
    fn test_docs_build_suppresses_coverage() {
        let job = test_template(vec![shorthand(Platform::Linux, "py311-docs")]);
        let jobs = MatrixExpander::expand("tests", &job).unwrap();

        assert_eq!(jobs[0].task, TaskKind::Docs);
        assert_eq!(jobs[0].coverage, None);
    }

    #[test]
    fn test_pinning_variants() {
        let job = test_template(vec![
            shorthand(Platform::Linux, "py39-test-oldestdeps"),
            shorthand(Platform::Linux, "py312-test-devdeps"),
        ]);
        let jobs = MatrixExpander::expand("tests", &job).unwrap();

        assert_eq!(jobs[0].pinning, Pinning::Oldest);
        assert_eq!(jobs[0].python, "3.9");
        assert_eq!(jobs[1].pinning, Pinning::Dev);
        assert_eq!(jobs[1].python, "3.12");
    }

    #[test]
    fn test_detailed_entry_overrides_and_merges() {
        let mut job = test_template(vec![MatrixEntry::Detailed(MatrixEntrySpec {
            platform: Platform::Linux,
            env: "py311-test".into(),
            name: Some("figure-tests".into()),
            python: Some("3.11.4".into()),
            libraries: Libraries {
                apt: vec!["graphviz".into()],
                yum: vec![],
            },
            test_args: Some("-m figures".into()),
        })]);
        job.parameters.libraries = Libraries {
            apt: vec!["libfftw3-dev".into()],
            yum: vec!["fftw-devel".into()],
        };

        let jobs = MatrixExpander::expand("tests", &job).unwrap();
        let j = &jobs[0];

        assert_eq!(j.name, "figure-tests");
        assert_eq!(j.python, "3.11.4");
        // Entry libraries merge with job-level libraries, never replace them
        assert_eq!(j.libraries.apt, vec!["libfftw3-dev", "graphviz"]);
        assert_eq!(j.libraries.yum, vec!["fftw-devel"]);
        assert_eq!(j.test_args.as_deref(), Some("-m figures"));
    }

    #[test]
    fn test_unknown_segment_is_an_error() {
        let job = test_template(vec![shorthand(Platform::Linux, "py311-bench")]);
        let result = MatrixExpander::expand("tests", &job);

        assert!(matches!(
            result,
            Err(StagehandError::InvalidMatrixEnv { .. })
        ));
    }

    #[test]
    fn test_empty_matrix_is_an_error() {
        let job = test_template(vec![]);
        let result = MatrixExpander::expand("tests", &job);

        assert!(matches!(result, Err(StagehandError::EmptyMatrix { .. })));
    }

    #[test]
    fn test_parse_env_token_versions() {
        assert_eq!(parse_env_token("py39-test").unwrap().python.as_deref(), Some("3.9"));
        assert_eq!(
            parse_env_token("py310-test").unwrap().python.as_deref(),
            Some("3.10")
        );
        assert!(parse_env_token("py311-test-oldestdeps-devdeps").is_err());
        assert!(parse_env_token("py311-test-docs").is_err());
        assert!(parse_env_token("").is_err());
    }
}
