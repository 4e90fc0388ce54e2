// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Pipeline descriptor structures
//!
//! Defines the schema for .stagehand.yaml files.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Ref prefix for branch references
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Ref prefix for tag references; upload gating keys off this
pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// Pipeline descriptor from .stagehand.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Descriptor version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Push trigger rules (branch and tag filters)
    #[serde(default)]
    pub trigger: TriggerRules,

    /// Pull-request trigger rules
    #[serde(default)]
    pub pr: PrRules,

    /// Scheduled-run rules
    #[serde(default)]
    pub schedules: Vec<Schedule>,

    /// Pipeline variable bindings, visible to condition expressions
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Stages in declaration order
    pub stages: Vec<Stage>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Pipeline {
    /// Load descriptor from a YAML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::StagehandError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::StagehandError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        })?;

        Self::from_yaml(&content)
    }

    /// Parse descriptor from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, crate::StagehandError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize descriptor to YAML
    pub fn to_yaml(&self) -> Result<String, crate::StagehandError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Get all stage names
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Stages holding the standard test matrices (neither cron-only nor release)
    pub fn test_stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter().filter(|s| !s.cron && !s.release)
    }

    /// Stages only instantiated on scheduled runs
    pub fn cron_stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter().filter(|s| s.cron)
    }

    /// The release-packaging stage, if declared
    pub fn release_stage(&self) -> Option<&Stage> {
        self.stages.iter().find(|s| s.release)
    }

    /// Count jobs carrying a package-index credential across the pipeline
    pub fn upload_target_count(&self) -> usize {
        self.stages
            .iter()
            .flat_map(|s| s.jobs.iter())
            .filter(|j| j.parameters.credential.is_some())
            .count()
    }
}

/// A single pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name (must be unique within the pipeline)
    pub name: String,

    /// Human-readable stage name
    #[serde(default)]
    pub display_name: Option<String>,

    /// Stage dependencies (other stage names, empty for parallel entry points)
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Condition expression over build metadata gating instantiation
    #[serde(default)]
    pub condition: Option<String>,

    /// Only instantiated on scheduled runs; never waits on other stages
    #[serde(default)]
    pub cron: bool,

    /// Release-packaging stage; activation and upload are gated separately
    #[serde(default)]
    pub release: bool,

    /// Jobs instantiated from external templates
    #[serde(default)]
    pub jobs: Vec<JobTemplate>,
}

impl Stage {
    /// Name shown in rendered plans
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Reference to an externally-maintained job template plus its parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTemplate {
    /// Template name (owned by the external template collaborator)
    pub template: String,

    /// Parameter mapping passed to the template
    #[serde(default)]
    pub parameters: TemplateParameters,
}

/// Parameters understood by the external job templates.
///
/// Unknown keys are rejected so typos surface at parse time instead of being
/// silently dropped at the template boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateParameters {
    /// Default interpreter version for matrix entries that don't pin one
    #[serde(default)]
    pub default_python: Option<String>,

    /// Check out submodules before running
    #[serde(default)]
    pub submodules: Option<bool>,

    /// Coverage reporting backend name (e.g. "codecov")
    #[serde(default)]
    pub coverage: Option<String>,

    /// Dependency-resolution filter tool name
    #[serde(default)]
    pub dependency_filter: Option<String>,

    /// Request intra-job parallel test execution from the test runner
    #[serde(default)]
    pub parallel: Option<bool>,

    /// Extra arguments appended to the test command
    #[serde(default)]
    pub test_args: Option<String>,

    /// Matrix entries expanded into individual test jobs
    #[serde(default)]
    pub envs: Vec<MatrixEntry>,

    /// Extra system packages installed before the test run, for every entry
    #[serde(default)]
    pub libraries: Libraries,

    /// Artifact kinds built by the release template
    #[serde(default)]
    pub artifacts: Vec<ArtifactKind>,

    /// Package index targeted by the release template
    #[serde(default)]
    pub index: Option<String>,

    /// Package-index credential identifier; presence selects the upload target
    #[serde(default)]
    pub credential: Option<String>,
}

/// One matrix entry: a (platform, env, flags) combination.
///
/// The shorthand form `- linux: py311-test` names the platform as the key; the
/// detailed form spells out overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatrixEntry {
    /// `- linux: py311-test-oldestdeps`
    Shorthand(BTreeMap<Platform, String>),

    /// Entry with per-entry overrides
    Detailed(MatrixEntrySpec),
}

impl MatrixEntry {
    /// The platform this entry targets, if well-formed
    pub fn platform(&self) -> Option<Platform> {
        match self {
            Self::Shorthand(map) if map.len() == 1 => map.keys().next().copied(),
            Self::Shorthand(_) => None,
            Self::Detailed(spec) => Some(spec.platform),
        }
    }

    /// The env token for this entry, if well-formed
    pub fn env(&self) -> Option<&str> {
        match self {
            Self::Shorthand(map) if map.len() == 1 => map.values().next().map(String::as_str),
            Self::Shorthand(_) => None,
            Self::Detailed(spec) => Some(&spec.env),
        }
    }
}

/// Detailed matrix entry with overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixEntrySpec {
    /// Target platform
    pub platform: Platform,

    /// Env token (interpreter version, task, pinning variant)
    pub env: String,

    /// Override the generated job name
    #[serde(default)]
    pub name: Option<String>,

    /// Override the interpreter version encoded in the env token
    #[serde(default)]
    pub python: Option<String>,

    /// Extra system packages for this entry, merged with the job-level set
    #[serde(default)]
    pub libraries: Libraries,

    /// Override the job-level test arguments
    #[serde(default)]
    pub test_args: Option<String>,
}

/// Target platform for a matrix entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Extra system packages grouped by package manager
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Libraries {
    /// Packages installed with apt on Debian-based images
    #[serde(default)]
    pub apt: Vec<String>,

    /// Packages installed with yum on RPM-based images
    #[serde(default)]
    pub yum: Vec<String>,
}

impl Libraries {
    /// True when no packages are requested
    pub fn is_empty(&self) -> bool {
        self.apt.is_empty() && self.yum.is_empty()
    }

    /// Merge another set into this one, keeping both
    pub fn merged_with(&self, other: &Libraries) -> Libraries {
        let mut apt = self.apt.clone();
        apt.extend(other.apt.iter().cloned());
        let mut yum = self.yum.clone();
        yum.extend(other.yum.iter().cloned());
        Libraries { apt, yum }
    }
}

/// Distributable artifact kinds built by the release template
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Platform-independent wheel
    Wheel,
    /// Source distribution
    Sdist,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wheel => write!(f, "wheel"),
            Self::Sdist => write!(f, "sdist"),
        }
    }
}

/// Push trigger rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRules {
    /// Branch name filter
    #[serde(default = "RefRules::include_all")]
    pub branches: RefRules,

    /// Tag name filter
    #[serde(default)]
    pub tags: RefRules,
}

impl Default for TriggerRules {
    fn default() -> Self {
        Self {
            branches: RefRules::include_all(),
            tags: RefRules::default(),
        }
    }
}

/// Pull-request trigger rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrRules {
    /// Target branch filter
    #[serde(default = "RefRules::include_all")]
    pub branches: RefRules,

    /// Cancel in-flight runs when a newer commit supersedes the pull request.
    /// Declared policy only; cancellation belongs to the orchestrator.
    #[serde(default = "default_true")]
    pub autocancel: bool,
}

impl Default for PrRules {
    fn default() -> Self {
        Self {
            branches: RefRules::include_all(),
            autocancel: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Glob include/exclude lists over ref names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefRules {
    /// Globs a name must match to be included
    #[serde(default)]
    pub include: Vec<String>,

    /// Globs that exclude a name even when included
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl RefRules {
    /// Rules matching every name
    pub fn include_all() -> Self {
        Self {
            include: vec!["*".to_string()],
            exclude: vec![],
        }
    }
}

/// A scheduled-run rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// Five-field cron expression
    pub cron: String,

    /// Human-readable schedule name
    #[serde(default)]
    pub display_name: Option<String>,

    /// Branches the schedule applies to
    #[serde(default = "RefRules::include_all")]
    pub branches: RefRules,

    /// Run even when nothing changed since the last scheduled run
    #[serde(default)]
    pub always: bool,
}
