// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Build-event metadata
//!
//! The fields the external orchestrator hands to the descriptor on each
//! trigger: why the build started and which ref it points at.

use serde::{Deserialize, Serialize};

use crate::descriptor::{BRANCH_REF_PREFIX, TAG_REF_PREFIX};
use crate::errors::StagehandError;

/// Why the build was triggered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BuildReason {
    /// A commit was pushed to a branch or a tag was pushed
    Push,
    /// A pull request was opened or updated
    PullRequest,
    /// A scheduled timer fired
    Schedule,
    /// A run was started by hand
    Manual,
}

impl std::fmt::Display for BuildReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "Push"),
            Self::PullRequest => write!(f, "PullRequest"),
            Self::Schedule => write!(f, "Schedule"),
            Self::Manual => write!(f, "Manual"),
        }
    }
}

impl std::str::FromStr for BuildReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "pr" | "pullrequest" | "pull-request" => Ok(Self::PullRequest),
            "schedule" | "cron" => Ok(Self::Schedule),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown build reason: {}", s)),
        }
    }
}

/// One trigger event as seen by the descriptor
#[derive(Debug, Clone, Serialize)]
pub struct BuildEvent {
    /// Trigger reason
    pub reason: BuildReason,

    /// Full source ref, e.g. `refs/heads/main` or `refs/tags/v1.2.3`
    pub source_ref: String,

    /// Target branch for pull-request events
    pub target_branch: Option<String>,

    /// The repository's default branch (short name)
    pub default_branch: String,
}

impl BuildEvent {
    /// Create an event, validating the ref shape
    pub fn new(
        reason: BuildReason,
        source_ref: impl Into<String>,
        default_branch: impl Into<String>,
    ) -> Result<Self, StagehandError> {
        let source_ref = source_ref.into();
        if !source_ref.starts_with(BRANCH_REF_PREFIX) && !source_ref.starts_with(TAG_REF_PREFIX) {
            return Err(StagehandError::InvalidRef {
                reference: source_ref,
            });
        }

        Ok(Self {
            reason,
            source_ref,
            target_branch: None,
            default_branch: default_branch.into(),
        })
    }

    /// Set the pull-request target branch
    pub fn with_target_branch(mut self, target: impl Into<String>) -> Self {
        self.target_branch = Some(target.into());
        self
    }

    /// True when the source ref is a tag
    pub fn is_tag(&self) -> bool {
        self.source_ref.starts_with(TAG_REF_PREFIX)
    }

    /// Branch name for branch refs
    pub fn branch_name(&self) -> Option<&str> {
        self.source_ref.strip_prefix(BRANCH_REF_PREFIX)
    }

    /// Tag name for tag refs
    pub fn tag_name(&self) -> Option<&str> {
        self.source_ref.strip_prefix(TAG_REF_PREFIX)
    }

    /// Last segment of the source ref (branch or tag short name)
    pub fn short_name(&self) -> &str {
        self.source_ref
            .strip_prefix(BRANCH_REF_PREFIX)
            .or_else(|| self.source_ref.strip_prefix(TAG_REF_PREFIX))
            .unwrap_or(&self.source_ref)
    }

    /// True when the event points at the default branch
    pub fn is_default_branch(&self) -> bool {
        self.branch_name() == Some(self.default_branch.as_str())
    }

    /// Full ref form of the default branch
    pub fn default_branch_ref(&self) -> String {
        format!("{}{}", BRANCH_REF_PREFIX, self.default_branch)
    }
}
