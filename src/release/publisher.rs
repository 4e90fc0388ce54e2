// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Release publishing decisions
//!
//! When the release stage is active, artifacts are always built; whether they
//! are uploaded depends solely on the activating ref. Building without
//! uploading lets a branch run validate the artifacts with no side effects.

use serde::Serialize;
use tracing::debug;

use crate::descriptor::{ArtifactKind, Stage};
use crate::trigger::BuildEvent;

/// Default package index when the descriptor names none
const DEFAULT_INDEX: &str = "pypi";

/// The selected upload destination
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadTarget {
    /// Package index name
    pub index: String,

    /// Credential identifier handed to the upload template
    pub credential: Option<String>,
}

/// What the release stage will do when it runs
#[derive(Debug, Clone, Serialize)]
pub struct PublishPlan {
    /// Artifact kinds to build; always non-empty for an active release stage
    pub artifacts: Vec<ArtifactKind>,

    /// Upload destination, present only for release-tag refs
    pub upload: Option<UploadTarget>,
}

impl PublishPlan {
    /// True when the plan uploads to a package index
    pub fn uploads(&self) -> bool {
        self.upload.is_some()
    }
}

/// Computes the publish plan for an active release stage
pub struct ReleasePublisher;

impl ReleasePublisher {
    /// Decide artifacts and upload target for the release stage.
    ///
    /// Artifacts default to a platform-independent wheel plus an sdist when
    /// the template parameters name none. Upload is selected iff the
    /// activating ref is a tag.
    pub fn plan(stage: &Stage, event: &BuildEvent) -> PublishPlan {
        let params = stage.jobs.first().map(|j| &j.parameters);

        let artifacts = params
            .map(|p| p.artifacts.clone())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| vec![ArtifactKind::Wheel, ArtifactKind::Sdist]);

        let upload = if event.is_tag() {
            Some(UploadTarget {
                index: params
                    .and_then(|p| p.index.clone())
                    .unwrap_or_else(|| DEFAULT_INDEX.to_string()),
                credential: params.and_then(|p| p.credential.clone()),
            })
        } else {
            None
        };

        debug!(
            stage = %stage.name,
            artifacts = artifacts.len(),
            uploads = upload.is_some(),
            "release publish plan"
        );

        PublishPlan { artifacts, upload }
    }
}
