// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Descriptor schema, dependency DAG, and validation.

mod dag;
mod definition;
mod validation;

pub use dag::StageDag;
pub use definition::{
    ArtifactKind, JobTemplate, Libraries, MatrixEntry, MatrixEntrySpec, Pipeline, Platform,
    PrRules, RefRules, Schedule, Stage, TemplateParameters, TriggerRules, BRANCH_REF_PREFIX,
    TAG_REF_PREFIX,
};
pub use validation::{DescriptorValidator, ValidationResult};
