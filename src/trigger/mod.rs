// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Trigger resolution: event metadata, ref filters, conditions, and the
//! per-stage activation decision.

mod condition;
mod event;
mod matcher;
mod resolver;

pub use condition::{Condition, EvalContext, Value, METADATA_FIELDS};
pub use event::{BuildEvent, BuildReason};
pub use matcher::RefFilter;
pub use resolver::{Activation, SkipReason, StageDecision, TriggerResolver};
