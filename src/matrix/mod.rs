// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Test matrix expansion: shorthand (platform, interpreter, flags) entries
//! into concrete test jobs.

mod expander;
mod job;

pub use expander::MatrixExpander;
pub use job::{Pinning, TaskKind, TestJob};
