// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Concrete test jobs produced by matrix expansion

use serde::Serialize;

use crate::descriptor::{Libraries, Platform};

/// What a matrix job does
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Run the test suite
    Test,
    /// Build documentation instead of running tests
    Docs,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Docs => write!(f, "docs"),
        }
    }
}

/// Dependency-pinning strategy for a matrix job
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Pinning {
    /// Default resolution against stable releases
    Stable,
    /// Pin to the oldest supported versions
    Oldest,
    /// Resolve development pre-releases
    Dev,
}

impl std::fmt::Display for Pinning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Oldest => write!(f, "oldestdeps"),
            Self::Dev => write!(f, "devdeps"),
        }
    }
}

/// One expanded test job: a single (platform, interpreter, flags) combination
/// with the shared defaults already folded in
#[derive(Debug, Clone, Serialize)]
pub struct TestJob {
    /// Generated or overridden job name
    pub name: String,

    /// Original env token the job was expanded from
    pub env: String,

    /// Target platform
    pub platform: Platform,

    /// Interpreter version, e.g. "3.11"
    pub python: String,

    /// Test run or docs build
    pub task: TaskKind,

    /// Dependency-pinning strategy
    pub pinning: Pinning,

    /// Intra-job parallel test execution requested from the test runner
    pub parallel: bool,

    /// Coverage reporting backend; never set for docs builds
    pub coverage: Option<String>,

    /// Dependency-resolution filter tool
    pub dependency_filter: Option<String>,

    /// Check out submodules before running
    pub submodules: bool,

    /// System packages to install before the run
    pub libraries: Libraries,

    /// Extra arguments for the test command
    pub test_args: Option<String>,
}
