// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Error types for descriptor parsing, validation, and plan expansion.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for stagehand operations
pub type StagehandResult<T> = Result<T, StagehandError>;

/// Main error type for stagehand
#[derive(Error, Debug, Diagnostic)]
pub enum StagehandError {
    // ─────────────────────────────────────────────────────────────────────────
    // Descriptor Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Descriptor file not found: {path}")]
    #[diagnostic(
        code(stagehand::descriptor_not_found),
        help("Create a descriptor with 'stagehand init' or create .stagehand.yaml manually")
    )]
    DescriptorNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(stagehand::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Invalid descriptor: {reason}")]
    #[diagnostic(code(stagehand::invalid_descriptor))]
    InvalidDescriptor {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Stage '{stage}' is invalid: {reason}")]
    #[diagnostic(code(stagehand::invalid_stage))]
    InvalidStage { stage: String, reason: String },

    #[error("Circular dependency detected")]
    #[diagnostic(
        code(stagehand::circular_dependency),
        help("Review your stage dependencies to remove the cycle")
    )]
    CircularDependency { stages: Vec<String> },

    #[error("Stage '{stage}' depends on unknown stage '{dependency}'")]
    #[diagnostic(
        code(stagehand::unknown_dependency),
        help("Check that '{dependency}' is defined in your descriptor")
    )]
    UnknownDependency { stage: String, dependency: String },

    #[error("Stage '{stage}' not found in descriptor")]
    #[diagnostic(code(stagehand::stage_not_found))]
    StageNotFound { stage: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Condition Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to parse condition '{expression}' at offset {offset}: {message}")]
    #[diagnostic(
        code(stagehand::condition_parse),
        help("Conditions use and(), or(), not(), eq(), ne(), startsWith(), endsWith(), contains(), succeeded(), 'literals', and variables['Name']")
    )]
    ConditionParse {
        expression: String,
        offset: usize,
        message: String,
    },

    #[error("Condition '{expression}' evaluation failed: {message}")]
    #[diagnostic(code(stagehand::condition_eval))]
    ConditionEval { expression: String, message: String },

    #[error("Condition references unknown metadata field '{field}'")]
    #[diagnostic(
        code(stagehand::unknown_metadata_field),
        help("Known fields: Build.Reason, Build.SourceBranch, Build.SourceBranchName, Build.DefaultBranch, plus variables declared in the descriptor")
    )]
    UnknownMetadataField { field: String, expression: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Trigger Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid source reference: '{reference}'")]
    #[diagnostic(
        code(stagehand::invalid_ref),
        help("References take the form 'refs/heads/<branch>' or 'refs/tags/<tag>'")
    )]
    InvalidRef { reference: String },

    #[error("Invalid cron expression '{cron}': {reason}")]
    #[diagnostic(
        code(stagehand::invalid_cron),
        help("Schedules use five space-separated cron fields: minute hour day-of-month month day-of-week")
    )]
    InvalidCron { cron: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Matrix Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid matrix env '{env}': {reason}")]
    #[diagnostic(
        code(stagehand::invalid_matrix_env),
        help("Env tokens look like 'py311-test', 'py310-test-oldestdeps', or 'py312-docs'")
    )]
    InvalidMatrixEnv { env: String, reason: String },

    #[error("Stage '{stage}' declares a test template with no matrix entries")]
    #[diagnostic(code(stagehand::empty_matrix))]
    EmptyMatrix { stage: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Release Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Descriptor selects {count} upload targets; at most one is allowed")]
    #[diagnostic(
        code(stagehand::multiple_upload_targets),
        help("Only one job may carry a package-index credential")
    )]
    MultipleUploadTargets { count: usize },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/Parse Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(stagehand::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(stagehand::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(stagehand::json_error))]
    Json { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(stagehand::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for StagehandError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for StagehandError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for StagehandError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<glob::PatternError> for StagehandError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl StagehandError {
    /// Create a condition parse error at a byte offset within the expression
    pub fn condition_parse(expression: &str, offset: usize, message: impl Into<String>) -> Self {
        Self::ConditionParse {
            expression: expression.to_string(),
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid matrix env error
    pub fn invalid_env(env: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMatrixEnv {
            env: env.to_string(),
            reason: reason.into(),
        }
    }
}
