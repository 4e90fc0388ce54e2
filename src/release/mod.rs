// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Release artifact and upload gating.

mod publisher;

pub use publisher::{PublishPlan, ReleasePublisher, UploadTarget};
