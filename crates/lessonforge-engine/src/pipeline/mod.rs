// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
mod engine;
mod steps;

pub use engine::{FailureReason, PipelineEngine};
pub use steps::{StepSpec, STEP_PROGRAM};
