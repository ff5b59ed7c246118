// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
mod event_bus;
mod patch_applier;
mod pipeline;
mod session_registry;

pub use event_bus::{EventBus, Sink};
pub use patch_applier::apply as apply_patch_plan;
pub use pipeline::{FailureReason, PipelineEngine, StepSpec, STEP_PROGRAM};
pub use session_registry::SessionRegistry;
