// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
mod context;
mod cost;
mod error;
mod event;
mod lesson;
mod session;

pub use context::ContextDocument;
pub use cost::{Budget, RemainingQuota, SessionCostRecord};
pub use error::{CoreError, ErrorKind};
pub use event::{Event, EventType};
pub use lesson::{LessonDocument, LessonSection, PatchPlan, PatchPlanItem};
pub use session::{FinalResult, Session, SessionId, SessionStatus, StepRecord, StepStatus};
