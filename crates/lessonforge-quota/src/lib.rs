// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
mod cost_tracker;
mod rate_limiter;

pub use cost_tracker::{CostTracker, ProposedCharge};
pub use rate_limiter::KeyedRateLimiter;
