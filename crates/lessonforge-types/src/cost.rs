// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-session cumulative cost. Invariants (spec.md §3): all three cost
/// fields are non-negative and monotonically non-decreasing, and
/// `total_cost == llm_cost + image_cost` at all times — enforced by
/// `lessonforge-quota::CostTracker`, never mutated directly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionCostRecord {
    pub llm_cost: f64,
    pub image_cost: f64,
    pub llm_calls: u64,
    pub image_calls: u64,
    pub last_updated: DateTime<Utc>,
}

impl SessionCostRecord {
    pub fn new() -> Self {
        Self {
            llm_cost: 0.0,
            image_cost: 0.0,
            llm_calls: 0,
            image_calls: 0,
            last_updated: Utc::now(),
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.llm_cost + self.image_cost
    }
}

impl Default for SessionCostRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-session budget ceilings. A `None` field means "no limit" for that
/// dimension.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Budget {
    pub max_llm_cost: Option<f64>,
    pub max_image_cost: Option<f64>,
    pub max_total_cost: Option<f64>,
    pub max_llm_calls: Option<u64>,
    pub max_image_calls: Option<u64>,
}

/// Snapshot of remaining quota against a budget, for publication in event
/// payloads and denial responses (spec.md §4.6, §7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RemainingQuota {
    pub llm_cost: Option<f64>,
    pub image_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub llm_calls: Option<u64>,
    pub image_calls: Option<u64>,
}

impl RemainingQuota {
    pub fn from_budget(budget: &Budget, used: &SessionCostRecord) -> Self {
        Self {
            llm_cost: budget.max_llm_cost.map(|m| (m - used.llm_cost).max(0.0)),
            image_cost: budget
                .max_image_cost
                .map(|m| (m - used.image_cost).max(0.0)),
            total_cost: budget
                .max_total_cost
                .map(|m| (m - used.total_cost()).max(0.0)),
            llm_calls: budget
                .max_llm_calls
                .map(|m| m.saturating_sub(used.llm_calls)),
            image_calls: budget
                .max_image_calls
                .map(|m| m.saturating_sub(used.image_calls)),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
