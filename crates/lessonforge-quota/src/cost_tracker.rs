// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use lessonforge_config::{Config, ModelRate};
use lessonforge_types::{Budget, RemainingQuota, SessionCostRecord, SessionId};
use tokio::sync::Mutex;

/// What a call would cost, before it is admitted and recorded.
#[derive(Debug, Clone)]
pub enum ProposedCharge {
    Llm {
        model: String,
        input_tokens: u64,
        output_tokens: u64,
    },
    Image {
        count: u64,
    },
}

/// Per-session cost accounting and budget admission control (spec.md §4.6,
/// C6-B). One `CostTracker` is shared by every session the process is
/// currently running; each session gets its own `SessionCostRecord` and
/// `Budget` on first use. Mirrors the invariant enforcement style of
/// `lessonforge_types::cost` — all mutation goes through `track`, never
/// direct field writes, so `total_cost == llm_cost + image_cost` always
/// holds.
pub struct CostTracker {
    model_rates: HashMap<String, ModelRate>,
    default_model_rate: ModelRate,
    image_unit_cost: f64,
    default_budget: Budget,
    records: Mutex<HashMap<SessionId, (SessionCostRecord, Budget)>>,
}

impl CostTracker {
    pub fn new(config: &Config) -> Self {
        Self {
            model_rates: config.model_rates.clone(),
            default_model_rate: config.default_model_rate,
            image_unit_cost: config.image_unit_cost,
            default_budget: Budget {
                max_llm_cost: config.cost_limits.max_llm_cost,
                max_image_cost: config.cost_limits.max_image_cost,
                max_total_cost: config.cost_limits.max_total_cost,
                max_llm_calls: config.cost_limits.max_llm_calls,
                max_image_calls: config.cost_limits.max_image_calls,
            },
            records: Mutex::new(HashMap::new()),
        }
    }

    fn model_rate(&self, model: &str) -> ModelRate {
        self.model_rates
            .get(model)
            .copied()
            .unwrap_or(self.default_model_rate)
    }

    fn charge_cost(&self, charge: &ProposedCharge) -> (f64, f64) {
        match charge {
            ProposedCharge::Llm {
                model,
                input_tokens,
                output_tokens,
            } => {
                let rate = self.model_rate(model);
                let cost = *input_tokens as f64 * rate.input_rate
                    + *output_tokens as f64 * rate.output_rate;
                (cost, 0.0)
            }
            ProposedCharge::Image { count } => (0.0, *count as f64 * self.image_unit_cost),
        }
    }

    /// Register a session with a budget override (e.g. a caller-supplied
    /// per-request ceiling tighter than the process default). If never
    /// called for a session, `track` lazily registers it with the process
    /// default budget.
    pub async fn register(&self, session: SessionId, budget: Budget) {
        self.records
            .lock()
            .await
            .insert(session, (SessionCostRecord::new(), budget));
    }

    fn fits(record: &SessionCostRecord, budget: &Budget, llm_delta: f64, image_delta: f64, is_llm: bool, is_image: bool) -> bool {
        let projected_llm = record.llm_cost + llm_delta;
        let projected_image = record.image_cost + image_delta;
        let projected_total = projected_llm + projected_image;
        if let Some(max) = budget.max_llm_cost {
            if projected_llm > max {
                return false;
            }
        }
        if let Some(max) = budget.max_image_cost {
            if projected_image > max {
                return false;
            }
        }
        if let Some(max) = budget.max_total_cost {
            if projected_total > max {
                return false;
            }
        }
        if is_llm {
            if let Some(max) = budget.max_llm_calls {
                if record.llm_calls + 1 > max {
                    return false;
                }
            }
        }
        if is_image {
            if let Some(max) = budget.max_image_calls {
                if record.image_calls + 1 > max {
                    return false;
                }
            }
        }
        true
    }

    /// Would `charge` be admitted without exceeding the session's budget?
    /// Does not mutate state — callers that want atomic check-and-record
    /// should call `track` directly, which performs both under one lock.
    pub async fn would_admit(&self, session: SessionId, charge: ProposedCharge) -> bool {
        let mut records = self.records.lock().await;
        let (record, budget) = records
            .entry(session)
            .or_insert_with(|| (SessionCostRecord::new(), self.default_budget));
        let (llm_delta, image_delta) = self.charge_cost(&charge);
        let is_llm = matches!(charge, ProposedCharge::Llm { .. });
        Self::fits(record, budget, llm_delta, image_delta, is_llm, !is_llm)
    }

    /// Record a charge unconditionally and return the updated record.
    /// Deliberately never denies: the call the charge represents has
    /// already happened, so its real cost must be counted even if it pushes
    /// the session over budget (spec.md §8 S5 — "the cost tracker records
    /// the call" before "the next admission check denies"). Callers that
    /// need to decide whether to make the call at all should check `admit`
    /// first.
    pub async fn track(&self, session: SessionId, charge: ProposedCharge) -> SessionCostRecord {
        let mut records = self.records.lock().await;
        let (record, _budget) = records
            .entry(session)
            .or_insert_with(|| (SessionCostRecord::new(), self.default_budget));
        let (llm_delta, image_delta) = self.charge_cost(&charge);
        let is_llm = matches!(charge, ProposedCharge::Llm { .. });
        record.llm_cost += llm_delta;
        record.image_cost += image_delta;
        if is_llm {
            record.llm_calls += 1;
        } else {
            record.image_calls += 1;
        }
        record.last_updated = chrono::Utc::now();
        *record
    }

    /// Convenience wrapper over `track` for LLM calls, matching spec.md
    /// §4.6's `track_llm(session id, model, input tokens, output tokens)`.
    pub async fn track_llm(
        &self,
        session: SessionId,
        model: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
    ) -> SessionCostRecord {
        self.track(
            session,
            ProposedCharge::Llm {
                model: model.into(),
                input_tokens,
                output_tokens,
            },
        )
        .await
    }

    /// Convenience wrapper over `track` for image calls, matching spec.md
    /// §4.6's `track_image(session id, count)`.
    pub async fn track_image(&self, session: SessionId, count: u64) -> SessionCostRecord {
        self.track(session, ProposedCharge::Image { count }).await
    }

    /// Non-mutating admission check, matching spec.md §4.6's
    /// `admit(session id)` — callers that only need a yes/no answer before
    /// deciding whether to make the call at all.
    pub async fn admit(&self, session: SessionId, charge: ProposedCharge) -> bool {
        self.would_admit(session, charge).await
    }

    pub async fn remaining(&self, session: SessionId) -> RemainingQuota {
        let mut records = self.records.lock().await;
        let (record, budget) = records
            .entry(session)
            .or_insert_with(|| (SessionCostRecord::new(), self.default_budget));
        RemainingQuota::from_budget(budget, record)
    }

    pub async fn snapshot(&self, session: SessionId) -> Option<SessionCostRecord> {
        self.records.lock().await.get(&session).map(|(r, _)| *r)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_limits(max_total: f64) -> Config {
        let mut cfg = Config::default();
        cfg.cost_limits.max_total_cost = Some(max_total);
        cfg.default_model_rate = ModelRate {
            input_rate: 1.0,
            output_rate: 1.0,
        };
        cfg
    }

    #[tokio::test]
    async fn track_records_actual_cost() {
        let tracker = CostTracker::new(&config_with_limits(100.0));
        let session = SessionId::new();
        let record = tracker
            .track_llm(session, "gpt", 10, 10)
            .await;
        assert_eq!(record.llm_cost, 20.0);
        assert_eq!(record.llm_calls, 1);
    }

    #[tokio::test]
    async fn track_records_cost_even_past_budget() {
        // spec: a call that already happened is always counted, even if its
        // real cost overshoots the budget — denial happens on the *next*
        // admission check, not retroactively on this one.
        let tracker = CostTracker::new(&config_with_limits(5.0));
        let session = SessionId::new();
        let record = tracker.track_llm(session, "gpt", 10, 10).await;
        assert_eq!(record.llm_cost, 20.0);
    }

    #[tokio::test]
    async fn admit_denies_once_budget_is_exhausted() {
        let tracker = CostTracker::new(&config_with_limits(5.0));
        let session = SessionId::new();
        tracker.track_llm(session, "gpt", 10, 10).await;
        let would_admit = tracker
            .admit(
                session,
                ProposedCharge::Llm {
                    model: "gpt".into(),
                    input_tokens: 1,
                    output_tokens: 0,
                },
            )
            .await;
        assert!(!would_admit);
    }

    #[tokio::test]
    async fn admit_allows_charge_within_budget() {
        let tracker = CostTracker::new(&config_with_limits(100.0));
        let session = SessionId::new();
        let would_admit = tracker
            .admit(
                session,
                ProposedCharge::Llm {
                    model: "gpt".into(),
                    input_tokens: 1,
                    output_tokens: 1,
                },
            )
            .await;
        assert!(would_admit);
    }

    #[tokio::test]
    async fn call_count_limit_independent_of_cost() {
        let mut cfg = Config::default();
        cfg.cost_limits.max_image_calls = Some(1);
        let tracker = CostTracker::new(&cfg);
        let session = SessionId::new();
        tracker.track_image(session, 1).await;
        let would_admit = tracker.admit(session, ProposedCharge::Image { count: 1 }).await;
        assert!(!would_admit);
    }

    #[tokio::test]
    async fn remaining_reflects_budget_minus_used() {
        let tracker = CostTracker::new(&config_with_limits(10.0));
        let session = SessionId::new();
        tracker.track_llm(session, "gpt", 2, 0).await;
        let remaining = tracker.remaining(session).await;
        assert_eq!(remaining.total_cost, Some(8.0));
    }

    #[tokio::test]
    async fn explicit_register_overrides_default_budget() {
        let tracker = CostTracker::new(&config_with_limits(100.0));
        let session = SessionId::new();
        tracker
            .register(
                session,
                Budget {
                    max_total_cost: Some(1.0),
                    ..Default::default()
                },
            )
            .await;
        let would_admit = tracker
            .admit(
                session,
                ProposedCharge::Llm {
                    model: "gpt".into(),
                    input_tokens: 5,
                    output_tokens: 0,
                },
            )
            .await;
        assert!(!would_admit);
    }
}
