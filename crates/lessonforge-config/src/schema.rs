// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-model token pricing used by the cost accumulator (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRate {
    pub input_rate: f64,
    pub output_rate: f64,
}

impl Default for ModelRate {
    fn default() -> Self {
        // Conservative default used for unrecognized models.
        Self {
            input_rate: 0.000_003,
            output_rate: 0.000_015,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalWeights {
    pub lexical: f32,
    pub vector: f32,
}

impl RetrievalWeights {
    /// Normalize so `lexical + vector == 1.0`, per spec.md §4.5 step 3
    /// ("normalize if the caller sets non-normalized weights").
    pub fn normalized(self) -> Self {
        let sum = self.lexical + self.vector;
        if sum <= 0.0 {
            return RetrievalWeights::default();
        }
        Self {
            lexical: self.lexical / sum,
            vector: self.vector / sum,
        }
    }
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            lexical: 0.3,
            vector: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Refill rate, tokens per second.
    pub rate: f64,
    /// Burst capacity.
    pub burst: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            burst: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostLimits {
    pub max_llm_cost: Option<f64>,
    pub max_image_cost: Option<f64>,
    pub max_total_cost: Option<f64>,
    pub max_llm_calls: Option<u64>,
    pub max_image_calls: Option<u64>,
}

/// The full set of options spec.md §6 requires an implementation to
/// recognize, each carrying the stated default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_retries: u32,
    pub retry_base_delay_secs: f64,
    pub step_timeout_secs: f64,
    pub context_top_k: usize,
    pub rate_limiter: RateLimiterConfig,
    pub cost_limits: CostLimits,
    pub model_rates: HashMap<String, ModelRate>,
    pub default_model_rate: ModelRate,
    pub image_unit_cost: f64,
    pub agent_base_urls: HashMap<String, String>,
    pub retrieval_weights: RetrievalWeights,
    pub mmr_lambda: f32,
    pub snippet_length: usize,
    pub bucket_idle_eviction_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_secs: 2.0,
            step_timeout_secs: 300.0,
            context_top_k: 5,
            rate_limiter: RateLimiterConfig::default(),
            cost_limits: CostLimits::default(),
            model_rates: HashMap::new(),
            default_model_rate: ModelRate::default(),
            image_unit_cost: 0.02,
            agent_base_urls: HashMap::new(),
            retrieval_weights: RetrievalWeights::default(),
            mmr_lambda: 0.7,
            snippet_length: 200,
            bucket_idle_eviction_secs: 3600,
        }
    }
}

impl Config {
    pub fn model_rate(&self, model: &str) -> ModelRate {
        self.model_rates
            .get(model)
            .copied()
            .unwrap_or(self.default_model_rate)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
