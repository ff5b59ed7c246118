// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use lessonforge_types::SessionId;
use serde::{Deserialize, Serialize};

/// Request carried to a remote agent invocation (spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub session_id: SessionId,
    pub step_name: String,
    pub topic: String,
    pub inputs: HashMap<String, serde_json::Value>,
}

/// Response from a remote agent invocation (spec.md §4.4). `delta` and
/// `next_hint` are optional per spec.md §6 ("optional progress text",
/// "optional hint") — an agent that has neither to report on a given call
/// omits the keys entirely rather than sending `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResponse {
    #[serde(default)]
    pub artifacts: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub delta: Option<String>,
    #[serde(default)]
    pub next_hint: Option<String>,
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
}

/// Body shape the remote agent returns for a non-2xx response, used to
/// distinguish an explicit "do not retry this" marker from a plain 4xx/5xx.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentErrorBody {
    #[serde(default)]
    pub non_retryable: bool,
    #[serde(default)]
    pub message: Option<String>,
}
