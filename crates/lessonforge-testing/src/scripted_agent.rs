// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use lessonforge_dispatcher::{AgentHandle, AgentRequest, AgentResponse};
use lessonforge_types::CoreError;

/// One scripted outcome for a single `invoke` call.
pub enum ScriptedOutcome {
    Success(AgentResponse),
    Failure(CoreError),
}

/// A pre-scripted agent handle. Each call to `invoke` for a given agent
/// name pops the next outcome from that agent's queue. Panics (in test
/// code, loudly, by design) if a queue is exhausted, so a test's mock setup
/// stays honest about how many calls it expects.
pub struct ScriptedAgentHandle {
    scripts: Mutex<HashMap<String, Vec<ScriptedOutcome>>>,
    pub calls: Mutex<Vec<(String, AgentRequest)>>,
}

impl ScriptedAgentHandle {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a sequence of outcomes for `agent`, returned in order across
    /// successive `invoke` calls for that agent.
    pub fn script(mut self, agent: impl Into<String>, outcomes: Vec<ScriptedOutcome>) -> Self {
        self.scripts.get_mut().unwrap().insert(agent.into(), outcomes);
        self
    }

    /// Convenience: an agent that always succeeds with the given response.
    pub fn always_succeeds(agent: impl Into<String>, response: AgentResponse) -> Self {
        Self::new().script(agent, vec![ScriptedOutcome::Success(response)])
    }
}

impl Default for ScriptedAgentHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentHandle for ScriptedAgentHandle {
    async fn invoke(&self, agent: &str, request: AgentRequest) -> Result<AgentResponse, CoreError> {
        self.calls.lock().unwrap().push((agent.to_string(), request));
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts
            .get_mut(agent)
            .unwrap_or_else(|| panic!("no script registered for agent '{agent}'"));
        if queue.is_empty() {
            panic!("script exhausted for agent '{agent}'");
        }
        match queue.remove(0) {
            ScriptedOutcome::Success(response) => Ok(response),
            ScriptedOutcome::Failure(error) => Err(error),
        }
    }
}

/// Build an `AgentResponse` with a single string artifact, for tests that
/// don't care about the rest of the shape.
pub fn response_with(artifacts: Vec<(&str, serde_json::Value)>) -> AgentResponse {
    AgentResponse {
        artifacts: artifacts.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        ..Default::default()
    }
}

/// Build an `AgentResponse` carrying token-usage metrics, for cost-tracking
/// tests.
pub fn response_with_usage(
    artifacts: Vec<(&str, serde_json::Value)>,
    input_tokens: f64,
    output_tokens: f64,
) -> AgentResponse {
    let mut response = response_with(artifacts);
    response.metrics.insert("input_tokens".to_string(), input_tokens);
    response.metrics.insert("output_tokens".to_string(), output_tokens);
    response
}
