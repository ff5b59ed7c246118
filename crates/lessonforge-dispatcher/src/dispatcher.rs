// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lessonforge_types::CoreError;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::token::TokenProvider;
use crate::types::{AgentErrorBody, AgentRequest, AgentResponse};

/// Public contract of C4: `invoke(agent name, request) -> response | error`.
/// Implementations hold no mutable state across calls (spec.md §5) — any
/// per-call state (deadline, token) is local to that call.
#[async_trait]
pub trait AgentHandle: Send + Sync {
    async fn invoke(&self, agent: &str, request: AgentRequest) -> Result<AgentResponse, CoreError>;
}

/// HTTP-backed dispatcher: resolves `agent` to a base URL, acquires a token,
/// POSTs the request, and classifies the outcome per spec.md §4.4 step 4.
pub struct HttpAgentDispatcher {
    client: reqwest::Client,
    base_urls: HashMap<String, String>,
    tokens: Arc<dyn TokenProvider>,
    step_timeout: Duration,
}

impl HttpAgentDispatcher {
    pub fn new(
        base_urls: HashMap<String, String>,
        tokens: Arc<dyn TokenProvider>,
        step_timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_urls,
            tokens,
            step_timeout,
        }
    }

    fn classify_status(status: StatusCode) -> CoreError {
        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            CoreError::TransientAgent(format!("http {status}"))
        } else {
            CoreError::TerminalAgent(format!("http {status}"))
        }
    }
}

#[async_trait]
impl AgentHandle for HttpAgentDispatcher {
    async fn invoke(&self, agent: &str, request: AgentRequest) -> Result<AgentResponse, CoreError> {
        let base_url = self
            .base_urls
            .get(agent)
            .ok_or_else(|| CoreError::TerminalAgent(format!("unknown agent: {agent}")))?;

        let token = self.tokens.acquire(agent).await.map_err(|e| {
            warn!(agent, "token acquisition failed");
            CoreError::TerminalAgent(format!("token acquisition failed: {e}"))
        })?;

        debug!(agent, step = %request.step_name, "dispatching agent invocation");

        let send = self
            .client
            .post(base_url)
            .bearer_auth(token)
            .json(&request)
            .timeout(self.step_timeout)
            .send();

        let response = match tokio::time::timeout(self.step_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => {
                return Err(CoreError::TransientAgent(format!("request timed out: {e}")))
            }
            Ok(Err(e)) if e.is_connect() => {
                return Err(CoreError::TransientAgent(format!("connection failed: {e}")))
            }
            Ok(Err(e)) => return Err(CoreError::TransientAgent(format!("request failed: {e}"))),
            Err(_) => return Err(CoreError::TransientAgent("step timeout elapsed".into())),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<AgentErrorBody>().await.ok();
            if let Some(body) = body {
                if body.non_retryable {
                    return Err(CoreError::TerminalAgent(
                        body.message.unwrap_or_else(|| format!("http {status}")),
                    ));
                }
            }
            return Err(Self::classify_status(status));
        }

        response
            .json::<AgentResponse>()
            .await
            .map_err(|e| CoreError::TerminalAgent(format!("response schema mismatch: {e}")))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
