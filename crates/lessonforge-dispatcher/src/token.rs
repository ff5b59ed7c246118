// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use lessonforge_types::CoreError;

/// Acquires a short-lived identity token for a target agent (spec.md §4.4
/// step 2). Token-acquisition failure is always classified as terminal —
/// the dispatcher never retries a call it could not authenticate.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire(&self, agent: &str) -> Result<String, CoreError>;
}

/// A provider returning a fixed static token, for deployments that front
/// every agent with the same shared secret rather than per-agent identity.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn acquire(&self, _agent: &str) -> Result<String, CoreError> {
        Ok(self.token.clone())
    }
}
