// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Closed set of event types. `Final`, `PipelineFailed`, and `SessionError`
/// are terminal: no further events are published for a session after one of
/// them is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Connected,
    StepStart,
    StepDelta,
    StepRetry,
    StepComplete,
    PipelineFailed,
    Final,
    SessionError,
}

impl EventType {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EventType::Final | EventType::PipelineFailed | EventType::SessionError
        )
    }
}

/// An immutable lifecycle event. Events are values; once published they are
/// never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub session_id: SessionId,
    pub step: Option<String>,
    pub payload: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(event_type: EventType, session_id: SessionId) -> Self {
        Self {
            event_type,
            session_id,
            step: None,
            payload: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
