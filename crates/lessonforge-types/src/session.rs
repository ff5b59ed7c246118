// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lesson::LessonDocument;

/// Opaque 128-bit session identifier (spec.md §3: "collision probability
/// negligible, e.g. random 128-bit").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states form a strict progression: `created -> running ->
/// {completed, failed}`. A session may terminate at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

/// Per-step lifecycle. Once a step enters `Completed`, `Failed`, or
/// `Cancelled` it is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Cancelled
        )
    }
}

/// One step's history. Opaque outputs are artifact-name -> serialized value,
/// deliberately untyped because the engine does not interpret most artifact
/// payloads (only `lesson`, `patch_plan`, `images`, `captions`, `summary`
/// carry reserved meaning at specific steps — see `lessonforge-dispatcher`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub outputs: HashMap<String, serde_json::Value>,
    pub error: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StepRecord {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            started_at: None,
            ended_at: None,
            retry_count: 0,
            outputs: HashMap::new(),
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Wall-clock duration of the step, if it has both a start and end time.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) if end >= start => (end - start).to_std().ok(),
            _ => None,
        }
    }
}

/// The merged lesson, visualization references, summary, and timing produced
/// once the pipeline reaches the final step successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResult {
    pub lesson: LessonDocument,
    pub images: HashMap<String, String>,
    pub summary: String,
    pub total_duration: Duration,
    pub completed_at: DateTime<Utc>,
}

/// A single pipeline invocation, owned exclusively by the session registry.
/// Concurrent readers are allowed; mutation requires exclusive access
/// (enforced by the registry, not by this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub topic: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    pub final_result: Option<FinalResult>,
    pub metadata: HashMap<String, String>,
}

impl Session {
    pub fn new(topic: impl Into<String>, metadata: HashMap<String, String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            topic: topic.into(),
            status: SessionStatus::Created,
            created_at: now,
            updated_at: now,
            steps: Vec::new(),
            final_result: None,
            metadata,
        }
    }

    /// Returns the step record by name, if the step program has reached it.
    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn step_mut(&mut self, name: &str) -> Option<&mut StepRecord> {
        self.steps.iter_mut().find(|s| s.name == name)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
