// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use lessonforge_config::Config;
use lessonforge_dispatcher::{AgentHandle, AgentRequest, AgentResponse};
use lessonforge_quota::{CostTracker, KeyedRateLimiter, ProposedCharge};
use lessonforge_retriever::Retriever;
use lessonforge_types::{
    CoreError, Event, EventType, FinalResult, LessonDocument, PatchPlan, Session, SessionId,
    SessionStatus, StepRecord, StepStatus,
};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::event_bus::{EventBus, Sink};
use crate::patch_applier;
use crate::pipeline::steps::{step_failure_is_always_terminal, StepSpec, STEP_PROGRAM};
use crate::session_registry::SessionRegistry;

/// Why a pipeline run ended in `failed`, carried in the `pipeline_failed`
/// event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    StepFailed,
    CostLimit,
    Cancelled,
}

impl FailureReason {
    fn as_str(self) -> &'static str {
        match self {
            FailureReason::StepFailed => "step_failed",
            FailureReason::CostLimit => "cost_limit",
            FailureReason::Cancelled => "cancelled",
        }
    }
}

/// Outcome of a single attempt at invoking the step's agent.
enum AttemptOutcome {
    Success(AgentResponse),
    Failed(CoreError),
    Cancelled,
}

/// Ties together the session registry (C1), event bus (C2), agent
/// dispatcher (C4), retriever (C5), and quota manager (C6) into the
/// pipeline engine (C3). Holds only injected handles — no mutable state of
/// its own beyond configuration, per spec.md §5.
pub struct PipelineEngine {
    registry: Arc<SessionRegistry>,
    bus: Arc<EventBus>,
    dispatcher: Arc<dyn AgentHandle>,
    retriever: Arc<Retriever>,
    rate_limiter: Arc<KeyedRateLimiter>,
    cost_tracker: Arc<CostTracker>,
    config: Config,
}

impl PipelineEngine {
    /// Also spawns the rate limiter's idle-bucket sweeper for the lifetime
    /// of the process, since nothing else in this workspace owns that
    /// responsibility and an unswept bucket map grows without bound.
    pub fn new(
        registry: Arc<SessionRegistry>,
        bus: Arc<EventBus>,
        dispatcher: Arc<dyn AgentHandle>,
        retriever: Arc<Retriever>,
        rate_limiter: Arc<KeyedRateLimiter>,
        cost_tracker: Arc<CostTracker>,
        config: Config,
    ) -> Arc<Self> {
        rate_limiter
            .clone()
            .spawn_sweeper(Duration::from_secs(config.bucket_idle_eviction_secs.max(1)));
        Arc::new(Self {
            registry,
            bus,
            dispatcher,
            retriever,
            rate_limiter,
            cost_tracker,
            config,
        })
    }

    /// Gate session creation behind the per-client rate limiter (C6-A),
    /// then allocate the session in the registry (C1). Matches spec.md
    /// §8's S4 scenario.
    pub async fn create_session(
        &self,
        client_key: &str,
        topic: impl Into<String>,
        metadata: HashMap<String, String>,
    ) -> Result<SessionId, CoreError> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(CoreError::InputInvalid("topic must not be empty".into()));
        }
        if !self.rate_limiter.allow(client_key).await {
            return Err(CoreError::QuotaExceeded(format!(
                "rate limit exceeded for client {client_key}"
            )));
        }
        Ok(self.registry.create(topic, metadata).await)
    }

    /// Subscribe to a session's event stream, publishing `connected`
    /// immediately so the subscriber's first observed event is always that
    /// one (spec.md §8 S1).
    pub async fn subscribe(&self, session: SessionId) -> Sink {
        let sink = self.bus.subscribe(session).await;
        self.bus
            .publish(session, Event::new(EventType::Connected, session))
            .await;
        sink
    }

    pub async fn unsubscribe(&self, session: SessionId, sink_id: u64) {
        self.bus.unsubscribe(session, sink_id).await;
    }

    /// A consistent snapshot of a session's registry state, per spec.md
    /// §4.1's `get(session id) -> session record` contract.
    pub async fn session(&self, session: SessionId) -> Option<Session> {
        self.registry.get(session).await
    }

    /// Run the pipeline for `session`, with no cancellation source (never
    /// cancels). Precondition: the session exists and is in state
    /// `created`.
    pub async fn run(&self, session: SessionId) -> Result<(), CoreError> {
        let (_tx, rx) = oneshot::channel();
        self.run_cancellable(session, rx).await
    }

    /// Run the pipeline for `session`, terminating early with
    /// `FailureReason::Cancelled` if `cancel` resolves before completion.
    pub async fn run_cancellable(
        &self,
        session: SessionId,
        mut cancel: oneshot::Receiver<()>,
    ) -> Result<(), CoreError> {
        let Some(existing) = self.registry.get(session).await else {
            return Err(CoreError::InputInvalid(format!("unknown session {session}")));
        };
        if existing.status != SessionStatus::Created {
            return Err(CoreError::InputInvalid(format!(
                "session {session} is not in state created"
            )));
        }

        self.registry
            .update(session, |s| s.status = SessionStatus::Running)
            .await;

        let started = Instant::now();
        let mut outputs: HashMap<String, AgentResponse> = HashMap::new();
        let mut lesson = LessonDocument::default();

        for step in STEP_PROGRAM.iter() {
            self.registry
                .update(session, |s| s.steps.push(StepRecord::pending(step.name)))
                .await;

            if cancel.try_recv().is_ok() {
                self.terminate(session, step.name, FailureReason::Cancelled, started)
                    .await;
                return Err(CoreError::Cancelled);
            }

            self.bus
                .publish(session, Event::new(EventType::StepStart, session).with_step(step.name))
                .await;
            self.registry
                .update(session, |s| {
                    if let Some(record) = s.step_mut(step.name) {
                        record.status = StepStatus::Running;
                        record.started_at = Some(Utc::now());
                    }
                })
                .await;

            if let Some(reason) = self.check_budget(session, step).await {
                self.fail_step(session, step, CoreError::QuotaExceeded("budget exceeded".into()))
                    .await;
                self.terminate(session, step.name, reason, started).await;
                return Err(CoreError::QuotaExceeded("budget exceeded".into()));
            }

            let context = if step.requires_context {
                match self
                    .retriever
                    .search(&existing.topic, &existing.topic, self.config.context_top_k)
                    .await
                {
                    Ok(docs) => format_context(&docs),
                    Err(e) => {
                        warn!(session = %session, step = step.name, error = %e, "retrieval degraded to empty context");
                        String::new()
                    }
                }
            } else {
                String::new()
            };

            let inputs = self.build_inputs(&existing, &outputs, &context);
            let request = AgentRequest {
                session_id: session,
                step_name: step.name.to_string(),
                topic: existing.topic.clone(),
                inputs,
            };

            match self
                .attempt_with_retry(session, step, request, &mut cancel)
                .await
            {
                AttemptOutcome::Success(response) => {
                    match self.apply_step_output(step, &response, &mut outputs, &mut lesson) {
                        Ok(()) => {
                            self.record_billable_cost(session, step, &response).await;
                            self.complete_step(session, step, &response, started).await;
                        }
                        Err(e) => {
                            let error = CoreError::TerminalAgent(format!("shape contract violation: {e}"));
                            self.fail_step(session, step, error.clone()).await;
                            self.terminate(session, step.name, FailureReason::StepFailed, started)
                                .await;
                            return Err(error);
                        }
                    }
                }
                AttemptOutcome::Cancelled => {
                    self.terminate(session, step.name, FailureReason::Cancelled, started)
                        .await;
                    return Err(CoreError::Cancelled);
                }
                AttemptOutcome::Failed(error) => {
                    let retries = self
                        .registry
                        .get(session)
                        .await
                        .and_then(|s| s.step(step.name).map(|r| r.retry_count))
                        .unwrap_or(0);
                    self.fail_step(session, step, error.clone()).await;
                    let always_terminal = step_failure_is_always_terminal(step);
                    let exhausted_retryable = error.kind().is_retryable();
                    if always_terminal || !exhausted_retryable {
                        self.terminate(session, step.name, FailureReason::StepFailed, started)
                            .await;
                        return Err(error);
                    }
                    info!(session = %session, step = step.name, retries, "step exhausted retries; continuing best-effort");
                }
            }
        }

        self.finalize(session, &outputs, lesson, started).await;
        Ok(())
    }

    /// Pre-check the session's remaining budget before dispatching a
    /// billable step (spec.md §8 S5: the check that denies happens before
    /// the *next* call after the budget was already exceeded).
    async fn check_budget(&self, session: SessionId, step: &StepSpec) -> Option<FailureReason> {
        if !step.llm_billable && !step.image_billable {
            return None;
        }
        let remaining = self.cost_tracker.remaining(session).await;
        let exhausted = remaining.total_cost == Some(0.0)
            || (step.llm_billable && remaining.llm_cost == Some(0.0))
            || (step.image_billable && remaining.image_cost == Some(0.0))
            || (step.llm_billable && remaining.llm_calls == Some(0))
            || (step.image_billable && remaining.image_calls == Some(0));
        exhausted.then_some(FailureReason::CostLimit)
    }

    async fn record_billable_cost(&self, session: SessionId, step: &StepSpec, response: &AgentResponse) {
        if step.llm_billable {
            let input_tokens = response.metrics.get("input_tokens").copied().unwrap_or(0.0) as u64;
            let output_tokens = response.metrics.get("output_tokens").copied().unwrap_or(0.0) as u64;
            let _ = self
                .cost_tracker
                .track_llm(session, step.agent, input_tokens, output_tokens)
                .await;
        }
        if step.image_billable {
            let count = response.metrics.get("image_count").copied().unwrap_or(0.0) as u64;
            if count > 0 {
                let _ = self.cost_tracker.track_image(session, count).await;
            }
        }
    }

    fn build_inputs(
        &self,
        session: &Session,
        outputs: &HashMap<String, AgentResponse>,
        context: &str,
    ) -> HashMap<String, serde_json::Value> {
        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), serde_json::json!(session.topic));
        if !context.is_empty() {
            inputs.insert("context".to_string(), serde_json::json!(context));
        }
        for (name, response) in outputs {
            for (key, value) in &response.artifacts {
                inputs.insert(format!("{name}.{key}"), value.clone());
            }
        }
        inputs
    }

    /// Attempt the agent call up to `1 + max_retries` times (spec.md §4.3
    /// step 4). Delay before attempt N is `base_delay * N`, linear backoff
    /// (spec.md §9's recommended choice).
    async fn attempt_with_retry(
        &self,
        session: SessionId,
        step: &StepSpec,
        request: AgentRequest,
        cancel: &mut oneshot::Receiver<()>,
    ) -> AttemptOutcome {
        let max_attempts = 1 + self.config.max_retries;
        let mut last_error = CoreError::TerminalAgent("no attempts made".into());

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                if attempt == 2 {
                    self.bus
                        .publish(
                            session,
                            Event::new(EventType::StepDelta, session)
                                .with_step(step.name)
                                .with_payload("note", serde_json::json!("retrying")),
                        )
                        .await;
                }
                self.bus
                    .publish(
                        session,
                        Event::new(EventType::StepRetry, session)
                            .with_step(step.name)
                            .with_payload("attempt", serde_json::json!(attempt)),
                    )
                    .await;
                self.registry
                    .update(session, |s| {
                        if let Some(record) = s.step_mut(step.name) {
                            record.retry_count += 1;
                        }
                    })
                    .await;

                let delay = Duration::from_secs_f64(self.config.retry_base_delay_secs * attempt as f64);
                tokio::select! {
                    biased;
                    _ = &mut *cancel => return AttemptOutcome::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let invoke = self.dispatcher.invoke(step.agent, request.clone());
            let outcome = tokio::select! {
                biased;
                _ = &mut *cancel => return AttemptOutcome::Cancelled,
                result = invoke => result,
            };

            match outcome {
                Ok(response) => return AttemptOutcome::Success(response),
                Err(error) => {
                    if !error.kind().is_retryable() {
                        return AttemptOutcome::Failed(error);
                    }
                    last_error = error;
                }
            }
        }
        AttemptOutcome::Failed(last_error)
    }

    async fn complete_step(
        &self,
        session: SessionId,
        step: &StepSpec,
        response: &AgentResponse,
        started: Instant,
    ) {
        let remaining = self.cost_tracker.remaining(session).await;
        self.registry
            .update(session, |s| {
                if let Some(record) = s.step_mut(step.name) {
                    record.status = StepStatus::Completed;
                    record.ended_at = Some(Utc::now());
                    for (key, value) in &response.metrics {
                        record
                            .metadata
                            .insert(key.clone(), serde_json::json!(value));
                    }
                    for (key, value) in &response.artifacts {
                        record.outputs.insert(key.clone(), value.clone());
                    }
                }
            })
            .await;
        let duration_ms = self
            .registry
            .get(session)
            .await
            .and_then(|s| s.step(step.name).and_then(|r| r.duration()))
            .map(|d| d.as_millis() as u64)
            .unwrap_or(started.elapsed().as_millis() as u64);
        self.bus
            .publish(
                session,
                Event::new(EventType::StepComplete, session)
                    .with_step(step.name)
                    .with_payload("status", serde_json::json!("completed"))
                    .with_payload("duration_ms", serde_json::json!(duration_ms))
                    .with_payload("remaining_quota", serde_json::to_value(remaining).unwrap_or_default()),
            )
            .await;
    }

    async fn fail_step(&self, session: SessionId, step: &StepSpec, error: CoreError) {
        let retry_count = self
            .registry
            .get(session)
            .await
            .and_then(|s| s.step(step.name).map(|r| r.retry_count))
            .unwrap_or(0);
        let wrapped = error.wrap_step(step.name, retry_count + 1);
        self.registry
            .update(session, |s| {
                if let Some(record) = s.step_mut(step.name) {
                    record.status = StepStatus::Failed;
                    record.ended_at = Some(Utc::now());
                    record.error = Some(wrapped.clone());
                }
            })
            .await;
        self.bus
            .publish(
                session,
                Event::new(EventType::StepComplete, session)
                    .with_step(step.name)
                    .with_payload("status", serde_json::json!("failed"))
                    .with_payload("error", serde_json::json!(wrapped)),
            )
            .await;
    }

    /// Parse and record a step's artifacts into the running output/lesson
    /// state. Returns an error describing a shape-contract violation
    /// (spec.md §6); callers log and continue rather than fail the step,
    /// except where the violation is caught earlier by the dispatcher's own
    /// schema validation.
    fn apply_step_output(
        &self,
        step: &StepSpec,
        response: &AgentResponse,
        outputs: &mut HashMap<String, AgentResponse>,
        lesson: &mut LessonDocument,
    ) -> Result<(), String> {
        match step.name {
            "summarizer" => {
                if !response.artifacts.contains_key("summary") {
                    return Err("summarizer output missing 'summary'".to_string());
                }
            }
            "explainer" => {
                let lesson_json = response
                    .artifacts
                    .get("lesson")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "explainer output missing 'lesson'".to_string())?;
                *lesson = serde_json::from_str(lesson_json)
                    .map_err(|e| format!("explainer lesson schema mismatch: {e}"))?;
            }
            "critic" => {
                if let Some(lesson_json) = response.artifacts.get("lesson").and_then(|v| v.as_str()) {
                    if let Ok(patched) = serde_json::from_str::<LessonDocument>(lesson_json) {
                        *lesson = patched;
                    }
                }
                if let Some(plan_json) = response.artifacts.get("patch_plan").and_then(|v| v.as_str()) {
                    match serde_json::from_str::<PatchPlan>(plan_json) {
                        Ok(plan) => *lesson = patch_applier::apply(lesson.clone(), &plan),
                        Err(e) => warn!(error = %e, "critic patch plan parse failed, preserving base lesson"),
                    }
                }
            }
            "visualizer" => {
                if !response.artifacts.contains_key("images") || !response.artifacts.contains_key("captions") {
                    return Err("visualizer output missing 'images' or 'captions'".to_string());
                }
            }
            _ => {}
        }
        outputs.insert(step.name.to_string(), response.clone());
        Ok(())
    }

    async fn terminate(&self, session: SessionId, step: &str, reason: FailureReason, _started: Instant) {
        self.registry
            .update(session, |s| {
                s.status = SessionStatus::Failed;
                if reason == FailureReason::Cancelled {
                    if let Some(record) = s.step_mut(step) {
                        if !record.status.is_terminal() {
                            record.status = StepStatus::Cancelled;
                            record.ended_at = Some(Utc::now());
                        }
                    }
                }
            })
            .await;
        self.bus
            .publish(
                session,
                Event::new(EventType::PipelineFailed, session)
                    .with_payload("reason", serde_json::json!(reason.as_str())),
            )
            .await;
    }

    async fn finalize(
        &self,
        session: SessionId,
        outputs: &HashMap<String, AgentResponse>,
        lesson: LessonDocument,
        started: Instant,
    ) {
        let summary = outputs
            .get("summarizer")
            .and_then(|r| r.artifacts.get("summary"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let images: HashMap<String, String> = outputs
            .get("visualizer")
            .and_then(|r| r.artifacts.get("images"))
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let final_result = FinalResult {
            lesson,
            images,
            summary,
            total_duration: started.elapsed(),
            completed_at: Utc::now(),
        };

        self.registry
            .update(session, |s| {
                s.status = SessionStatus::Completed;
                s.final_result = Some(final_result.clone());
            })
            .await;

        self.bus
            .publish(
                session,
                Event::new(EventType::Final, session)
                    .with_payload("final", serde_json::to_value(&final_result).unwrap_or_default()),
            )
            .await;
    }
}

fn format_context(docs: &[lessonforge_types::ContextDocument]) -> String {
    docs.iter()
        .map(|d| format!("- {} ({:.2}): {}", d.source, d.combined_score, d.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}
