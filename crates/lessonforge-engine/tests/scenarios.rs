// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lessonforge_config::Config;
use lessonforge_dispatcher::AgentHandle;
use lessonforge_engine::{EventBus, PipelineEngine, SessionRegistry};
use lessonforge_quota::{CostTracker, KeyedRateLimiter};
use lessonforge_retriever::Retriever;
use lessonforge_testing::{
    candidate, response_with, response_with_usage, FixedEmbedder, ScriptedAgentHandle,
    ScriptedOutcome, StaticIndexBackend,
};
use lessonforge_types::{
    CoreError, EventType, LessonDocument, LessonSection, PatchPlanItem, SessionStatus,
};

fn build_engine(config: Config, dispatcher: Arc<dyn AgentHandle>) -> Arc<PipelineEngine> {
    let registry = SessionRegistry::new();
    let bus = EventBus::new();
    let retriever = Arc::new(Retriever::new(
        Arc::new(FixedEmbedder::default()),
        Arc::new(StaticIndexBackend(vec![candidate(
            "doc-1",
            "quicksort partitions the array around a pivot",
            0.6,
            0.8,
        )])),
        &config,
    ));
    let rate_limiter = Arc::new(KeyedRateLimiter::new(
        config.rate_limiter,
        Duration::from_secs(config.bucket_idle_eviction_secs),
    ));
    let cost_tracker = Arc::new(CostTracker::new(&config));
    PipelineEngine::new(registry, bus, dispatcher, retriever, rate_limiter, cost_tracker, config)
}

fn lesson_json(big_picture: &str) -> String {
    serde_json::to_string(&LessonDocument {
        big_picture: big_picture.to_string(),
        ..Default::default()
    })
    .unwrap()
}

fn happy_path_dispatcher(patched_big_picture: &str) -> ScriptedAgentHandle {
    let patch_plan = serde_json::to_string(&vec![PatchPlanItem {
        section: LessonSection::BigPicture,
        description: "sharpen the opening line".into(),
        replacement: patched_big_picture.to_string(),
    }])
    .unwrap();

    ScriptedAgentHandle::new()
        .script(
            "summarizer",
            vec![ScriptedOutcome::Success(response_with(vec![(
                "summary",
                serde_json::json!("Quicksort partitions and recurses."),
            )]))],
        )
        .script(
            "explainer",
            vec![ScriptedOutcome::Success(response_with(vec![(
                "lesson",
                serde_json::json!(lesson_json("Quicksort is fast.")),
            )]))],
        )
        .script(
            "critic",
            vec![ScriptedOutcome::Success(response_with(vec![
                ("lesson", serde_json::json!(lesson_json("Quicksort is fast."))),
                ("patch_plan", serde_json::json!(patch_plan)),
            ]))],
        )
        .script(
            "visualizer",
            vec![ScriptedOutcome::Success(response_with(vec![
                ("images", serde_json::json!({"diagram": "https://img/diagram.png"})),
                ("captions", serde_json::json!({"diagram": "Partition diagram"})),
            ]))],
        )
}

// S1 — happy path: events in emission order, final lesson carries the
// critic's patch.
#[tokio::test]
async fn s1_happy_path_produces_ordered_events_and_patched_lesson() {
    let dispatcher = happy_path_dispatcher("Quicksort is a divide-and-conquer sort.");
    let engine = build_engine(Config::default(), Arc::new(dispatcher));

    let session = engine
        .create_session("client-a", "quicksort", HashMap::new())
        .await
        .unwrap();
    let mut sink = engine.subscribe(session).await;

    engine.run(session).await.unwrap();

    let expected = [
        (EventType::Connected, None),
        (EventType::StepStart, Some("summarizer")),
        (EventType::StepComplete, Some("summarizer")),
        (EventType::StepStart, Some("explainer")),
        (EventType::StepComplete, Some("explainer")),
        (EventType::StepStart, Some("critic")),
        (EventType::StepComplete, Some("critic")),
        (EventType::StepStart, Some("visualizer")),
        (EventType::StepComplete, Some("visualizer")),
        (EventType::Final, None),
    ];
    for (kind, step) in expected {
        let event = sink.receiver.recv().await.expect("expected event");
        assert_eq!(event.event_type, kind);
        assert_eq!(event.step.as_deref(), step);
    }

    let session_state = engine.session(session).await.unwrap();
    assert_eq!(session_state.status, SessionStatus::Completed);
    let final_result = session_state.final_result.unwrap();
    assert_eq!(
        final_result.lesson.big_picture,
        "Quicksort is a divide-and-conquer sort."
    );
    assert_eq!(final_result.summary, "Quicksort partitions and recurses.");
}

// S2 — retryable failure then success: two step_retry events, retry_count == 2.
#[tokio::test]
async fn s2_retryable_failure_then_success() {
    let mut cfg = Config::default();
    cfg.max_retries = 2;
    cfg.retry_base_delay_secs = 0.01;

    let mut dispatcher = happy_path_dispatcher("unused");
    dispatcher = dispatcher.script(
        "explainer",
        vec![
            ScriptedOutcome::Failure(CoreError::TransientAgent("network blip".into())),
            ScriptedOutcome::Failure(CoreError::TransientAgent("network blip".into())),
            ScriptedOutcome::Success(response_with(vec![(
                "lesson",
                serde_json::json!(lesson_json("Quicksort is fast.")),
            )])),
        ],
    );
    let engine = build_engine(cfg, Arc::new(dispatcher));

    let session = engine
        .create_session("client-a", "quicksort", HashMap::new())
        .await
        .unwrap();
    let mut sink = engine.subscribe(session).await;

    engine.run(session).await.unwrap();

    let mut retry_attempts = Vec::new();
    while let Ok(event) = sink.receiver.try_recv() {
        if event.event_type == EventType::StepRetry && event.step.as_deref() == Some("explainer") {
            retry_attempts.push(event.payload.get("attempt").unwrap().as_u64().unwrap());
        }
    }
    assert_eq!(retry_attempts, vec![2, 3]);

    let session_state = engine.session(session).await.unwrap();
    assert_eq!(session_state.step("explainer").unwrap().retry_count, 2);
    assert_eq!(session_state.status, SessionStatus::Completed);
}

// S3 — terminal critic failure: pipeline fails, visualizer never runs.
#[tokio::test]
async fn s3_terminal_critic_failure_ends_pipeline() {
    let dispatcher = happy_path_dispatcher("unused").script(
        "critic",
        vec![ScriptedOutcome::Failure(CoreError::TerminalAgent("400".into()))],
    );
    let dispatcher = Arc::new(dispatcher);
    let engine = build_engine(Config::default(), dispatcher.clone());

    let session = engine
        .create_session("client-a", "quicksort", HashMap::new())
        .await
        .unwrap();
    let mut sink = engine.subscribe(session).await;

    let result = engine.run(session).await;
    assert!(result.is_err());

    let mut saw_pipeline_failed = false;
    while let Ok(event) = sink.receiver.try_recv() {
        if event.event_type == EventType::PipelineFailed {
            saw_pipeline_failed = true;
        }
        assert_ne!(event.step.as_deref(), Some("visualizer"));
    }
    assert!(saw_pipeline_failed);
    assert!(!dispatcher
        .calls
        .lock()
        .unwrap()
        .iter()
        .any(|(agent, _)| agent == "visualizer"));

    let session_state = engine.session(session).await.unwrap();
    assert_eq!(session_state.status, SessionStatus::Failed);
    assert!(session_state.final_result.is_none());
}

// S4 — rate-limit denial: second rapid creation from the same client is denied.
#[tokio::test]
async fn s4_rate_limit_denies_second_rapid_creation() {
    let mut cfg = Config::default();
    cfg.rate_limiter.rate = 1.0;
    cfg.rate_limiter.burst = 1;
    let engine = build_engine(cfg, Arc::new(ScriptedAgentHandle::new()));

    let first = engine.create_session("client-a", "quicksort", HashMap::new()).await;
    assert!(first.is_ok());

    let second = engine.create_session("client-a", "quicksort", HashMap::new()).await;
    assert!(matches!(second, Err(CoreError::QuotaExceeded(_))));
}

// S5 — cost-budget denial mid-pipeline: the summarizer's own call is
// recorded even though it exceeds budget; the next admission check denies.
#[tokio::test]
async fn s5_cost_budget_denial_mid_pipeline() {
    let mut cfg = Config::default();
    cfg.cost_limits.max_llm_cost = Some(0.01);
    cfg.default_model_rate.input_rate = 1.0;
    cfg.default_model_rate.output_rate = 1.0;

    let dispatcher = ScriptedAgentHandle::new().script(
        "summarizer",
        vec![ScriptedOutcome::Success(response_with_usage(
            vec![("summary", serde_json::json!("too expensive"))],
            100.0,
            100.0,
        ))],
    );
    let engine = build_engine(cfg, Arc::new(dispatcher));

    let session = engine
        .create_session("client-a", "quicksort", HashMap::new())
        .await
        .unwrap();
    let mut sink = engine.subscribe(session).await;

    let result = engine.run(session).await;
    assert!(matches!(result, Err(CoreError::QuotaExceeded(_))));

    let mut saw_cost_limit = false;
    while let Ok(event) = sink.receiver.try_recv() {
        if event.event_type == EventType::PipelineFailed {
            if event.payload.get("reason").and_then(|v| v.as_str()) == Some("cost_limit") {
                saw_cost_limit = true;
            }
        }
    }
    assert!(saw_cost_limit);

    let session_state = engine.session(session).await.unwrap();
    assert_eq!(session_state.status, SessionStatus::Failed);
}

// S6 — a subscriber that never reads must not block the pipeline, while a
// subscriber that drains promptly sees every event.
#[tokio::test]
async fn s6_slow_subscriber_does_not_block_pipeline() {
    let dispatcher = happy_path_dispatcher("Quicksort is a divide-and-conquer sort.");
    let engine = build_engine(Config::default(), Arc::new(dispatcher));

    let session = engine
        .create_session("client-a", "quicksort", HashMap::new())
        .await
        .unwrap();
    let _slow_subscriber = engine.subscribe(session).await;
    let mut fast_subscriber = engine.subscribe(session).await;

    let fast_drain = tokio::spawn(async move {
        let mut count = 0;
        while fast_subscriber.receiver.recv().await.is_some() {
            count += 1;
        }
        count
    });

    let run_result = tokio::time::timeout(Duration::from_secs(5), engine.run(session)).await;
    assert!(run_result.is_ok(), "pipeline must complete promptly despite an idle subscriber");
    assert!(run_result.unwrap().is_ok());

    drop(engine);
    let received = tokio::time::timeout(Duration::from_secs(1), fast_drain)
        .await
        .unwrap_or(Ok(0))
        .unwrap_or(0);
    assert!(received >= 10);
}
