// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lessonforge_types::{Event, SessionId};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Bounded buffer capacity per sink (spec.md §4.2's "suggested K=16").
const SINK_CAPACITY: usize = 16;

/// Receiving half handed back to a subscriber. Wraps the channel receiver
/// with the id used to unsubscribe.
pub struct Sink {
    pub id: u64,
    pub session: SessionId,
    pub receiver: mpsc::Receiver<Event>,
}

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Event>,
}

/// Per-session fan-out of lifecycle events (spec.md §4.2, C2). Deliberately
/// built on bounded `mpsc::Sender::try_send` rather than `tokio::sync::broadcast`:
/// broadcast's per-receiver "lag" semantics report loss as an error the
/// *next* receive call returns, which still couples a slow subscriber's
/// state to the channel's internal ring buffer. A dedicated bounded channel
/// per subscriber with `try_send` drops silently on a full buffer and never
/// blocks the publisher, matching "a slow subscriber must not block others"
/// exactly.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<SessionId, Vec<Subscriber>>>,
    next_sink_id: AtomicU64,
    dropped: AtomicU64,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn subscribe(&self, session: SessionId) -> Sink {
        let (sender, receiver) = mpsc::channel(SINK_CAPACITY);
        let id = self.next_sink_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .await
            .entry(session)
            .or_default()
            .push(Subscriber { id, sender });
        Sink { id, session, receiver }
    }

    /// Tolerates being called for a sink that was never registered or has
    /// already been removed (e.g. a late unsubscribe after the session
    /// terminated), per spec.md §4.2.
    pub async fn unsubscribe(&self, session: SessionId, sink_id: u64) {
        let mut subscribers = self.subscribers.write().await;
        if let Some(list) = subscribers.get_mut(&session) {
            list.retain(|s| s.id != sink_id);
            if list.is_empty() {
                subscribers.remove(&session);
            }
        }
    }

    /// Publishing to a session with zero subscribers is a no-op, not an
    /// error (spec.md §4.2).
    pub async fn publish(&self, session: SessionId, event: Event) {
        let subscribers = self.subscribers.read().await;
        let Some(list) = subscribers.get(&session) else {
            return;
        };
        for subscriber in list {
            if subscriber.sender.try_send(event.clone()).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(%session, sink = subscriber.id, "event dropped: sink full");
            }
        }
    }

    /// Debug counter of events dropped across all sessions and sinks.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
