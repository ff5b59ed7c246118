// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use lessonforge_types::{Session, SessionId};
use tokio::sync::RwLock;

/// In-memory map of sessions (spec.md §4.1, C1). Holds no persistence — a
/// process restart loses every session, which is acceptable because a
/// caller that loses its event subscription has no resumption guarantee
/// anyway.
///
/// The map itself is behind one reader-writer lock; each session's `update`
/// additionally holds that write lock only long enough to run the mutator,
/// matching spec.md §5's "writes are held only long enough to update one
/// session".
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Allocate a fresh session in state `created` and return its id.
    pub async fn create(&self, topic: impl Into<String>, metadata: HashMap<String, String>) -> SessionId {
        let session = Session::new(topic, metadata);
        let id = session.id;
        self.sessions.write().await.insert(id, session);
        id
    }

    /// A consistent snapshot of the session, or `None` if unknown.
    pub async fn get(&self, id: SessionId) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Apply `mutator` to the session atomically with respect to other
    /// `update` calls on the same id. Returns `false` if the session is
    /// unknown.
    pub async fn update(&self, id: SessionId, mutator: impl FnOnce(&mut Session)) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) => {
                mutator(session);
                session.touch();
                true
            }
            None => false,
        }
    }

    pub async fn list(&self) -> Vec<Session> {
        self.sessions.read().await.values().cloned().collect()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
