// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;

use crate::error::RetrieverError;

/// A raw hybrid-query hit, before score combination and diversification.
/// `topic` and `section` are the tokenizable fields the MMR stage uses for
/// its Jaccard similarity (see `mmr::jaccard_similarity`) — typically the
/// source document's subject line and heading.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub source: String,
    pub text: String,
    pub topic: String,
    pub section: String,
    pub lexical_score: f32,
    pub vector_score: f32,
}

/// Turns a query string into a dense vector. Implementations own whatever
/// model or remote call does the embedding; the retriever only needs the
/// resulting vector (the index backend itself consumes it, so its
/// dimensionality must match the backend's configured dimension).
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, query: &str) -> Result<Vec<f32>, RetrieverError>;
}

/// A hybrid (lexical + vector) search index. Implementations are expected to
/// run a single combined query server-side rather than two round trips —
/// the retriever trusts whatever `lexical_score`/`vector_score` pair the
/// backend reports per candidate.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Return up to `limit` candidates for `index`, ranked by the backend's
    /// own blended relevance; the retriever re-scores and diversifies the
    /// set itself, so ranking precision here matters less than recall.
    async fn hybrid_query(
        &self,
        index: &str,
        query: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<Candidate>, RetrieverError>;
}
