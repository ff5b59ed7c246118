// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use lessonforge_retriever::{Candidate, Embedder, IndexBackend, RetrieverError};

/// An embedder that always returns the same fixed vector, for tests that
/// only care about the retriever's scoring/diversification/snippet logic
/// and not about embedding quality.
pub struct FixedEmbedder(pub Vec<f32>);

impl Default for FixedEmbedder {
    fn default() -> Self {
        Self(vec![0.1, 0.2, 0.3])
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _query: &str) -> Result<Vec<f32>, RetrieverError> {
        Ok(self.0.clone())
    }
}

/// An embedder that always fails, for exercising the retriever's
/// degrade-to-empty-context path.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _query: &str) -> Result<Vec<f32>, RetrieverError> {
        Err(RetrieverError::EmbeddingFailed("test double: always fails".into()))
    }
}

/// An index backend returning a fixed candidate set regardless of query,
/// truncated to whatever `limit` the retriever requests.
pub struct StaticIndexBackend(pub Vec<Candidate>);

#[async_trait]
impl IndexBackend for StaticIndexBackend {
    async fn hybrid_query(
        &self,
        _index: &str,
        _query: &str,
        _embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<Candidate>, RetrieverError> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

pub fn candidate(source: &str, text: &str, lexical: f32, vector: f32) -> Candidate {
    Candidate {
        source: source.to_string(),
        text: text.to_string(),
        topic: "topic".to_string(),
        section: "section".to_string(),
        lexical_score: lexical,
        vector_score: vector,
    }
}
