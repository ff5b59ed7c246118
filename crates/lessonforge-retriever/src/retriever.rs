// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use lessonforge_config::Config;
use lessonforge_types::ContextDocument;
use tracing::warn;

use crate::backend::{Embedder, IndexBackend};
use crate::error::RetrieverError;
use crate::mmr::diversify;
use crate::scoring::{combine_scores, normalize_selected};
use crate::snippet::extract_snippet;

const DEFAULT_K: usize = 10;

/// The hybrid retriever (spec.md §4.5, C5). Holds no mutable state beyond
/// configuration — every `search` call is independent, matching the
/// statelessness the pipeline engine and dispatcher both assume (§5).
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn IndexBackend>,
    weights: lessonforge_config::RetrievalWeights,
    mmr_lambda: f32,
    snippet_length: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, backend: Arc<dyn IndexBackend>, config: &Config) -> Self {
        Self {
            embedder,
            backend,
            weights: config.retrieval_weights,
            mmr_lambda: config.mmr_lambda,
            snippet_length: config.snippet_length,
        }
    }

    /// `search(index, query, k) -> ordered list of context documents of
    /// length <= k`, per spec.md §4.5's public contract.
    pub async fn search(
        &self,
        index: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<ContextDocument>, RetrieverError> {
        if query.trim().is_empty() {
            return Err(RetrieverError::EmptyQuery);
        }
        let k = if k == 0 { DEFAULT_K } else { k };

        let embedding = self.embedder.embed(query).await.map_err(|e| {
            warn!(error = %e, "embedding failed");
            e
        })?;

        let candidates = self
            .backend
            .hybrid_query(index, query, &embedding, k * 2)
            .await?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let scored = combine_scores(&candidates, self.weights);
        let selected = diversify(scored, k, self.mmr_lambda);

        let raw_scores: Vec<f32> = selected.iter().map(|s| s.combined_score).collect();
        let normalized = normalize_selected(&raw_scores);

        let mut documents: Vec<ContextDocument> = selected
            .into_iter()
            .zip(normalized)
            .map(|(scored, norm_score)| {
                let snippet = extract_snippet(&scored.candidate.text, query, self.snippet_length);
                ContextDocument::new(scored.candidate.source, norm_score, snippet)
            })
            .collect();

        documents.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(documents)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
