// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use lessonforge_config::RetrievalWeights;

use crate::backend::Candidate;

/// A candidate after lexical/vector scores have been min-max normalized
/// across the batch and combined with the configured weights.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub combined_score: f32,
}

fn min_max_normalize(values: &[f32]) -> Vec<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;
    if span <= f32::EPSILON {
        return vec![1.0; values.len()];
    }
    values.iter().map(|v| (v - min) / span).collect()
}

/// Combine lexical and vector scores (spec.md §4.5 step 3): min-max
/// normalize each dimension across the candidate batch, then blend with the
/// configured (normalized) weights.
pub fn combine_scores(candidates: &[Candidate], weights: RetrievalWeights) -> Vec<ScoredCandidate> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let weights = weights.normalized();
    let lexical: Vec<f32> = candidates.iter().map(|c| c.lexical_score).collect();
    let vector: Vec<f32> = candidates.iter().map(|c| c.vector_score).collect();
    let lexical_norm = min_max_normalize(&lexical);
    let vector_norm = min_max_normalize(&vector);

    candidates
        .iter()
        .zip(lexical_norm)
        .zip(vector_norm)
        .map(|((candidate, lex), vec)| ScoredCandidate {
            candidate: candidate.clone(),
            combined_score: weights.lexical * lex + weights.vector * vec,
        })
        .collect()
}

/// Normalize a set of already-selected combined scores to `[0, 1]` by
/// min-max over that set (spec.md §4.5 step 5), avoiding division by zero
/// when every score is equal.
pub fn normalize_selected(scores: &[f32]) -> Vec<f32> {
    min_max_normalize(scores)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
