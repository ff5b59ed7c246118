// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashSet;

use crate::scoring::ScoredCandidate;

const TOPIC_WEIGHT: f32 = 0.7;
const SECTION_WEIGHT: f32 = 0.3;

fn tokenize(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Weighted (0.7 topic + 0.3 section) Jaccard similarity over tokenized
/// lowercased fields, per spec.md §4.5 step 4.
pub fn jaccard_similarity(a: &ScoredCandidate, b: &ScoredCandidate) -> f32 {
    let topic_sim = jaccard(&tokenize(&a.candidate.topic), &tokenize(&b.candidate.topic));
    let section_sim = jaccard(&tokenize(&a.candidate.section), &tokenize(&b.candidate.section));
    TOPIC_WEIGHT * topic_sim + SECTION_WEIGHT * section_sim
}

/// Greedy maximal-marginal-relevance selection (spec.md §4.5 step 4):
/// start with the highest-scoring candidate, then repeatedly pick the
/// candidate maximizing `λ * combined_score - (1-λ) * max_similarity_to_selected`
/// until `k` items are chosen or candidates are exhausted.
pub fn diversify(mut candidates: Vec<ScoredCandidate>, k: usize, lambda: f32) -> Vec<ScoredCandidate> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }
    candidates.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut selected = vec![candidates.remove(0)];
    while selected.len() < k && !candidates.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (idx, candidate) in candidates.iter().enumerate() {
            let max_sim = selected
                .iter()
                .map(|s| jaccard_similarity(candidate, s))
                .fold(0.0f32, f32::max);
            let mmr_score = lambda * candidate.combined_score - (1.0 - lambda) * max_sim;
            if mmr_score > best_score {
                best_score = mmr_score;
                best_idx = idx;
            }
        }
        selected.push(candidates.remove(best_idx));
    }
    selected
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Candidate;

    fn scored(source: &str, topic: &str, section: &str, score: f32) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                source: source.into(),
                text: "text".into(),
                topic: topic.into(),
                section: section.into(),
                lexical_score: 0.0,
                vector_score: 0.0,
            },
            combined_score: score,
        }
    }

    #[test]
    fn identical_fields_have_similarity_one() {
        let a = scored("a", "rust ownership", "intro", 0.9);
        let b = scored("b", "rust ownership", "intro", 0.1);
        assert!((jaccard_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_fields_have_similarity_zero() {
        let a = scored("a", "rust ownership", "intro", 0.9);
        let b = scored("b", "python generators", "advanced", 0.1);
        assert_eq!(jaccard_similarity(&a, &b), 0.0);
    }

    #[test]
    fn diversify_starts_with_highest_score() {
        let candidates = vec![scored("a", "t", "s", 0.2), scored("b", "t", "s", 0.9)];
        let selected = diversify(candidates, 2, 0.7);
        assert_eq!(selected[0].candidate.source, "b");
    }

    #[test]
    fn diversify_prefers_dissimilar_candidate_when_scores_are_close() {
        let candidates = vec![
            scored("top", "rust ownership borrowing", "intro", 1.0),
            scored("near-dup", "rust ownership borrowing", "intro", 0.95),
            scored("different", "python generators", "advanced", 0.9),
        ];
        let selected = diversify(candidates, 2, 0.5);
        assert_eq!(selected[0].candidate.source, "top");
        assert_eq!(selected[1].candidate.source, "different");
    }

    #[test]
    fn diversify_stops_at_k() {
        let candidates = vec![
            scored("a", "t1", "s1", 0.9),
            scored("b", "t2", "s2", 0.8),
            scored("c", "t3", "s3", 0.7),
        ];
        let selected = diversify(candidates, 2, 0.7);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn diversify_returns_all_when_fewer_than_k() {
        let candidates = vec![scored("a", "t", "s", 0.5)];
        let selected = diversify(candidates, 5, 0.7);
        assert_eq!(selected.len(), 1);
    }
}
